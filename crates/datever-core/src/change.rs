//! Atomic schema changes and their two directions
//!
//! Every [`Change`] records one breaking edit made to a schema on a given
//! date. It can be read in two directions:
//!
//! - [`Change::apply`] moves a payload written against the older contract
//!   toward the newer one. This is how historical client input is upgraded.
//! - [`Change::unapply`] projects the newer field set and/or payload back to
//!   the shape that was valid just before the change. This is how canonical
//!   output is downgraded for pinned clients.
//!
//! The two directions are written independently. `RemoveField` only remembers
//! a configured default, so a removed value is not recoverable once it has
//! been applied away.
//!
//! Copyright (c) 2025 Datever Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::field::{Field, FieldSet, Payload};
use serde_json::Value;
use std::fmt;

/// A single breaking change to a schema
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Change {
    /// Nothing changed; both directions are the identity
    #[default]
    NoOp,
    /// A field was introduced
    AddField {
        name: String,
        field: Field,
        default: Value,
    },
    /// A field was dropped
    RemoveField {
        name: String,
        field: Field,
        default: Value,
    },
    /// A field was renamed from `from` to `to`
    RenameField { from: String, to: String },
    /// A field kept its name but changed type
    ChangeFieldType { name: String, old: Field, new: Field },
}

/// Fields and payload returned by [`Change::unapply`]
pub type Unapplied = (Option<FieldSet>, Option<Payload>);

impl Change {
    /// A field was added; older payloads receive `null`
    pub fn add_field(name: impl Into<String>, field: Field) -> Self {
        Change::AddField {
            name: name.into(),
            field,
            default: Value::Null,
        }
    }

    /// A field was removed; older clients see `null`
    pub fn remove_field(name: impl Into<String>, field: Field) -> Self {
        Change::RemoveField {
            name: name.into(),
            field,
            default: Value::Null,
        }
    }

    /// The field called `from` is now called `to`
    pub fn rename_field(from: impl Into<String>, to: impl Into<String>) -> Self {
        Change::RenameField {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The field `name` changed its type from `old` to `new`
    pub fn change_field_type(name: impl Into<String>, old: Field, new: Field) -> Self {
        Change::ChangeFieldType {
            name: name.into(),
            old,
            new,
        }
    }

    /// Set the default substituted by add/remove changes
    ///
    /// Other variants carry no default and are returned unchanged.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        if let Change::AddField { default, .. } | Change::RemoveField { default, .. } = &mut self {
            *default = value.into();
        }
        self
    }

    /// Short variant name
    pub fn kind(&self) -> &'static str {
        match self {
            Change::NoOp => "NoOp",
            Change::AddField { .. } => "AddField",
            Change::RemoveField { .. } => "RemoveField",
            Change::RenameField { .. } => "RenameField",
            Change::ChangeFieldType { .. } => "ChangeFieldType",
        }
    }

    /// Move a payload from this change's older shape to its newer shape
    pub fn apply(&self, mut payload: Payload) -> Result<Payload> {
        match self {
            Change::NoOp => {}
            Change::AddField { name, default, .. } => {
                payload.insert(name.clone(), default.clone());
            }
            Change::RemoveField { name, field, .. } => {
                remove_declared(&mut payload, name, field, "removing a field from the payload")?;
            }
            Change::RenameField { from, to } => {
                let value = payload
                    .shift_remove(from)
                    .ok_or_else(|| Error::missing_key(from, "renaming a payload key"))?;
                payload.insert(to.clone(), value);
            }
            Change::ChangeFieldType { name, old, new } => {
                let converted = convert(name, &payload, old, new)?;
                payload.insert(name.clone(), converted);
            }
        }
        Ok(payload)
    }

    /// Project fields and/or payload back to the shape before this change
    ///
    /// Either side may be omitted; an omitted side is returned as `None`.
    pub fn unapply(&self, fields: Option<FieldSet>, payload: Option<Payload>) -> Result<Unapplied> {
        let fields = fields.map(|fields| self.unapply_fields(fields)).transpose()?;
        let payload = payload.map(|payload| self.unapply_payload(payload)).transpose()?;
        Ok((fields, payload))
    }

    fn unapply_fields(&self, mut fields: FieldSet) -> Result<FieldSet> {
        match self {
            Change::NoOp => {}
            Change::AddField { name, .. } => {
                fields
                    .remove(name)
                    .ok_or_else(|| Error::missing_key(name, "removing an added field declaration"))?;
            }
            Change::RemoveField { name, field, .. } => {
                fields.insert(name.clone(), field.clone());
            }
            Change::RenameField { from, to } => {
                let field = fields
                    .get(to)
                    .cloned()
                    .ok_or_else(|| Error::missing_key(to, "restoring a renamed field declaration"))?;
                fields.insert(from.clone(), field);
                fields.remove(to);
            }
            Change::ChangeFieldType { name, old, .. } => {
                if !fields.contains(name) {
                    return Err(Error::missing_key(name, "restoring a field's previous type"));
                }
                fields.insert(name.clone(), old.clone());
            }
        }
        Ok(fields)
    }

    fn unapply_payload(&self, mut payload: Payload) -> Result<Payload> {
        match self {
            Change::NoOp => {}
            Change::AddField { name, field, .. } => {
                remove_declared(&mut payload, name, field, "removing an added field from the payload")?;
            }
            Change::RemoveField { name, default, .. } => {
                payload.insert(name.clone(), default.clone());
            }
            Change::RenameField { from, to } => {
                let value = payload
                    .shift_remove(to)
                    .ok_or_else(|| Error::missing_key(to, "restoring a renamed payload key"))?;
                payload.insert(from.clone(), value);
            }
            Change::ChangeFieldType { name, old, new } => {
                let converted = convert(name, &payload, new, old)?;
                payload.insert(name.clone(), converted);
            }
        }
        Ok(payload)
    }
}

// An optional field may be absent from a valid payload.
fn remove_declared(payload: &mut Payload, name: &str, field: &Field, context: &str) -> Result<()> {
    if payload.shift_remove(name).is_none() && field.is_required() {
        return Err(Error::missing_key(name, context));
    }
    Ok(())
}

// Decode with one field and encode with the other; null survives untouched.
fn convert(name: &str, payload: &Payload, decode: &Field, encode: &Field) -> Result<Value> {
    let raw = payload
        .get(name)
        .ok_or_else(|| Error::missing_key(name, "changing a field's type"))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let internal = decode.to_internal_value(name, raw)?;
    encode.to_representation(name, &internal)
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::NoOp => write!(f, "No change"),
            Change::AddField { name, field, default } => {
                write!(f, "Field '{}' added as {} (default: {})", name, field, default)
            }
            Change::RemoveField { name, field, default } => {
                write!(f, "Field '{}' removed, was {} (default: {})", name, field, default)
            }
            Change::RenameField { from, to } => {
                write!(f, "Field renamed from '{}' to '{}'", from, to)
            }
            Change::ChangeFieldType { name, old, new } => {
                write!(f, "Field '{}' type changed from {} to {}", name, old, new)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chewby() -> Payload {
        json!({
            "name": "Chewbacca",
            "birthYear": "200BBY",
            "eyeColor": "blue",
            "gender": "male",
            "hairColor": "brown",
            "height": 228,
            "mass": 112,
            "homeworld": {
                "name": "Kashyyyk"
            }
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn simple_fields() -> FieldSet {
        FieldSet::new()
            .with("firstname", Field::char())
            .with("lastname", Field::char())
    }

    #[test]
    fn test_no_op() {
        let change = Change::default();
        let (fields, payload) = change.unapply(Some(simple_fields()), Some(chewby())).unwrap();
        assert_eq!(fields.unwrap(), simple_fields());
        let payload = payload.unwrap();
        assert_eq!(payload, chewby());
        assert_eq!(change.apply(payload).unwrap(), chewby());
    }

    #[test]
    fn test_remove_field() {
        let change = Change::remove_field("hairStyle", Field::char());
        let (_, previous) = change.unapply(None, Some(chewby())).unwrap();
        let mut previous = previous.unwrap();
        assert_eq!(previous.get("hairStyle"), Some(&Value::Null));
        assert_eq!(previous.len(), chewby().len() + 1);

        previous.insert("hairStyle".to_string(), json!("fluffy"));
        assert_eq!(change.apply(previous).unwrap(), chewby());

        let (fields, payload) = change.unapply(Some(simple_fields()), None).unwrap();
        assert!(payload.is_none());
        let fields = fields.unwrap();
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["firstname", "lastname", "hairStyle"]);
    }

    #[test]
    fn test_remove_field_round_trip_is_lossy() {
        let change = Change::remove_field("hairStyle", Field::char()).with_default("bald");
        let mut original = chewby();
        original.insert("hairStyle".to_string(), json!("fluffy"));

        let applied = change.apply(original).unwrap();
        let (_, restored) = change.unapply(None, Some(applied)).unwrap();
        assert_eq!(restored.unwrap()["hairStyle"], json!("bald"));
    }

    #[test]
    fn test_rename_field() {
        let change = Change::rename_field("origin", "homeworld");
        let (_, previous) = change.unapply(None, Some(chewby())).unwrap();
        let previous = previous.unwrap();
        assert!(!previous.contains_key("homeworld"));
        assert_eq!(previous["origin"], json!({"name": "Kashyyyk"}));
        assert_eq!(previous.keys().last().map(String::as_str), Some("origin"));

        assert_eq!(change.apply(previous).unwrap(), chewby());
    }

    #[test]
    fn test_rename_field_declarations() {
        let change = Change::rename_field("surname", "lastname");
        let (fields, _) = change.unapply(Some(simple_fields()), None).unwrap();
        let fields = fields.unwrap();
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["firstname", "surname"]);
        assert_eq!(fields.get("surname"), Some(&Field::char()));
    }

    #[test]
    fn test_rename_missing_key() {
        let change = Change::rename_field("iColor", "eyeColour");
        let err = change.unapply(None, Some(chewby())).unwrap_err();
        assert!(matches!(err, Error::MissingKey { ref key, .. } if key == "eyeColour"));
    }

    #[test]
    fn test_add_field() {
        let change = Change::add_field("hairStyle", Field::char());
        let next = change.apply(chewby()).unwrap();
        assert_eq!(next["hairStyle"], Value::Null);
        assert_eq!(next.len(), chewby().len() + 1);

        let (_, previous) = change.unapply(None, Some(next)).unwrap();
        assert_eq!(previous.unwrap(), chewby());
    }

    #[test]
    fn test_add_field_default_and_declarations() {
        let change = Change::add_field("gender", Field::char()).with_default("male");
        let mut old = chewby();
        old.shift_remove("gender");
        assert_eq!(change.apply(old).unwrap()["gender"], json!("male"));

        let fields = simple_fields().with("gender", Field::char());
        let (fields, _) = change.unapply(Some(fields), None).unwrap();
        assert_eq!(fields.unwrap(), simple_fields());

        let err = change.unapply(Some(simple_fields()), None).unwrap_err();
        assert!(matches!(err, Error::MissingKey { .. }));
    }

    #[test]
    fn test_absent_optional_field_is_skipped() {
        let added = Change::add_field("nickname", Field::char().optional());
        let (_, previous) = added.unapply(None, Some(chewby())).unwrap();
        assert_eq!(previous.unwrap(), chewby());

        let removed = Change::remove_field("hairStyle", Field::char().optional());
        assert_eq!(removed.apply(chewby()).unwrap(), chewby());

        let required = Change::remove_field("hairStyle", Field::char());
        let err = required.apply(chewby()).unwrap_err();
        assert!(matches!(err, Error::MissingKey { ref key, .. } if key == "hairStyle"));
    }

    #[test]
    fn test_change_field_type() {
        let change = Change::change_field_type("height", Field::char(), Field::integer());
        let mut old = chewby();
        old.insert("height".to_string(), json!("228"));

        let new = change.apply(old.clone()).unwrap();
        assert_eq!(new["height"], json!(228));

        let (fields, previous) = change
            .unapply(Some(FieldSet::new().with("height", Field::integer())), Some(new))
            .unwrap();
        assert_eq!(previous.unwrap(), old);
        assert_eq!(fields.unwrap().get("height"), Some(&Field::char()));
    }

    #[test]
    fn test_change_field_type_rejects_bad_value() {
        let change = Change::change_field_type("height", Field::char(), Field::integer());
        let mut old = chewby();
        old.insert("height".to_string(), json!("very tall"));
        assert!(matches!(change.apply(old), Err(Error::FieldConversion { .. })));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Change::rename_field("iColor", "eyeColor").to_string(),
            "Field renamed from 'iColor' to 'eyeColor'"
        );
        assert_eq!(
            Change::add_field("gender", Field::char()).with_default("male").to_string(),
            "Field 'gender' added as CharField() (default: \"male\")"
        );
        assert_eq!(Change::rename_field("a", "b").with_default(1).kind(), "RenameField");
    }
}
