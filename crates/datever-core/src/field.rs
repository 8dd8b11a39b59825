//! Field declarations and the ordered field set of a schema
//!
//! A [`Field`] describes one declared field: its kind, whether it is required,
//! and whether it accepts `null`. Fields convert raw wire values to internal
//! values (`to_internal_value`) and back (`to_representation`); those two
//! conversions are all the versioning engine needs from a type system.
//!
//! A [`FieldSet`] keeps declarations in order. Changes never edit a shared
//! field set: each fold step works on its own owned copy.
//!
//! Copyright (c) 2025 Datever Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::version::VERSION_FORMAT;
use chrono::NaiveDate;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;

/// An ordered mapping from field name to value
pub type Payload = serde_json::Map<String, Value>;

/// The type of a declared field
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Free-form text
    Char,
    /// Whole number
    Integer,
    /// Floating point number
    Float,
    /// True or false
    Boolean,
    /// Calendar date rendered as `YYYY-MM-DD`
    Date,
    /// Another versioned schema, optionally a list of them
    Nested { schema: Arc<Schema>, many: bool },
}

impl FieldKind {
    /// Name used when rendering declarations
    pub fn type_name(&self) -> &str {
        match self {
            FieldKind::Char => "CharField",
            FieldKind::Integer => "IntegerField",
            FieldKind::Float => "FloatField",
            FieldKind::Boolean => "BooleanField",
            FieldKind::Date => "DateField",
            FieldKind::Nested { schema, .. } => schema.name(),
        }
    }
}

impl PartialEq for FieldKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldKind::Char, FieldKind::Char)
            | (FieldKind::Integer, FieldKind::Integer)
            | (FieldKind::Float, FieldKind::Float)
            | (FieldKind::Boolean, FieldKind::Boolean)
            | (FieldKind::Date, FieldKind::Date) => true,
            (
                FieldKind::Nested { schema: s1, many: m1 },
                FieldKind::Nested { schema: s2, many: m2 },
            ) => s1.name() == s2.name() && m1 == m2,
            _ => false,
        }
    }
}

/// A declared field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    kind: FieldKind,
    required: bool,
    allow_null: bool,
}

impl Field {
    /// Create a required, non-null field of the given kind
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: true,
            allow_null: false,
        }
    }

    pub fn char() -> Self {
        Self::new(FieldKind::Char)
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn date() -> Self {
        Self::new(FieldKind::Date)
    }

    /// A field holding one nested model
    pub fn nested(schema: Arc<Schema>) -> Self {
        Self::new(FieldKind::Nested { schema, many: false })
    }

    /// A field holding a list of nested models
    pub fn nested_many(schema: Arc<Schema>) -> Self {
        Self::new(FieldKind::Nested { schema, many: true })
    }

    /// Make the field optional on input
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Accept `null` as a value
    pub fn nullable(mut self) -> Self {
        self.allow_null = true;
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn allows_null(&self) -> bool {
        self.allow_null
    }

    /// The nested schema and its `many` flag, for nested fields
    pub fn nested_schema(&self) -> Option<(&Arc<Schema>, bool)> {
        match &self.kind {
            FieldKind::Nested { schema, many } => Some((schema, *many)),
            _ => None,
        }
    }

    /// Convert a raw input value to its internal value
    pub fn to_internal_value(&self, name: &str, raw: &Value) -> Result<Value> {
        if raw.is_null() {
            return if self.allow_null {
                Ok(Value::Null)
            } else {
                Err(Error::conversion(name, "This field may not be null."))
            };
        }

        match &self.kind {
            FieldKind::Char => to_string(name, raw),
            FieldKind::Integer => to_integer(name, raw),
            FieldKind::Float => to_float(name, raw),
            FieldKind::Boolean => to_boolean(name, raw),
            FieldKind::Date => to_date(name, raw),
            FieldKind::Nested { many, .. } => expect_nested(name, raw, *many),
        }
    }

    /// Convert an internal value to its wire representation
    pub fn to_representation(&self, name: &str, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match &self.kind {
            FieldKind::Char => to_string(name, value),
            FieldKind::Integer => to_integer(name, value),
            FieldKind::Float => to_float(name, value),
            FieldKind::Boolean => to_boolean(name, value),
            FieldKind::Date => to_date(name, value),
            FieldKind::Nested { .. } => Ok(value.clone()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut args = Vec::new();
        if let FieldKind::Nested { many: true, .. } = self.kind {
            args.push("many=True");
        }
        if !self.required {
            args.push("required=False");
        }
        if self.allow_null {
            args.push("allow_null=True");
        }
        write!(f, "{}({})", self.kind.type_name(), args.join(", "))
    }
}

fn to_string(name: &str, value: &Value) -> Result<Value> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        _ => Err(Error::conversion(name, "Not a valid string.")),
    }
}

fn to_integer(name: &str, value: &Value) -> Result<Value> {
    let invalid = || Error::conversion(name, "A valid integer is required.");
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::from(i))
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::from(f as i64)),
                    _ => Err(invalid()),
                }
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            let digits = match trimmed.split_once('.') {
                Some((whole, frac)) if frac.chars().all(|c| c == '0') => whole,
                Some(_) => return Err(invalid()),
                None => trimmed,
            };
            digits.parse::<i64>().map(Value::from).map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

fn to_float(name: &str, value: &Value) -> Result<Value> {
    let invalid = || Error::conversion(name, "A valid number is required.");
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(invalid)
}

fn to_boolean(name: &str, value: &Value) -> Result<Value> {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.as_str() {
            "true" | "True" | "TRUE" | "on" | "On" | "ON" | "yes" | "Yes" | "YES" | "1" => Some(true),
            "false" | "False" | "FALSE" | "off" | "Off" | "OFF" | "no" | "No" | "NO" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed
        .map(Value::Bool)
        .ok_or_else(|| Error::conversion(name, "Must be a valid boolean."))
}

fn to_date(name: &str, value: &Value) -> Result<Value> {
    let invalid = || {
        Error::conversion(
            name,
            "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
        )
    };
    let Value::String(s) = value else {
        return Err(invalid());
    };
    NaiveDate::parse_from_str(s, VERSION_FORMAT)
        .map(|date| Value::String(date.format(VERSION_FORMAT).to_string()))
        .map_err(|_| invalid())
}

fn expect_nested(name: &str, raw: &Value, many: bool) -> Result<Value> {
    match (raw, many) {
        (Value::Object(_), false) => Ok(raw.clone()),
        (Value::Array(items), true) if items.iter().all(Value::is_object) => Ok(raw.clone()),
        (Value::Array(_), true) => Err(Error::conversion(
            name,
            "Invalid data. Expected a list of dictionaries.",
        )),
        (_, true) => Err(Error::conversion(
            name,
            format!("Expected a list of items but got type \"{}\".", json_type(raw)),
        )),
        (_, false) => Err(Error::conversion(
            name,
            format!("Invalid data. Expected a dictionary, but got {}.", json_type(raw)),
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Declared fields of a schema, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: Vec<(String, Field)>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, builder style
    pub fn with(mut self, name: impl Into<String>, field: Field) -> Self {
        self.insert(name, field);
        self
    }

    /// Insert a field
    ///
    /// Replacing an existing name keeps its position; a new name is appended.
    pub fn insert(&mut self, name: impl Into<String>, field: Field) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = field,
            None => self.fields.push((name, field)),
        }
    }

    /// Remove a field, preserving the order of the rest
    pub fn remove(&mut self, name: &str) -> Option<Field> {
        let index = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(index).1)
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, Field)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (N, Field)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, field) in iter {
            set.insert(name, field);
        }
        set
    }
}
