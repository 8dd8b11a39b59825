//! Canonical schema definitions
//!
//! A [`Schema`] is the immutable configuration of a schema owner: its name,
//! its canonical (always latest) field declarations and the change set that
//! records how it evolved. Schemas are built once, wrapped in an `Arc` and
//! shared read-only by every model constructed from them.
//!
//! Copyright (c) 2025 Datever Team
//! Licensed under the Apache-2.0 license

use crate::changeset::ChangeSet;
use crate::error::{Error, Result};
use crate::field::{Field, FieldSet, Payload};
use serde_json::Value;
use std::sync::Arc;

/// Canonical fields plus the change history of one schema owner
#[derive(Debug)]
pub struct Schema {
    name: String,
    fields: FieldSet,
    changes: Arc<ChangeSet>,
}

impl Schema {
    /// Create a schema with no recorded changes
    pub fn new(name: impl Into<String>, fields: FieldSet) -> Self {
        Self {
            name: name.into(),
            fields,
            changes: Arc::new(ChangeSet::new()),
        }
    }

    /// Start building a schema
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: FieldSet::new(),
            changes: None,
        }
    }

    /// Attach a change set
    pub fn with_changes(mut self, changes: impl Into<Arc<ChangeSet>>) -> Self {
        self.changes = changes.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical field declarations
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// The change set shared by every model of this schema
    pub fn changes(&self) -> &Arc<ChangeSet> {
        &self.changes
    }

    /// Serialize an instance into the canonical representation
    ///
    /// Nested fields are serialized with their own canonical schema. Missing
    /// optional attributes are skipped; a missing required attribute fails.
    pub fn to_representation(&self, instance: &Value) -> Result<Payload> {
        let Value::Object(attributes) = instance else {
            return Err(Error::conversion(
                self.name.as_str(),
                "Expected an object instance to serialize.",
            ));
        };

        let mut payload = Payload::new();
        for (name, field) in self.fields.iter() {
            let Some(value) = attributes.get(name) else {
                if field.is_required() {
                    return Err(Error::missing_key(
                        name,
                        format!("serializing an instance of {}", self.name),
                    ));
                }
                continue;
            };
            payload.insert(name.to_string(), represent(name, field, value)?);
        }
        Ok(payload)
    }
}

fn represent(name: &str, field: &Field, value: &Value) -> Result<Value> {
    let Some((schema, many)) = field.nested_schema() else {
        return field.to_representation(name, value);
    };

    match (value, many) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::Array(items), true) => items
            .iter()
            .map(|item| schema.to_representation(item).map(Value::Object))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        (_, true) => Err(Error::conversion(name, "Expected a list of nested instances.")),
        (_, false) => schema.to_representation(value).map(Value::Object),
    }
}

/// Builder for [`Schema`]
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: FieldSet,
    changes: Option<Arc<ChangeSet>>,
}

impl SchemaBuilder {
    /// Declare a canonical field
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name, field);
        self
    }

    /// Attach the change set
    pub fn changes(mut self, changes: impl Into<Arc<ChangeSet>>) -> Self {
        self.changes = Some(changes.into());
        self
    }

    /// Build the shared schema
    pub fn build(self) -> Arc<Schema> {
        Arc::new(Schema {
            name: self.name,
            fields: self.fields,
            changes: self.changes.unwrap_or_default(),
        })
    }
}
