//! Schema definition documents
//!
//! Schemas and their change sets can be declared in YAML or JSON:
//!
//! ```yaml
//! schemas:
//!   - name: HomeworldSerializer
//!     fields:
//!       - { name: name, type: char }
//!   - name: PersonSerializer
//!     fields:
//!       - { name: name, type: char }
//!       - { name: homeworld, type: nested, schema: HomeworldSerializer }
//!     changes:
//!       "2018-08-02":
//!         op: remove_field
//!         name: hairStyle
//!         field: { type: char }
//!       "2018-07-29":
//!         - { op: rename_field, from: iColor, to: eyeColor }
//! ```
//!
//! A [`SchemaRegistry`] turns a document into shared [`Schema`] values,
//! resolving nested references by name in any declaration order.
//!
//! Copyright (c) 2025 Datever Team
//! Licensed under the Apache-2.0 license

use crate::change::Change;
use crate::changeset::ChangeSet;
use crate::error::{Error, Result};
use crate::field::{Field, FieldKind, FieldSet};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// A document declaring any number of schemas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub schemas: Vec<SchemaDef>,
}

/// One schema owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub changes: BTreeMap<String, ChangeEntryDef>,
}

/// A named field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(flatten)]
    pub spec: FieldSpec,
}

/// A field declaration without its name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub kind: FieldKindDef,
    /// Nested schema name, for `nested` fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default)]
    pub many: bool,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub allow_null: bool,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKindDef {
    Char,
    Integer,
    Float,
    Boolean,
    Date,
    Nested,
}

/// A single change or an ordered group under one version key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeEntryDef {
    Single(ChangeDef),
    Group(Vec<ChangeDef>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChangeDef {
    NoOp,
    AddField {
        name: String,
        field: FieldSpec,
        #[serde(default)]
        default: Value,
    },
    RemoveField {
        name: String,
        field: FieldSpec,
        #[serde(default)]
        default: Value,
    },
    RenameField {
        from: String,
        to: String,
    },
    ChangeFieldType {
        name: String,
        old: FieldSpec,
        new: FieldSpec,
    },
}

impl SchemaDocument {
    /// Parse a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read a document, choosing the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }
}

/// Shared schemas built from a document, by name
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// Build every schema of a document
    pub fn from_document(document: &SchemaDocument) -> Result<Self> {
        let mut defs = HashMap::new();
        for def in &document.schemas {
            if defs.insert(def.name.as_str(), def).is_some() {
                return Err(Error::configuration(format!(
                    "Schema '{}' is declared more than once",
                    def.name
                )));
            }
        }

        let mut builder = RegistryBuilder {
            defs,
            built: HashMap::new(),
            visiting: HashSet::new(),
        };
        for def in &document.schemas {
            builder.build(&def.name)?;
        }

        let schemas = builder.built.into_iter().collect();
        Ok(Self { schemas })
    }

    /// Load and build a document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let document = SchemaDocument::from_path(path)?;
        let registry = Self::from_document(&document)?;
        tracing::debug!(path = %path.display(), schemas = registry.len(), "loaded schema document");
        Ok(registry)
    }

    /// Look up a schema by name
    pub fn get(&self, name: &str) -> Result<Arc<Schema>> {
        self.schemas.get(name).cloned().ok_or_else(|| {
            Error::configuration(format!(
                "Unknown schema '{}' (known: {})",
                name,
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Schema names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

struct RegistryBuilder<'a> {
    defs: HashMap<&'a str, &'a SchemaDef>,
    built: HashMap<String, Arc<Schema>>,
    visiting: HashSet<String>,
}

impl RegistryBuilder<'_> {
    fn build(&mut self, name: &str) -> Result<Arc<Schema>> {
        if let Some(schema) = self.built.get(name) {
            return Ok(Arc::clone(schema));
        }
        let def = *self
            .defs
            .get(name)
            .ok_or_else(|| Error::configuration(format!("Unknown nested schema '{}'", name)))?;
        if !self.visiting.insert(name.to_string()) {
            return Err(Error::configuration(format!(
                "Schema '{}' nests itself",
                name
            )));
        }

        let mut fields = FieldSet::new();
        for field in &def.fields {
            fields.insert(field.name.clone(), self.field(&field.spec)?);
        }

        let mut changes = ChangeSet::builder();
        for (version, entry) in &def.changes {
            changes = match entry {
                ChangeEntryDef::Single(change) => changes.change(version.clone(), self.change(change)?),
                ChangeEntryDef::Group(group) => {
                    let group = group
                        .iter()
                        .map(|change| self.change(change))
                        .collect::<Result<Vec<_>>>()?;
                    changes.group(version.clone(), group)
                }
            };
        }
        let changes = changes.build().map_err(|e| {
            Error::configuration(format!("Schema '{}': {}", name, e))
        })?;

        self.visiting.remove(name);
        let schema = Arc::new(Schema::new(def.name.clone(), fields).with_changes(changes));
        self.built.insert(name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    fn field(&mut self, spec: &FieldSpec) -> Result<Field> {
        let kind = match spec.kind {
            FieldKindDef::Char => FieldKind::Char,
            FieldKindDef::Integer => FieldKind::Integer,
            FieldKindDef::Float => FieldKind::Float,
            FieldKindDef::Boolean => FieldKind::Boolean,
            FieldKindDef::Date => FieldKind::Date,
            FieldKindDef::Nested => {
                let name = spec.schema.as_deref().ok_or_else(|| {
                    Error::configuration("Nested fields must name their schema")
                })?;
                FieldKind::Nested {
                    schema: self.build(name)?,
                    many: spec.many,
                }
            }
        };

        let mut field = Field::new(kind);
        if !spec.required {
            field = field.optional();
        }
        if spec.allow_null {
            field = field.nullable();
        }
        Ok(field)
    }

    fn change(&mut self, def: &ChangeDef) -> Result<Change> {
        Ok(match def {
            ChangeDef::NoOp => Change::NoOp,
            ChangeDef::AddField { name, field, default } => {
                Change::add_field(name.clone(), self.field(field)?).with_default(default.clone())
            }
            ChangeDef::RemoveField { name, field, default } => {
                Change::remove_field(name.clone(), self.field(field)?).with_default(default.clone())
            }
            ChangeDef::RenameField { from, to } => Change::rename_field(from.clone(), to.clone()),
            ChangeDef::ChangeFieldType { name, old, new } => {
                Change::change_field_type(name.clone(), self.field(old)?, self.field(new)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionIdentifier;

    const PEOPLE: &str = r#"
schemas:
  - name: PersonSerializer
    fields:
      - { name: name, type: char }
      - { name: height, type: integer }
      - { name: homeworld, type: nested, schema: HomeworldSerializer }
    changes:
      "2018-08-02":
        op: remove_field
        name: hairStyle
        field: { type: char }
      "2018-07-29":
        - { op: rename_field, from: iColor, to: eyeColor }
        - { op: no_op }
      "2018-07-27":
        op: add_field
        name: gender
        field: { type: char }
        default: male
  - name: HomeworldSerializer
    fields:
      - { name: name, type: char, allow_null: true, required: false }
"#;

    #[test]
    fn test_load_yaml_with_forward_reference() {
        let document = SchemaDocument::from_yaml_str(PEOPLE).unwrap();
        let registry = SchemaRegistry::from_document(&document).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["HomeworldSerializer", "PersonSerializer"]);

        let person = registry.get("PersonSerializer").unwrap();
        assert_eq!(person.fields().names().collect::<Vec<_>>(), vec!["name", "height", "homeworld"]);
        assert_eq!(person.changes().len(), 3);

        let (_, group) = person
            .changes()
            .entries()
            .find(|(v, _)| *v == VersionIdentifier::parse("2018-07-29").unwrap())
            .unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group[0], Change::rename_field("iColor", "eyeColor"));

        let homeworld = registry.get("HomeworldSerializer").unwrap();
        let name = homeworld.fields().get("name").unwrap();
        assert!(!name.is_required());
        assert!(name.allows_null());
    }

    #[test]
    fn test_add_field_default_is_kept() {
        let registry = SchemaRegistry::from_document(&SchemaDocument::from_yaml_str(PEOPLE).unwrap()).unwrap();
        let person = registry.get("PersonSerializer").unwrap();
        let (_, changes) = person.changes().entries().last().unwrap();
        assert_eq!(changes[0], Change::add_field("gender", Field::char()).with_default("male"));
    }

    #[test]
    fn test_json_document() {
        let document = SchemaDocument::from_json_str(
            r#"{"schemas": [{"name": "A", "fields": [{"name": "when", "type": "date"}],
                "changes": {"2020-01-01": {"op": "change_field_type", "name": "when",
                    "old": {"type": "char"}, "new": {"type": "date"}}}}]}"#,
        )
        .unwrap();
        let registry = SchemaRegistry::from_document(&document).unwrap();
        let schema = registry.get("A").unwrap();
        assert_eq!(schema.changes().entries().next().unwrap().1[0].kind(), "ChangeFieldType");
    }

    #[test]
    fn test_unknown_and_cyclic_references() {
        let document = SchemaDocument::from_yaml_str(
            "schemas:\n  - name: A\n    fields:\n      - { name: b, type: nested, schema: B }\n",
        )
        .unwrap();
        let err = SchemaRegistry::from_document(&document).unwrap_err();
        assert!(err.to_string().contains("Unknown nested schema 'B'"));

        let document = SchemaDocument::from_yaml_str(
            "schemas:\n  - name: A\n    fields:\n      - { name: b, type: nested, schema: B }\n  - name: B\n    fields:\n      - { name: a, type: nested, schema: A }\n",
        )
        .unwrap();
        let err = SchemaRegistry::from_document(&document).unwrap_err();
        assert!(err.to_string().contains("nests itself"));
    }

    #[test]
    fn test_duplicate_schema_and_bad_version_key() {
        let document = SchemaDocument::from_yaml_str("schemas:\n  - name: A\n  - name: A\n").unwrap();
        assert!(SchemaRegistry::from_document(&document).is_err());

        let document = SchemaDocument::from_yaml_str(
            "schemas:\n  - name: A\n    changes:\n      yesterday: { op: no_op }\n",
        )
        .unwrap();
        let err = SchemaRegistry::from_document(&document).unwrap_err();
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn test_unknown_schema_lookup() {
        let registry = SchemaRegistry::default();
        assert!(registry.is_empty());
        assert!(matches!(registry.get("Nope"), Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_load_picks_format_from_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let yaml = dir.path().join("people.yml");
        std::fs::write(&yaml, PEOPLE).unwrap();
        assert_eq!(SchemaRegistry::load(&yaml).unwrap().len(), 2);

        // Anything that is not YAML is read as JSON
        let misnamed = dir.path().join("people.txt");
        std::fs::write(&misnamed, PEOPLE).unwrap();
        assert!(matches!(SchemaRegistry::load(&misnamed), Err(Error::Json { .. })));

        assert!(matches!(
            SchemaRegistry::load(&dir.path().join("missing.yaml")),
            Err(Error::Io { .. })
        ));
    }
}
