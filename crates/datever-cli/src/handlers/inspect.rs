//! Fields and changes command handlers

use super::utils::{context_for, load_registry};
use crate::cli::{ChangesArgs, FieldsArgs};
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;
use datever_core::{Change, Context, FieldSet, VersionIdentifier, VersionedModel};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A field declaration as seen at one version
#[derive(Debug, Serialize, PartialEq)]
pub struct FieldRow {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub required: bool,
    pub allow_null: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub many: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldRow>,
}

/// One entry of a changelog
#[derive(Debug, Serialize, PartialEq)]
pub struct ChangeRow {
    pub version: String,
    pub kind: String,
    pub description: String,
}

impl ChangeRow {
    fn new(version: VersionIdentifier, change: &Change) -> Self {
        Self {
            version: version.to_string(),
            kind: change.kind().to_string(),
            description: change.to_string(),
        }
    }
}

/// Handle the fields command
#[instrument(skip(schemas, config, output), fields(model = %args.model))]
pub fn handle_fields(
    args: FieldsArgs,
    schemas: Option<&Path>,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let registry = load_registry(schemas, config)?;
    let context = context_for(args.api_version.as_deref(), config)?;
    let mut model = VersionedModel::new(registry.get(&args.model)?).with_context(context.clone());

    if output.is_human() {
        return output.writeln(&model.render()?);
    }

    let rows = field_rows(model.fields()?, &context)?;
    debug!(fields = rows.len(), "resolved fields");
    output.data(&rows)
}

/// Describe a field set, resolving nested schemas at the same version
pub fn field_rows(fields: &FieldSet, context: &Context) -> Result<Vec<FieldRow>> {
    let mut rows = Vec::with_capacity(fields.len());
    for (name, field) in fields.iter() {
        let (many, nested) = match field.nested_schema() {
            Some((schema, many)) => {
                let mut nested = VersionedModel::new(Arc::clone(schema)).with_context(context.clone());
                (many, field_rows(nested.fields()?, context)?)
            }
            None => (false, Vec::new()),
        };
        rows.push(FieldRow {
            name: name.to_string(),
            kind: field.kind().type_name().to_string(),
            required: field.is_required(),
            allow_null: field.allows_null(),
            many,
            fields: nested,
        });
    }
    Ok(rows)
}

/// Handle the changes command
#[instrument(skip(schemas, config, output), fields(model = %args.model))]
pub fn handle_changes(
    args: ChangesArgs,
    schemas: Option<&Path>,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let registry = load_registry(schemas, config)?;
    let schema = registry.get(&args.model)?;
    let context = context_for(args.api_version.as_deref(), config)?;

    let rows: Vec<ChangeRow> = match context.version() {
        Some(version) => {
            output.info(&format!("Changes newer than {}, newest first", version))?;
            schema
                .changes()
                .active_changes(Some(version))
                .downgrade_order()
                .map(|(version, change)| ChangeRow::new(version, change))
                .collect()
        }
        None => {
            output.info(&format!("Changelog of {}, newest first", schema.name()))?;
            schema
                .changes()
                .entries()
                .flat_map(|(version, changes)| {
                    changes.iter().map(move |change| ChangeRow::new(version, change))
                })
                .collect()
        }
    };

    if !output.is_human() {
        return output.data(&rows);
    }

    if rows.is_empty() {
        return output.info("No changes");
    }
    output.table(
        &["Version", "Change"],
        rows.into_iter().map(|row| vec![row.version, row.description]).collect(),
    )
}
