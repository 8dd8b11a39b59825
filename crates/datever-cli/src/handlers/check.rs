//! Check command handler

use super::utils::load_registry;
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;
use datever_core::{Schema, SchemaRegistry};
use serde::Serialize;
use std::path::Path;
use tracing::{info, instrument};

/// Summary of one loaded schema
#[derive(Debug, Serialize, PartialEq)]
pub struct SchemaSummary {
    pub name: String,
    pub fields: usize,
    pub changes: usize,
    pub latest: Option<String>,
}

impl From<&Schema> for SchemaSummary {
    fn from(schema: &Schema) -> Self {
        let changes = schema.changes();
        Self {
            name: schema.name().to_string(),
            fields: schema.fields().len(),
            changes: changes.entries().map(|(_, group)| group.len()).sum(),
            latest: changes.latest().map(|version| version.to_string()),
        }
    }
}

/// Summarize every schema in a registry
pub fn summarize(registry: &SchemaRegistry) -> Vec<SchemaSummary> {
    registry.iter().map(|schema| SchemaSummary::from(schema.as_ref())).collect()
}

/// Handle the check command
#[instrument(skip(schemas, config, output))]
pub fn handle_check(schemas: Option<&Path>, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let path = config.schema_path(schemas)?;
    let registry = load_registry(Some(&path), config)?;
    let summaries = summarize(&registry);
    info!(schemas = summaries.len(), path = %path.display(), "schema document is valid");

    if !output.is_human() {
        return output.data(&summaries);
    }

    if summaries.is_empty() {
        return output.warning(&format!("{} defines no schemas", path.display()));
    }

    output.success(&format!(
        "✓ {} schema(s) loaded from {}",
        summaries.len(),
        path.display()
    ))?;
    output.section("Schemas")?;
    output.table(
        &["Schema", "Fields", "Changes", "Latest"],
        summaries
            .into_iter()
            .map(|summary| {
                vec![
                    summary.name,
                    summary.fields.to_string(),
                    summary.changes.to_string(),
                    summary.latest.unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect(),
    )
}
