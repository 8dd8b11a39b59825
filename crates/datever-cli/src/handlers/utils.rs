//! Shared utilities for command handlers

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use datever_core::{Context, DateHeaderNegotiator, Request, RequestMetadata, SchemaRegistry};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Load the schema definition document named on the command line or in the config
pub fn load_registry(schemas: Option<&Path>, config: &Config) -> Result<SchemaRegistry> {
    let path = config.schema_path(schemas)?;
    if !path.exists() {
        return Err(Error::FileNotFound { path });
    }

    let _timer = Timer::with_details("load_schemas", &path.display().to_string());
    Ok(SchemaRegistry::load(&path)?)
}

/// The negotiator for the configured version header
pub fn negotiator(config: &Config) -> DateHeaderNegotiator {
    DateHeaderNegotiator::with_header(config.negotiation.header.as_str())
}

/// Build the model context for a requested version
///
/// The version goes through header negotiation, so a malformed value is
/// rejected exactly as it would be on a request. No version means no
/// request is bound and models keep their latest shape.
pub fn context_for(api_version: Option<&str>, config: &Config) -> Result<Context> {
    let Some(value) = api_version else {
        return Ok(Context::new());
    };

    let metadata = RequestMetadata::new().with_header(&config.negotiation.header, value);
    let request = Request::new(metadata).negotiate(&negotiator(config))?;
    Ok(Context::from_request(request))
}

/// Read a JSON or YAML payload file
pub fn read_payload(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s == "yaml" || s == "yml")
        .unwrap_or(false);

    let value = if is_yaml {
        serde_yaml::from_str(&content).map_err(|_| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "YAML".to_string(),
        })?
    } else {
        serde_json::from_str(&content).map_err(|_| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "JSON".to_string(),
        })?
    };

    tracing::debug!(path = %path.display(), bytes = content.len(), "read payload");
    Ok(value)
}
