//! Configuration management for the CLI
//!
//! This module handles loading and merging configuration from:
//! - Default values
//! - Configuration files (YAML/JSON)
//! - Environment variables
//! - Command-line arguments

use crate::error::{Error, Result};
use datever_core::VERSION_HEADER;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema definition document used when `--schemas` is not given
    pub schemas: Option<PathBuf>,

    /// Version negotiation settings
    pub negotiation: NegotiationConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Version negotiation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Header carrying the requested version
    pub header: String,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format
    pub format: String,

    /// Use colored output by default
    pub color: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no `-v` flag is given
    pub level: String,

    /// Log format (compact, full, json)
    pub format: String,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            header: VERSION_HEADER.to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "human".to_string(),
            color: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;

        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };

        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => {
                        tracing::debug!(path = %path.display(), "loaded configuration");
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "failed to load configuration");
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations,
    /// then apply environment overrides
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::load()?,
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Get default configuration file paths to check
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".datever.yaml"),
            PathBuf::from(".datever.yml"),
            PathBuf::from(".datever.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let datever_dir = config_dir.join("datever");
            paths.push(datever_dir.join("config.yaml"));
            paths.push(datever_dir.join("config.json"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".datever.yaml"));
            paths.push(home_dir.join(".datever.json"));
        }

        paths
    }

    /// Apply `DATEVER_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(schemas) = lookup("DATEVER_SCHEMAS") {
            self.schemas = Some(PathBuf::from(schemas));
        }
        if let Some(header) = lookup("DATEVER_HEADER") {
            self.negotiation.header = header;
        }
        if let Some(format) = lookup("DATEVER_OUTPUT") {
            self.output.format = format;
        }
        if let Some(level) = lookup("DATEVER_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// The schema document to use, preferring the command-line path
    pub fn schema_path(&self, cli_path: Option<&Path>) -> Result<PathBuf> {
        cli_path
            .map(Path::to_path_buf)
            .or_else(|| self.schemas.clone())
            .ok_or_else(|| {
                Error::config("No schema document given; pass --schemas or set `schemas` in the config file")
            })
    }
}
