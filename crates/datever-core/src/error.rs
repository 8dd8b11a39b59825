//! Error types for the datever core library
//!
//! This module defines the error taxonomy of the versioning engine. Errors fall
//! in two families: client-input problems (an unparseable version header, input
//! data that fails validation) and programmer or configuration problems (a
//! change set that does not match the canonical schema, reading output before
//! validating input). Nothing here is retried or masked.

use std::collections::BTreeMap;
use thiserror::Error;

/// HTTP status used when version negotiation fails
pub const NOT_ACCEPTABLE: u16 = 406;

/// Per-field validation messages, keyed by field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Main error type for datever operations
#[derive(Error, Debug)]
pub enum Error {
    /// The requested version could not be parsed
    #[error("{message}")]
    NotAcceptable {
        message: String,
        header: String,
    },

    /// The model was used out of order by its caller
    #[error("Contract violation: {message}")]
    ContractViolation {
        message: String,
    },

    /// A change referenced a key absent from the fields or payload
    #[error("Missing key '{key}' while {context}")]
    MissingKey {
        key: String,
        context: String,
    },

    /// A field descriptor rejected a value
    #[error("Field conversion failed for '{field}': {message}")]
    FieldConversion {
        field: String,
        message: String,
    },

    /// Bound input data did not validate
    #[error("Invalid input: {}", summarize(errors))]
    Invalid {
        errors: FieldErrors,
    },

    /// Malformed change set or schema definition
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing errors
    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build the negotiation failure for a header
    pub fn not_acceptable(header: impl Into<String>) -> Self {
        let header = header.into();
        Error::NotAcceptable {
            message: format!("Invalid version in \"{}\" header.", header),
            header,
        }
    }

    /// Build a missing-key failure
    pub fn missing_key(key: impl Into<String>, context: impl Into<String>) -> Self {
        Error::MissingKey {
            key: key.into(),
            context: context.into(),
        }
    }

    /// Build a contract violation
    pub fn contract(message: impl Into<String>) -> Self {
        Error::ContractViolation {
            message: message.into(),
        }
    }

    /// Build a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Build a field conversion error
    pub fn conversion(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::FieldConversion {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the failure was caused by client input rather than by the caller
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::NotAcceptable { .. } | Error::Invalid { .. })
    }

    /// HTTP status an outer framework should answer with, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::NotAcceptable { .. } => Some(NOT_ACCEPTABLE),
            Error::Invalid { .. } => Some(400),
            _ => None,
        }
    }
}

fn summarize(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}
