//! Error types and handling for the CLI
//!
//! This module provides error types and utilities for handling
//! various failure modes in the CLI application.

use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from datever-core library
    #[error("{0}")]
    Core(#[from] datever_core::Error),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Invalid file format
    #[error("Invalid file format for {}: expected {} format", path.display(), expected)]
    InvalidFormat { path: PathBuf, expected: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument combination
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid arguments error
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs(message.into())
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(datever_core::Error::NotAcceptable { .. }) => 7,
            Self::Core(datever_core::Error::Invalid { .. }) => 8,
            Self::Core(_) => 2,
            Self::FileNotFound { .. } => 3,
            Self::InvalidFormat { .. } => 4,
            Self::Config(_) => 5,
            Self::InvalidArgs(_) => 6,
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::Other { .. } => 99,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::InvalidArgs(_))
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    let mut lines = vec![error.to_string()];

    // One line per rejected field
    if let Error::Core(datever_core::Error::Invalid { errors }) = error {
        lines = vec!["Input data is not valid for this version".to_string()];
        for (field, messages) in errors {
            for message in messages {
                lines.push(format!("  {}: {}", field, message));
            }
        }
    }

    if use_color {
        use colored::Colorize;
        format!("{} {}", "Error:".red().bold(), lines.join("\n"))
    } else {
        format!("Error: {}", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datever_core::FieldErrors;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::Core(datever_core::Error::not_acceptable("X-Version")).exit_code(), 7);
        assert_eq!(Error::config("bad").exit_code(), 5);
        assert_eq!(Error::other("boom").exit_code(), 99);
        assert!(Error::invalid_args("nope").should_show_help());
    }

    #[test]
    fn test_format_invalid_input() {
        let mut errors = FieldErrors::new();
        errors.insert("height".to_string(), vec!["A valid integer is required.".to_string()]);
        let error = Error::Core(datever_core::Error::Invalid { errors });

        let formatted = format_error(&error, false);
        assert!(formatted.starts_with("Error: Input data is not valid"));
        assert!(formatted.contains("  height: A valid integer is required."));
    }

    #[test]
    fn test_not_acceptable_message_is_kept() {
        let error = Error::from(datever_core::Error::not_acceptable("X-Version"));
        assert_eq!(
            format_error(&error, false),
            "Error: Invalid version in \"X-Version\" header."
        );
    }
}
