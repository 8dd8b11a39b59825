//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API,
//! providing a type-safe and well-documented command interface.

use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;

/// Datever CLI - Date-keyed API versioning for serialization schemas
///
/// Inspect how a schema looked at any API version, downgrade canonical
/// payloads for old clients and upgrade their input back to the latest shape.
#[derive(Parser, Debug)]
#[command(
    name = "datever",
    version,
    author,
    about,
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "DATEVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the schema definition document (JSON or YAML)
    #[arg(short, long, global = true, env = "DATEVER_SCHEMAS")]
    pub schemas: Option<PathBuf>,

    /// Output format for results (defaults to the configured format)
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the API version a request header selects
    Negotiate(NegotiateArgs),

    /// Show the fields a schema exposes at a version
    Fields(FieldsArgs),

    /// List the changes a version sees, newest first
    Changes(ChangesArgs),

    /// Serialize a canonical instance for an older version
    Downgrade(TransformArgs),

    /// Validate historical input and bring it to the latest shape
    Upgrade(TransformArgs),

    /// Load and validate the schema definition document
    Check,

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Arguments for the negotiate command
#[derive(Parser, Debug)]
pub struct NegotiateArgs {
    /// Value of the version header; omit to negotiate a request without one
    #[arg(long = "header", value_name = "VALUE")]
    pub header_value: Option<String>,
}

/// Arguments for the fields command
#[derive(Parser, Debug)]
pub struct FieldsArgs {
    /// Schema name in the definition document
    #[arg(value_name = "MODEL")]
    pub model: String,

    /// API version (YYYY-MM-DD); the latest shape when omitted
    #[arg(long = "version", value_name = "YYYY-MM-DD")]
    pub api_version: Option<String>,
}

/// Arguments for the changes command
#[derive(Parser, Debug)]
pub struct ChangesArgs {
    /// Schema name in the definition document
    #[arg(value_name = "MODEL")]
    pub model: String,

    /// API version (YYYY-MM-DD); every change when omitted
    #[arg(long = "version", value_name = "YYYY-MM-DD")]
    pub api_version: Option<String>,
}

/// Arguments for the downgrade and upgrade commands
#[derive(Parser, Debug)]
pub struct TransformArgs {
    /// Schema name in the definition document
    #[arg(value_name = "MODEL")]
    pub model: String,

    /// Payload file (JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// API version (YYYY-MM-DD); the latest shape when omitted
    #[arg(long = "version", value_name = "YYYY-MM-DD")]
    pub api_version: Option<String>,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl OutputFormat {
    /// Parse a configured format name, accepting the CLI spellings
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}
