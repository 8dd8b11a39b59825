//! Datever CLI - Command-line interface for date-versioned serialization schemas
//!
//! This is the main entry point for the Datever CLI application, providing
//! commands for negotiating versions, inspecting schemas at a version and
//! moving payloads between the latest shape and older ones.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands, OutputFormat};
use colored::control;
use config::Config;
use error::Result;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Load configuration before logging so the file can set the level
    let config = match Config::load_with_file(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", error::format_error(&e, cli.use_color()));
            process::exit(e.exit_code());
        }
    };

    control::set_override(cli.use_color() && config.output.color);

    if let Err(e) = init_logging(&cli, &config) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli, config) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

            if e.should_show_help() {
                eprintln!("\nFor more information, try '--help'");
            }

            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
#[instrument(skip(cli, config), fields(command = ?cli.command))]
fn run(cli: Cli, config: Config) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    let format = resolve_format(cli.output, &config)?;
    let use_color = cli.use_color() && config.output.color;
    let mut output = OutputWriter::new(format, use_color, cli.quiet);

    tracing::info!(
        command = ?cli.command,
        format = ?output.format(),
        verbosity = cli.verbosity_level(),
        "Executing command"
    );

    let schemas = cli.schemas.as_deref();
    match cli.command {
        Commands::Negotiate(args) => handlers::handle_negotiate(args, &config, &mut output),
        Commands::Fields(args) => handlers::handle_fields(args, schemas, &config, &mut output),
        Commands::Changes(args) => handlers::handle_changes(args, schemas, &config, &mut output),
        Commands::Downgrade(args) => handlers::handle_downgrade(args, schemas, &config, &mut output),
        Commands::Upgrade(args) => handlers::handle_upgrade(args, schemas, &config, &mut output),
        Commands::Check => handlers::handle_check(schemas, &config, &mut output),
        Commands::Completions(args) => handlers::handle_completions(args),
    }
}

/// Pick the output format: the flag wins over the configured default
fn resolve_format(flag: Option<OutputFormat>, config: &Config) -> Result<OutputFormat> {
    if let Some(format) = flag {
        return Ok(format);
    }
    OutputFormat::from_name(&config.output.format).ok_or_else(|| {
        error::Error::invalid_args(format!(
            "Unknown output format '{}' in configuration",
            config.output.format
        ))
    })
}

/// Initialize the logging system
fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let mut logging_config = LoggingConfig::from_verbosity(cli.verbosity_level());
    logging_config.merge_with_config(&config.logging, cli.verbosity_level());
    logging_config.merge_with_env();

    // If quiet mode, only log errors
    if cli.quiet {
        logging_config.level = "error".to_string();
        logging_config.console = false;
    }

    logging::init_logging(logging_config)
}
