//! Negotiate command handler

use super::utils::negotiator;
use crate::cli::NegotiateArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;
use datever_core::{RequestMetadata, VersionNegotiator};
use serde::Serialize;
use tracing::instrument;

/// Machine-readable negotiation outcome
#[derive(Debug, Serialize)]
struct Negotiated {
    header: String,
    value: Option<String>,
    version: String,
}

/// Handle the negotiate command
#[instrument(skip(config, output), fields(header = %config.negotiation.header))]
pub fn handle_negotiate(args: NegotiateArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let header = config.negotiation.header.clone();
    let mut metadata = RequestMetadata::new();
    if let Some(value) = &args.header_value {
        metadata.insert(&header, value.as_str());
    }

    let version = negotiator(config).negotiate(&metadata)?;

    if output.is_human() {
        match &args.header_value {
            Some(value) => output.info(&format!("{}: {}", header, value))?,
            None => output.info(&format!("No {} header, using today", header))?,
        }
        output.writeln(&version.to_string())?;
        return Ok(());
    }

    output.data(&Negotiated {
        header,
        value: args.header_value,
        version: version.to_string(),
    })
}
