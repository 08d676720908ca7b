//! API-key introspection commands.

use clap::Subcommand;

use crate::api::auth::AuthEndpoint;
use crate::error::CliError;
use crate::output::{emit, OutputOptions};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Show the user the API key belongs to
    Whoami,
    /// Show current API rate-limit usage
    RateLimit,
}

pub async fn run(
    endpoint: &AuthEndpoint,
    command: &AuthCommand,
    output: &OutputOptions,
) -> Result<(), CliError> {
    let payload = match command {
        AuthCommand::Whoami => endpoint.whoami().await?,
        AuthCommand::RateLimit => endpoint.rate_limit().await?,
    };
    emit(payload, output);
    Ok(())
}
