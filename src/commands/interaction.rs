//! Interaction commands.

use clap::{Args, Subcommand};
use serde_json::Value;

use crate::api::interactions::InteractionsEndpoint;
use crate::commands::{parse_json_arg, parse_json_record};
use crate::error::CliError;
use crate::output::{emit, OutputOptions};
use crate::record::RawRecord;

#[derive(Debug, Subcommand)]
pub enum InteractionCommand {
    /// List interactions
    List(InteractionListArgs),
    /// Fetch one interaction by ID
    Get(InteractionIdArgs),
    /// Create an interaction from a JSON payload
    Create(InteractionDataArgs),
}

#[derive(Debug, Args)]
pub struct InteractionListArgs {
    /// Raw query params JSON passed to API
    #[arg(long)]
    pub query: Option<String>,
}

#[derive(Debug, Args)]
pub struct InteractionIdArgs {
    /// Interaction ID
    pub id: String,
}

#[derive(Debug, Args)]
pub struct InteractionDataArgs {
    /// Interaction payload JSON
    #[arg(long, required = true)]
    pub data: String,
}

pub async fn run(
    endpoint: &InteractionsEndpoint,
    command: &InteractionCommand,
    output: &OutputOptions,
) -> Result<(), CliError> {
    match command {
        InteractionCommand::List(args) => {
            let params = match &args.query {
                Some(query) => parse_json_record(query, "--query")?,
                None => RawRecord::new(),
            };
            emit(endpoint.list(&params).await?, output);
        }
        InteractionCommand::Get(args) => {
            emit(Value::Object(endpoint.get(&args.id).await?), output);
        }
        InteractionCommand::Create(args) => {
            let payload = parse_json_arg(&args.data, "--data")?;
            emit(Value::Object(endpoint.create(&payload).await?), output);
        }
    }
    Ok(())
}
