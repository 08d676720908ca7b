//! Field-definition and field-value commands.

use clap::{Args, Subcommand};
use serde_json::Value;

use crate::api::fields::{FieldValueOwner, FieldValuesEndpoint, FieldsEndpoint};
use crate::commands::parse_json_arg;
use crate::error::CliError;
use crate::output::{emit, OutputOptions};

#[derive(Debug, Subcommand)]
pub enum FieldCommand {
    /// List field definitions
    List(FieldListArgs),
    /// Create a field from a JSON payload
    Create(FieldDataArgs),
    /// Delete a field by ID
    Delete(FieldIdArgs),
}

#[derive(Debug, Args)]
pub struct FieldListArgs {
    /// Numeric entity type filter
    #[arg(long)]
    pub entity_type: Option<String>,
    /// List ID filter
    #[arg(long)]
    pub list_id: Option<String>,
    /// Starting page token
    #[arg(long)]
    pub page_token: Option<String>,
}

#[derive(Debug, Args)]
pub struct FieldDataArgs {
    /// Field payload JSON
    #[arg(long, required = true)]
    pub data: String,
}

#[derive(Debug, Args)]
pub struct FieldIdArgs {
    /// Field ID
    pub id: String,
}

#[derive(Debug, Subcommand)]
pub enum FieldValueCommand {
    /// List field values for one entity
    List(FieldValueListArgs),
    /// Update a field value
    Update(FieldValueUpdateArgs),
}

#[derive(Debug, Args)]
pub struct FieldValueListArgs {
    /// Person ID filter
    #[arg(long)]
    pub person_id: Option<String>,
    /// Organization ID filter
    #[arg(long)]
    pub organization_id: Option<String>,
    /// Opportunity ID filter
    #[arg(long)]
    pub opportunity_id: Option<String>,
    /// List entry ID filter
    #[arg(long)]
    pub entry_id: Option<String>,
    /// Starting page token
    #[arg(long)]
    pub page_token: Option<String>,
}

#[derive(Debug, Args)]
pub struct FieldValueUpdateArgs {
    /// Field value ID
    pub id: String,
    /// New value JSON
    #[arg(long, required = true)]
    pub value: String,
}

pub async fn run_field(
    endpoint: &FieldsEndpoint,
    command: &FieldCommand,
    output: &OutputOptions,
) -> Result<(), CliError> {
    match command {
        FieldCommand::List(args) => {
            let page = endpoint
                .list(
                    args.entity_type.as_deref(),
                    args.list_id.as_deref(),
                    args.page_token.as_deref(),
                )
                .await?;
            emit(
                Value::Array(page.items.into_iter().map(Value::Object).collect()),
                output,
            );
        }
        FieldCommand::Create(args) => {
            let payload = parse_json_arg(&args.data, "--data")?;
            emit(Value::Object(endpoint.create(&payload).await?), output);
        }
        FieldCommand::Delete(args) => {
            emit(endpoint.delete(&args.id).await?, output);
        }
    }
    Ok(())
}

pub async fn run_field_value(
    endpoint: &FieldValuesEndpoint,
    command: &FieldValueCommand,
    output: &OutputOptions,
) -> Result<(), CliError> {
    match command {
        FieldValueCommand::List(args) => {
            let owner = FieldValueOwner {
                person_id: args.person_id.clone(),
                organization_id: args.organization_id.clone(),
                opportunity_id: args.opportunity_id.clone(),
                list_entry_id: args.entry_id.clone(),
            };
            let page = endpoint.list(&owner, args.page_token.as_deref()).await?;
            emit(
                Value::Array(page.items.into_iter().map(Value::Object).collect()),
                output,
            );
        }
        FieldValueCommand::Update(args) => {
            let value = parse_json_arg(&args.value, "--value")?;
            emit(Value::Object(endpoint.update(&args.id, &value).await?), output);
        }
    }
    Ok(())
}
