//! List and list-entry commands.

use clap::{Args, Subcommand, ValueEnum};
use serde_json::Value;

use crate::api::lists::{EntriesEndpoint, ListsEndpoint};
use crate::error::CliError;
use crate::output::{emit, OutputOptions};
use crate::pagination::collect_all_pages;

#[derive(Debug, Subcommand)]
pub enum ListCommand {
    /// List all lists
    List(ListAllArgs),
    /// Fetch one list by ID
    Get(ListIdArgs),
    /// Create a dynamic list
    Create(ListCreateArgs),
}

#[derive(Debug, Args)]
pub struct ListAllArgs {
    /// Auto-paginate all records
    #[arg(long)]
    pub all: bool,
    /// Starting page token
    #[arg(long)]
    pub page_token: Option<String>,
}

#[derive(Debug, Args)]
pub struct ListIdArgs {
    /// List ID
    pub id: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListEntityType {
    Person,
    Organization,
    Opportunity,
}

impl ListEntityType {
    fn as_str(&self) -> &'static str {
        match self {
            ListEntityType::Person => "person",
            ListEntityType::Organization => "organization",
            ListEntityType::Opportunity => "opportunity",
        }
    }
}

#[derive(Debug, Args)]
pub struct ListCreateArgs {
    /// List name
    #[arg(long, required = true)]
    pub name: String,
    /// Entity type held by the list
    #[arg(long, value_enum, required = true)]
    pub r#type: ListEntityType,
    /// Create the list as private
    #[arg(long)]
    pub private: bool,
}

#[derive(Debug, Subcommand)]
pub enum EntryCommand {
    /// List entries of a list
    List(EntryListArgs),
    /// Fetch one list entry
    Get(EntryGetArgs),
    /// Add an entity to a list
    Add(EntryAddArgs),
    /// Remove an entry from a list
    Delete(EntryGetArgs),
}

#[derive(Debug, Args)]
pub struct EntryListArgs {
    /// List ID
    #[arg(long, required = true)]
    pub list_id: String,
    /// Auto-paginate all records
    #[arg(long)]
    pub all: bool,
    /// Page size
    #[arg(long)]
    pub page_size: Option<u32>,
    /// Starting page token
    #[arg(long)]
    pub page_token: Option<String>,
}

#[derive(Debug, Args)]
pub struct EntryGetArgs {
    /// List ID
    #[arg(long, required = true)]
    pub list_id: String,
    /// Entry ID
    pub entry_id: String,
}

#[derive(Debug, Args)]
pub struct EntryAddArgs {
    /// List ID
    #[arg(long, required = true)]
    pub list_id: String,
    /// Entity ID to add
    #[arg(long, required = true)]
    pub entity_id: String,
}

pub async fn run_list(
    endpoint: &ListsEndpoint,
    command: &ListCommand,
    output: &OutputOptions,
) -> Result<(), CliError> {
    match command {
        ListCommand::List(args) => {
            if args.all {
                let records = collect_all_pages(|token| {
                    let token = token.or_else(|| args.page_token.clone());
                    async move { endpoint.list_all(token.as_deref()).await }
                })
                .await?;
                emit(
                    Value::Array(records.into_iter().map(Value::Object).collect()),
                    output,
                );
            } else {
                let page = endpoint.list_all(args.page_token.as_deref()).await?;
                emit(
                    Value::Array(page.items.into_iter().map(Value::Object).collect()),
                    output,
                );
            }
        }
        ListCommand::Get(args) => {
            emit(Value::Object(endpoint.get(&args.id).await?), output);
        }
        ListCommand::Create(args) => {
            let created = endpoint
                .create(&args.name, args.r#type.as_str(), Some(args.private))
                .await?;
            emit(Value::Object(created), output);
        }
    }
    Ok(())
}

pub async fn run_entry(
    endpoint: &EntriesEndpoint,
    command: &EntryCommand,
    output: &OutputOptions,
) -> Result<(), CliError> {
    match command {
        EntryCommand::List(args) => {
            if args.all {
                let records = collect_all_pages(|token| {
                    let token = token.or_else(|| args.page_token.clone());
                    async move {
                        endpoint
                            .list(&args.list_id, token.as_deref(), args.page_size)
                            .await
                    }
                })
                .await?;
                emit(
                    Value::Array(records.into_iter().map(Value::Object).collect()),
                    output,
                );
            } else {
                let page = endpoint
                    .list(&args.list_id, args.page_token.as_deref(), args.page_size)
                    .await?;
                emit(
                    Value::Array(page.items.into_iter().map(Value::Object).collect()),
                    output,
                );
            }
        }
        EntryCommand::Get(args) => {
            let entry = endpoint.get(&args.list_id, &args.entry_id).await?;
            emit(Value::Object(entry), output);
        }
        EntryCommand::Add(args) => {
            let entry = endpoint.add(&args.list_id, &args.entity_id).await?;
            emit(Value::Object(entry), output);
        }
        EntryCommand::Delete(args) => {
            let deleted = endpoint.delete(&args.list_id, &args.entry_id).await?;
            emit(deleted, output);
        }
    }
    Ok(())
}
