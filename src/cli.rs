//! Command tree and wiring.
//!
//! Builds the client and endpoint wrappers once, derives the entity
//! resolvers each command tree needs, and dispatches to the handlers.

use clap::{Parser, Subcommand};

use crate::api::auth::AuthEndpoint;
use crate::api::entities::{EntitiesEndpoint, EntityKind};
use crate::api::fields::{FieldValuesEndpoint, FieldsEndpoint};
use crate::api::interactions::InteractionsEndpoint;
use crate::api::lists::{EntriesEndpoint, ListsEndpoint};
use crate::api::notes::NotesEndpoint;
use crate::api::relationships::RelationshipStrengthsEndpoint;
use crate::api::AffinityClient;
use crate::commands::{auth, entity, field, interaction, list, note};
use crate::config::{self, AuthMode, ConfigOverrides};
use crate::error::CliError;
use crate::output::{OutputFormat, OutputOptions};
use crate::record::RawRecord;
use crate::resolve::reference::EntityResolver;

#[derive(Debug, Parser)]
#[command(
    name = "affinity",
    version,
    about = "Command-line client for the Affinity CRM v1 API"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Args)]
pub struct GlobalArgs {
    /// Affinity API key
    #[arg(long, global = true)]
    pub api_key: Option<String>,
    /// Auth mode
    #[arg(long, global = true, value_enum)]
    pub auth_mode: Option<AuthMode>,
    /// API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t)]
    pub format: OutputFormat,
    /// Enable compact output mode
    #[arg(long, global = true)]
    pub compact: bool,
    /// Show raw API payloads
    #[arg(long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            format: self.format,
            compact: self.compact,
            verbose: self.verbose,
        }
    }

    fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: self.api_key.clone(),
            auth_mode: self.auth_mode,
            base_url: self.base_url.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// API key introspection
    Auth {
        #[command(subcommand)]
        command: auth::AuthCommand,
    },
    /// Person management commands
    Person {
        #[command(subcommand)]
        command: entity::EntityCommand,
    },
    /// Organization management commands
    Organization {
        #[command(subcommand)]
        command: entity::EntityCommand,
    },
    /// Opportunity management commands
    Opportunity {
        #[command(subcommand)]
        command: entity::EntityCommand,
    },
    /// Note commands
    Note {
        #[command(subcommand)]
        command: note::NoteCommand,
    },
    /// List commands
    List {
        #[command(subcommand)]
        command: list::ListCommand,
    },
    /// List-entry commands
    Entry {
        #[command(subcommand)]
        command: list::EntryCommand,
    },
    /// Interaction commands
    Interaction {
        #[command(subcommand)]
        command: interaction::InteractionCommand,
    },
    /// Field definition commands
    Field {
        #[command(subcommand)]
        command: field::FieldCommand,
    },
    /// Field value commands
    FieldValue {
        #[command(subcommand)]
        command: field::FieldValueCommand,
    },
}

fn entity_resolver(endpoint: &EntitiesEndpoint) -> EntityResolver {
    let endpoint = endpoint.clone();
    EntityResolver::new(move |id| {
        let endpoint = endpoint.clone();
        async move { endpoint.get(&id, &RawRecord::new()).await }
    })
}

fn list_resolver(endpoint: &ListsEndpoint) -> EntityResolver {
    let endpoint = endpoint.clone();
    EntityResolver::new(move |id| {
        let endpoint = endpoint.clone();
        async move { endpoint.get(&id).await }
    })
}

fn interaction_resolver(endpoint: &InteractionsEndpoint) -> EntityResolver {
    let endpoint = endpoint.clone();
    EntityResolver::new(move |id| {
        let endpoint = endpoint.clone();
        async move { endpoint.get(&id).await }
    })
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config = config::resolve(&cli.global.config_overrides());
    let client = AffinityClient::new(&config)?;
    let output = cli.global.output_options();

    let persons = EntitiesEndpoint::new(client.clone(), EntityKind::Person);
    let organizations = EntitiesEndpoint::new(client.clone(), EntityKind::Organization);
    let opportunities = EntitiesEndpoint::new(client.clone(), EntityKind::Opportunity);
    let lists = ListsEndpoint::new(client.clone());
    let interactions = InteractionsEndpoint::new(client.clone());

    let person_resolver = entity_resolver(&persons);
    let organization_resolver = entity_resolver(&organizations);
    let opportunity_resolver = entity_resolver(&opportunities);

    match &cli.command {
        Command::Auth { command } => {
            auth::run(&AuthEndpoint::new(client), command, &output).await
        }
        Command::Person { command } => {
            let deps = entity::EntityDeps {
                endpoint: persons,
                person_resolver: Some(person_resolver),
                organization_resolver: Some(organization_resolver),
                opportunity_resolver: Some(opportunity_resolver),
                list_resolver: Some(list_resolver(&lists)),
                relationship_strengths: Some(RelationshipStrengthsEndpoint::new(client)),
            };
            entity::run(&deps, command, &output).await
        }
        Command::Organization { command } => {
            let deps = entity::EntityDeps {
                endpoint: organizations,
                person_resolver: Some(person_resolver),
                organization_resolver: None,
                opportunity_resolver: Some(opportunity_resolver),
                list_resolver: Some(list_resolver(&lists)),
                relationship_strengths: None,
            };
            entity::run(&deps, command, &output).await
        }
        Command::Opportunity { command } => {
            let deps = entity::EntityDeps {
                endpoint: opportunities,
                person_resolver: Some(person_resolver),
                organization_resolver: None,
                opportunity_resolver: None,
                list_resolver: None,
                relationship_strengths: None,
            };
            entity::run(&deps, command, &output).await
        }
        Command::Note { command } => {
            let deps = note::NoteDeps {
                endpoint: NotesEndpoint::new(client),
                person_resolver: Some(person_resolver),
                organization_resolver: Some(organization_resolver),
                opportunity_resolver: Some(opportunity_resolver),
                interaction_resolver: Some(interaction_resolver(&interactions)),
            };
            note::run(&deps, command, &output).await
        }
        Command::List { command } => list::run_list(&lists, command, &output).await,
        Command::Entry { command } => {
            list::run_entry(&EntriesEndpoint::new(client), command, &output).await
        }
        Command::Interaction { command } => {
            interaction::run(&interactions, command, &output).await
        }
        Command::Field { command } => {
            field::run_field(&FieldsEndpoint::new(client), command, &output).await
        }
        Command::FieldValue { command } => {
            field::run_field_value(&FieldValuesEndpoint::new(client), command, &output).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_tree_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_person_search() {
        let cli = Cli::parse_from([
            "affinity",
            "person",
            "search",
            "--term",
            "acme",
            "--with-interactions",
            "--format",
            "table",
        ]);
        assert!(matches!(
            cli.command,
            Command::Person {
                command: entity::EntityCommand::Search(_)
            }
        ));
        assert_eq!(cli.global.format, OutputFormat::Table);
    }

    #[test]
    fn test_parse_note_get_full() {
        let cli = Cli::parse_from(["affinity", "note", "get", "31", "--full", "--compact"]);
        let Command::Note {
            command: note::NoteCommand::Get(args),
        } = cli.command
        else {
            panic!("expected note get");
        };
        assert_eq!(args.id, "31");
        assert!(args.full);
        assert!(cli.global.compact);
    }
}
