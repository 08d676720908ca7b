//! Note commands.
//!
//! Listing supports the three detail modes. JSON output wraps records in a
//! pagination envelope; table and CSV output flatten each note to one row of
//! joined IDs, names, and truncated excerpts.

use clap::{Args, Subcommand};
use serde_json::{json, Map, Value};

use crate::api::notes::{NoteListParams, NotesEndpoint};
use crate::commands::parse_json_arg;
use crate::error::CliError;
use crate::note_content::{truncate_text, with_truncated_note_content};
use crate::output::{emit, OutputFormat, OutputOptions};
use crate::record::{self, RawRecord};
use crate::resolve::note::{
    resolve_note_by_mode, resolve_notes_by_mode, NoteDetailMode, NoteResolutionDeps,
};
use crate::resolve::reference::EntityResolver;

const NOTE_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Subcommand)]
pub enum NoteCommand {
    /// List notes, optionally filtered by linked entity
    List(NoteListArgs),
    /// Fetch one note by ID
    Get(NoteGetArgs),
    /// Create a note from a JSON payload
    Create(NoteDataArgs),
    /// Update a note from a JSON payload
    Update(NoteUpdateArgs),
    /// Delete a note by ID
    Delete(NoteIdArgs),
}

#[derive(Debug, Args)]
pub struct NoteListArgs {
    /// Filter notes tagged with this person ID
    #[arg(long)]
    pub person_id: Option<String>,
    /// Filter notes tagged with this organization ID
    #[arg(long)]
    pub organization_id: Option<String>,
    /// Filter notes tagged with this opportunity ID
    #[arg(long)]
    pub opportunity_id: Option<String>,
    /// Auto-paginate all records
    #[arg(long)]
    pub all: bool,
    /// Page size
    #[arg(long, default_value_t = 25)]
    pub page_size: u32,
    /// Starting page token
    #[arg(long)]
    pub page_token: Option<String>,
    /// Resolve linked entity references (persons, organizations, opportunities)
    #[arg(long)]
    pub detailed: bool,
    /// Includes --detailed plus attached interaction and parent note summaries
    #[arg(long)]
    pub full: bool,
}

#[derive(Debug, Args)]
pub struct NoteGetArgs {
    /// Note ID
    pub id: String,
    /// Resolve linked entity references
    #[arg(long)]
    pub detailed: bool,
    /// Includes --detailed plus interaction and parent note summaries
    #[arg(long)]
    pub full: bool,
}

#[derive(Debug, Args)]
pub struct NoteDataArgs {
    /// Note payload JSON
    #[arg(long, required = true)]
    pub data: String,
}

#[derive(Debug, Args)]
pub struct NoteUpdateArgs {
    /// Note ID
    pub id: String,
    /// Note payload JSON
    #[arg(long, required = true)]
    pub data: String,
}

#[derive(Debug, Args)]
pub struct NoteIdArgs {
    /// Note ID
    pub id: String,
}

/// Endpoint and resolver wiring for the note command tree.
pub struct NoteDeps {
    pub endpoint: NotesEndpoint,
    pub person_resolver: Option<EntityResolver>,
    pub organization_resolver: Option<EntityResolver>,
    pub opportunity_resolver: Option<EntityResolver>,
    pub interaction_resolver: Option<EntityResolver>,
}

impl NoteDeps {
    /// Resolvers for one resolution pass. Raw mode (and compact output)
    /// resolve nothing; full mode adds the interaction resolver and the notes
    /// endpoint itself as the parent-note resolver.
    fn resolution_deps(&self, mode: NoteDetailMode, compact: bool) -> NoteResolutionDeps {
        if compact || mode == NoteDetailMode::Raw {
            return NoteResolutionDeps::default();
        }

        let mut deps = NoteResolutionDeps {
            person: self.person_resolver.clone(),
            organization: self.organization_resolver.clone(),
            opportunity: self.opportunity_resolver.clone(),
            ..Default::default()
        };
        if mode == NoteDetailMode::Full {
            deps.interaction = self.interaction_resolver.clone();
            let endpoint = self.endpoint.clone();
            deps.note = Some(EntityResolver::new(move |id| {
                let endpoint = endpoint.clone();
                async move { endpoint.get(&id).await }
            }));
        }
        deps
    }
}

fn to_string_id_list(value: Option<&Value>) -> String {
    let Some(Value::Array(entries)) = value else {
        return String::new();
    };
    entries
        .iter()
        .filter_map(record::to_id)
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_name_list(value: Option<&Value>) -> String {
    let Some(Value::Array(entries)) = value else {
        return String::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(record) => record::get_str(record, "name")
                .map(str::to_string)
                .or_else(|| record.get("id").and_then(record::to_id)),
            other => record::to_id(other),
        })
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_number_or_null(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Number(n)) => Value::Number(n.clone()),
        Some(Value::String(s)) if !s.trim().is_empty() => s
            .trim()
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn to_id_or_null(value: Option<&Value>) -> Value {
    value
        .and_then(record::to_id)
        .map(Value::String)
        .unwrap_or(Value::Null)
}

fn to_string_or_null(value: Option<&Value>) -> Value {
    match value {
        Some(Value::String(s)) => Value::String(s.clone()),
        _ => Value::Null,
    }
}

/// Flatten notes into table-friendly rows: scalar columns, joined ID lists,
/// joined display names, and truncated excerpts.
fn tabularize_notes(notes: &[RawRecord]) -> Vec<RawRecord> {
    notes
        .iter()
        .map(|note| {
            let interaction = record::get_record(note, "interaction");
            let parent_note = record::get_record(note, "parent_note");

            let interaction_type = {
                let from_interaction =
                    to_number_or_null(interaction.and_then(|i| i.get("type")));
                if from_interaction != Value::Null {
                    from_interaction
                } else {
                    record::get_scalar(note, "interaction_type")
                        .cloned()
                        .unwrap_or(Value::Null)
                }
            };

            let mut row = Map::new();
            row.insert("id".to_string(), to_id_or_null(note.get("id")));
            row.insert("type".to_string(), to_number_or_null(note.get("type")));
            row.insert(
                "is_meeting".to_string(),
                match note.get("is_meeting") {
                    Some(Value::Bool(b)) => Value::Bool(*b),
                    _ => Value::Null,
                },
            );
            row.insert(
                "interaction_id".to_string(),
                to_id_or_null(note.get("interaction_id")),
            );
            row.insert("interaction_type".to_string(), interaction_type);
            row.insert(
                "interaction_date".to_string(),
                to_string_or_null(interaction.and_then(|i| i.get("date"))),
            );
            row.insert("parent_id".to_string(), to_id_or_null(note.get("parent_id")));
            row.insert(
                "parent_note_excerpt".to_string(),
                Value::String(match parent_note {
                    Some(parent) => truncate_text(parent.get("content"), 60),
                    None => String::new(),
                }),
            );
            row.insert(
                "person_ids".to_string(),
                Value::String(to_string_id_list(note.get("person_ids"))),
            );
            row.insert(
                "person_names".to_string(),
                Value::String(to_name_list(note.get("persons"))),
            );
            row.insert(
                "associated_person_ids".to_string(),
                Value::String(to_string_id_list(note.get("associated_person_ids"))),
            );
            row.insert(
                "associated_person_names".to_string(),
                Value::String(to_name_list(note.get("associated_persons"))),
            );
            row.insert(
                "interaction_person_ids".to_string(),
                Value::String(to_string_id_list(note.get("interaction_person_ids"))),
            );
            row.insert(
                "interaction_person_names".to_string(),
                Value::String(to_name_list(note.get("interaction_persons"))),
            );
            row.insert(
                "mentioned_person_ids".to_string(),
                Value::String(to_string_id_list(note.get("mentioned_person_ids"))),
            );
            row.insert(
                "mentioned_person_names".to_string(),
                Value::String(to_name_list(note.get("mentioned_persons"))),
            );
            row.insert(
                "organization_ids".to_string(),
                Value::String(to_string_id_list(note.get("organization_ids"))),
            );
            row.insert(
                "organization_names".to_string(),
                Value::String(to_name_list(note.get("organizations"))),
            );
            row.insert(
                "opportunity_ids".to_string(),
                Value::String(to_string_id_list(note.get("opportunity_ids"))),
            );
            row.insert(
                "opportunity_names".to_string(),
                Value::String(to_name_list(note.get("opportunities"))),
            );
            row.insert(
                "content".to_string(),
                Value::String(truncate_text(note.get("content"), NOTE_PREVIEW_CHARS)),
            );
            row.insert(
                "created_at".to_string(),
                to_string_or_null(note.get("created_at")),
            );
            row.insert(
                "updated_at".to_string(),
                to_string_or_null(note.get("updated_at")),
            );
            row
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn build_notes_pagination(
    mode: &str,
    page_size: u32,
    requested_page_token: Option<&str>,
    next_page_token: Option<&str>,
    pages_fetched: u32,
    returned_count: usize,
    args: &NoteListArgs,
) -> Value {
    let mut filters = Map::new();
    if let Some(person_id) = &args.person_id {
        filters.insert("person_id".to_string(), Value::String(person_id.clone()));
    }
    if let Some(organization_id) = &args.organization_id {
        filters.insert(
            "organization_id".to_string(),
            Value::String(organization_id.clone()),
        );
    }
    if let Some(opportunity_id) = &args.opportunity_id {
        filters.insert(
            "opportunity_id".to_string(),
            Value::String(opportunity_id.clone()),
        );
    }

    json!({
        "mode": mode,
        "page_size": page_size,
        "requested_page_token": requested_page_token,
        "next_page_token": next_page_token,
        "has_more": next_page_token.is_some(),
        "pages_fetched": pages_fetched,
        "returned_count": returned_count,
        "filters": filters
    })
}

pub async fn run(
    deps: &NoteDeps,
    command: &NoteCommand,
    output: &OutputOptions,
) -> Result<(), CliError> {
    match command {
        NoteCommand::List(args) => list(deps, args, output).await,
        NoteCommand::Get(args) => {
            let mode = NoteDetailMode::from_flags(args.detailed, args.full, output.compact);
            let resolution = deps.resolution_deps(mode, output.compact);
            let note = deps.endpoint.get(&args.id).await?;
            let resolved = resolve_note_by_mode(note, mode, &resolution).await;
            emit(Value::Object(resolved), output);
            Ok(())
        }
        NoteCommand::Create(args) => {
            let payload = parse_json_arg(&args.data, "--data")?;
            let created = deps.endpoint.create(&payload).await?;
            emit(Value::Object(created), output);
            Ok(())
        }
        NoteCommand::Update(args) => {
            let payload = parse_json_arg(&args.data, "--data")?;
            let updated = deps.endpoint.update(&args.id, &payload).await?;
            emit(Value::Object(updated), output);
            Ok(())
        }
        NoteCommand::Delete(args) => {
            let deleted = deps.endpoint.delete(&args.id).await?;
            emit(deleted, output);
            Ok(())
        }
    }
}

async fn list(
    deps: &NoteDeps,
    args: &NoteListArgs,
    output: &OutputOptions,
) -> Result<(), CliError> {
    let mode = NoteDetailMode::from_flags(args.detailed, args.full, output.compact);
    let resolution = deps.resolution_deps(mode, output.compact);
    let base_params = NoteListParams {
        person_id: args.person_id.clone(),
        organization_id: args.organization_id.clone(),
        opportunity_id: args.opportunity_id.clone(),
        page_size: Some(args.page_size),
        page_token: None,
    };

    if args.all {
        let mut page_token = args.page_token.clone();
        let mut pages_fetched = 0u32;
        let mut records = Vec::new();

        loop {
            let page = deps
                .endpoint
                .list(&NoteListParams {
                    page_token: page_token.clone(),
                    ..base_params.clone()
                })
                .await?;
            pages_fetched += 1;
            records.extend(page.items);
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        let resolved = resolve_notes_by_mode(records, mode, &resolution).await;
        let with_preview = with_truncated_note_content(resolved, NOTE_PREVIEW_CHARS);
        if output.format == OutputFormat::Json {
            let pagination = build_notes_pagination(
                "all",
                args.page_size,
                args.page_token.as_deref(),
                None,
                pages_fetched,
                with_preview.len(),
                args,
            );
            emit(
                json!({
                    "pagination": pagination,
                    "data": with_preview
                }),
                output,
            );
            return Ok(());
        }

        emit(
            Value::Array(
                tabularize_notes(&with_preview)
                    .into_iter()
                    .map(Value::Object)
                    .collect(),
            ),
            output,
        );
        return Ok(());
    }

    let page = deps
        .endpoint
        .list(&NoteListParams {
            page_token: args.page_token.clone(),
            ..base_params
        })
        .await?;
    let resolved = resolve_notes_by_mode(page.items, mode, &resolution).await;
    let with_preview = with_truncated_note_content(resolved, NOTE_PREVIEW_CHARS);

    if output.format == OutputFormat::Json {
        let pagination = build_notes_pagination(
            "page",
            args.page_size,
            args.page_token.as_deref(),
            page.next_page_token.as_deref(),
            1,
            with_preview.len(),
            args,
        );
        emit(
            json!({
                "pagination": pagination,
                "data": with_preview
            }),
            output,
        );
        return Ok(());
    }

    emit(
        Value::Array(
            tabularize_notes(&with_preview)
                .into_iter()
                .map(Value::Object)
                .collect(),
        ),
        output,
    );
    Ok(())
}
