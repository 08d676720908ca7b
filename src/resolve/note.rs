//! Note detail modes.
//!
//! Notes reference persons, organizations, opportunities, interactions, and
//! parent notes by ID. The detail mode decides how much of that graph gets
//! resolved inline:
//!
//! - `raw`: the record passes through untouched.
//! - `detailed`: person, organization, and opportunity ID lists resolve into
//!   summary lists.
//! - `full`: `detailed` plus the attached interaction and the parent note.
//!
//! Resolved data is additive: the source ID fields are always kept. Each
//! entity kind uses one memoized resolver per call, so an ID shared between
//! `person_ids` and `mentioned_person_ids` (or between notes) is fetched once.

use serde_json::{Map, Value};

use crate::record::{self, RawRecord};
use crate::resolve::reference::{
    resolve_records_foreign_key_field, resolve_records_id_field, summarize_opportunity_reference,
    summarize_organization_reference, summarize_person_reference, EntityResolver, ForeignKeySpec,
    IdFieldSpec,
};

/// How much cross-reference resolution a note undergoes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteDetailMode {
    #[default]
    Raw,
    Detailed,
    Full,
}

impl NoteDetailMode {
    /// Mode from the `--detailed` / `--full` flags. Compact output never
    /// resolves references.
    pub fn from_flags(detailed: bool, full: bool, compact: bool) -> Self {
        if compact {
            return Self::Raw;
        }
        if full {
            return Self::Full;
        }
        if detailed {
            return Self::Detailed;
        }
        Self::Raw
    }
}

/// Resolvers a note resolution pass may use. Absent resolvers skip their
/// passes. The note resolver is the notes endpoint's own get-by-id, used for
/// parent notes; parents are resolved one level deep, never recursively.
#[derive(Default, Clone)]
pub struct NoteResolutionDeps {
    pub person: Option<EntityResolver>,
    pub organization: Option<EntityResolver>,
    pub opportunity: Option<EntityResolver>,
    pub interaction: Option<EntityResolver>,
    pub note: Option<EntityResolver>,
}

/// Interaction summary: the payload spread with id/type/date/created_at
/// normalized.
pub fn summarize_interaction_reference(payload: &RawRecord, fallback_id: &str) -> RawRecord {
    let id = record::id_or(payload, fallback_id);

    let mut out = payload.clone();
    out.insert("id".to_string(), Value::String(id));
    if let Some(kind) = record::get_scalar(payload, "type") {
        out.insert("type".to_string(), kind.clone());
    }
    if let Some(date) = record::get_str(payload, "date") {
        out.insert("date".to_string(), Value::String(date.to_string()));
    }
    if let Some(created_at) = record::get_str(payload, "created_at") {
        out.insert("created_at".to_string(), Value::String(created_at.to_string()));
    }
    out
}

/// Parent-note summary: a closed field set, no payload pass-through.
pub fn summarize_parent_note_reference(payload: &RawRecord, fallback_id: &str) -> RawRecord {
    let id = record::id_or(payload, fallback_id);

    let mut out = Map::new();
    out.insert("id".to_string(), Value::String(id));
    if let Some(content) = record::get_str(payload, "content") {
        out.insert("content".to_string(), Value::String(content.to_string()));
    }
    if let Some(kind) = record::get_scalar(payload, "type") {
        out.insert("type".to_string(), kind.clone());
    }
    if let Some(created_at) = record::get_str(payload, "created_at") {
        out.insert("created_at".to_string(), Value::String(created_at.to_string()));
    }
    if let Some(updated_at) = record::get_str(payload, "updated_at") {
        out.insert("updated_at".to_string(), Value::String(updated_at.to_string()));
    }
    out
}

/// Resolve person, organization, and opportunity references on a batch of
/// notes. The four person-derived fields share one memoized person resolver,
/// so repeated IDs across fields cost a single fetch.
pub async fn resolve_notes_detailed(
    notes: Vec<RawRecord>,
    deps: &NoteResolutionDeps,
) -> Vec<RawRecord> {
    let mut resolved = notes;

    if let Some(person) = deps.person.as_ref().map(EntityResolver::memoized) {
        const PERSON_FIELDS: [(&str, &str); 4] = [
            ("person_ids", "persons"),
            ("associated_person_ids", "associated_persons"),
            ("interaction_person_ids", "interaction_persons"),
            ("mentioned_person_ids", "mentioned_persons"),
        ];
        for (ids_field, target_field) in PERSON_FIELDS {
            let spec = IdFieldSpec::new(ids_field, target_field, summarize_person_reference)
                .keep_source_field();
            resolved = resolve_records_id_field(resolved, &person, &spec).await;
        }
    }

    if let Some(organization) = deps.organization.as_ref().map(EntityResolver::memoized) {
        let spec = IdFieldSpec::new(
            "organization_ids",
            "organizations",
            summarize_organization_reference,
        )
        .keep_source_field();
        resolved = resolve_records_id_field(resolved, &organization, &spec).await;
    }

    if let Some(opportunity) = deps.opportunity.as_ref().map(EntityResolver::memoized) {
        let spec = IdFieldSpec::new(
            "opportunity_ids",
            "opportunities",
            summarize_opportunity_reference,
        )
        .keep_source_field();
        resolved = resolve_records_id_field(resolved, &opportunity, &spec).await;
    }

    resolved
}

/// Everything `detailed` does, plus the attached interaction and parent note.
pub async fn resolve_notes_full(notes: Vec<RawRecord>, deps: &NoteResolutionDeps) -> Vec<RawRecord> {
    let mut resolved = resolve_notes_detailed(notes, deps).await;

    if let Some(interaction) = deps.interaction.as_ref().map(EntityResolver::memoized) {
        let spec = ForeignKeySpec::new("interaction_id", "interaction", summarize_interaction_reference)
            .keep_source_field();
        resolved = resolve_records_foreign_key_field(resolved, &interaction, &spec).await;
    }

    if let Some(note) = deps.note.as_ref().map(EntityResolver::memoized) {
        let spec = ForeignKeySpec::new("parent_id", "parent_note", summarize_parent_note_reference)
            .keep_source_field();
        resolved = resolve_records_foreign_key_field(resolved, &note, &spec).await;
    }

    resolved
}

/// Dispatch on the detail mode. `raw` is the identity.
pub async fn resolve_notes_by_mode(
    notes: Vec<RawRecord>,
    mode: NoteDetailMode,
    deps: &NoteResolutionDeps,
) -> Vec<RawRecord> {
    match mode {
        NoteDetailMode::Raw => notes,
        NoteDetailMode::Detailed => resolve_notes_detailed(notes, deps).await,
        NoteDetailMode::Full => resolve_notes_full(notes, deps).await,
    }
}

/// Single-note variant of [`resolve_notes_by_mode`].
pub async fn resolve_note_by_mode(
    note: RawRecord,
    mode: NoteDetailMode,
    deps: &NoteResolutionDeps,
) -> RawRecord {
    let mut resolved = resolve_notes_by_mode(vec![note], mode, deps).await;
    resolved.pop().unwrap_or_default()
}
