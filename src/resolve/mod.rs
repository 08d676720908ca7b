//! Reference resolution and enrichment.
//!
//! The enrichment engine: raw API records carry foreign-key IDs; the modules
//! here turn those IDs into inline summary objects while preserving record
//! shape, ID order, and graceful degradation on partial failure.

pub mod compiled;
pub mod interaction;
pub mod note;
pub mod reference;

pub use compiled::compile_entity;
pub use interaction::{resolve_interaction_persons, resolve_person_ids};
pub use note::{
    resolve_note_by_mode, resolve_notes_by_mode, NoteDetailMode, NoteResolutionDeps,
};
pub use reference::{
    normalize_ids, resolve_batch, resolve_id_list, resolve_nested_array_foreign_key_field,
    resolve_record_id_field, resolve_records_foreign_key_field, resolve_records_id_field,
    EntityResolver, ForeignKeySpec, IdFieldSpec, Summarizer,
};
