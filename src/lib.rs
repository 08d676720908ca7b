//! Command-line client for the Affinity CRM v1 API.
//!
//! The interesting part lives in [`resolve`]: raw API records reference
//! other entities by ID, and the resolution engine turns those IDs into
//! inline summaries with per-call deduplication, bounded fetch concurrency,
//! and id-only stubs when a referenced entity cannot be fetched. Everything
//! else is plumbing around it: the HTTP client, endpoint wrappers, output
//! formatting, and the clap command tree.

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod note_content;
pub mod output;
pub mod pagination;
pub mod record;
pub mod resolve;
