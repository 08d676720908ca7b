//! Page collection and record extraction.
//!
//! List routes answer either a bare JSON array or an envelope holding the
//! records under a collection key plus a `next_page_token` cursor. Which key
//! varies by route, so extraction probes the known names before falling back
//! to the first array-valued member.

use std::future::Future;

use serde_json::Value;

use crate::api::ApiError;
use crate::record::RawRecord;

/// One page of records plus the cursor for the next one.
#[derive(Debug, Clone, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

const COLLECTION_KEYS: [&str; 11] = [
    "records",
    "results",
    "data",
    "persons",
    "organizations",
    "opportunities",
    "list_entries",
    "field_values",
    "fields",
    "lists",
    "notes",
];

/// Extract the record array from a list payload.
pub fn pick_records(payload: &Value) -> Vec<Value> {
    if let Value::Array(items) = payload {
        return items.clone();
    }
    let Value::Object(envelope) = payload else {
        return Vec::new();
    };

    for key in COLLECTION_KEYS {
        if let Some(Value::Array(items)) = envelope.get(key) {
            return items.clone();
        }
    }
    envelope
        .values()
        .find_map(|value| value.as_array().cloned())
        .unwrap_or_default()
}

/// Record-shaped items of a list payload; loose non-object entries drop out.
pub fn pick_record_items(payload: &Value) -> Vec<RawRecord> {
    pick_records(payload)
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect()
}

/// The next-page cursor, when the payload carries one.
pub fn next_page_token(payload: &Value) -> Option<String> {
    payload
        .as_object()
        .and_then(|envelope| envelope.get("next_page_token"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Build a [`Page`] from a list payload.
pub fn page_from_payload(payload: &Value) -> Page<RawRecord> {
    Page {
        items: pick_record_items(payload),
        next_page_token: next_page_token(payload),
    }
}

/// Follow `next_page_token` cursors until exhausted, accumulating items.
pub async fn collect_all_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ApiError>>,
{
    let mut all = Vec::new();
    let mut token = None;

    loop {
        let page = fetch_page(token).await?;
        all.extend(page.items);
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    Ok(all)
}
