//! Open-record helpers over `serde_json` values.
//!
//! The Affinity API returns loosely-shaped JSON objects: every record has an
//! `id` (string or number), everything else is optional and probed by
//! presence. Accessors here return `Option` instead of erroring so callers
//! can treat malformed fields as absent.

use serde_json::{Map, Value};

/// An open entity record: field name to arbitrary JSON value.
pub type RawRecord = Map<String, Value>;

/// Coerce a value into a canonical string ID.
///
/// Non-empty strings pass through; numbers are rendered in decimal. Anything
/// else (null, bool, object, array, empty string) is not an ID.
pub fn to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The record's own `id`, normalized, or the caller-supplied fallback.
pub fn id_or(record: &RawRecord, fallback: &str) -> String {
    record
        .get("id")
        .and_then(to_id)
        .unwrap_or_else(|| fallback.to_string())
}

/// String field accessor.
pub fn get_str<'a>(record: &'a RawRecord, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Array field accessor.
pub fn get_array<'a>(record: &'a RawRecord, key: &str) -> Option<&'a Vec<Value>> {
    record.get(key).and_then(Value::as_array)
}

/// Nested record accessor.
pub fn get_record<'a>(record: &'a RawRecord, key: &str) -> Option<&'a RawRecord> {
    record.get(key).and_then(Value::as_object)
}

/// All string elements of an array field, in order.
pub fn get_string_items(record: &RawRecord, key: &str) -> Vec<String> {
    get_array(record, key)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Scalar string-or-number field, kept as its original JSON value.
pub fn get_scalar<'a>(record: &'a RawRecord, key: &str) -> Option<&'a Value> {
    match record.get(key) {
        Some(value @ (Value::String(_) | Value::Number(_))) => Some(value),
        _ => None,
    }
}
