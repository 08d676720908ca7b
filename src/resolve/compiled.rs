//! Entity compilation: merging field values into an entity record.
//!
//! Field values arrive as a flat list keyed by numeric field ID. Compilation
//! renames them to the field's display name, normalizes reference-object
//! values to plain labels, resolves person-typed fields (value type 0) to
//! display names, and collects repeated keys into arrays.

use std::collections::HashMap;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::record::{self, RawRecord};
use crate::resolve::reference::EntityResolver;

fn format_location(value: &Map<String, Value>) -> String {
    ["city", "state", "country"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collapse reference objects to their display label: `text`, `title`, or
/// `name` when present; location objects to a "city, state, country" string.
fn normalize_field_value(value: Value) -> Value {
    match value {
        Value::Array(entries) => {
            Value::Array(entries.into_iter().map(normalize_field_value).collect())
        }
        Value::Object(obj) => {
            if let Some(text) = obj.get("text").and_then(Value::as_str) {
                return Value::String(text.to_string());
            }
            if let Some(title) = obj.get("title").and_then(Value::as_str) {
                return Value::String(title.to_string());
            }
            if let Some(name) = obj.get("name").and_then(Value::as_str) {
                return Value::String(name.to_string());
            }
            if obj.contains_key("city") || obj.contains_key("state") || obj.contains_key("country") {
                return Value::String(format_location(&obj));
            }
            Value::Object(obj)
        }
        other => other,
    }
}

/// A repeated field name collects its values into an array.
fn append_compiled_value(target: &mut RawRecord, key: &str, value: Value) {
    match target.get_mut(key) {
        None => {
            target.insert(key.to_string(), value);
        }
        Some(Value::Array(existing)) => {
            existing.push(value);
        }
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

fn person_display_name(payload: &RawRecord, fallback_id: &str) -> String {
    let first_name = record::get_str(payload, "first_name");
    let last_name = record::get_str(payload, "last_name");
    let full_name = [first_name, last_name]
        .iter()
        .flatten()
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    record::get_str(payload, "name")
        .map(str::to_string)
        .or_else(|| (!full_name.is_empty()).then(|| full_name.clone()))
        .or_else(|| record::get_str(payload, "primary_email").map(str::to_string))
        .unwrap_or_else(|| fallback_id.to_string())
}

/// Replace person IDs with display names, caching one lookup per distinct ID
/// for the duration of a compile. A failed lookup keeps the raw ID.
fn resolve_person_value<'a>(
    value: Value,
    resolver: Option<&'a EntityResolver>,
    cache: &'a Mutex<HashMap<String, String>>,
) -> BoxFuture<'a, Value> {
    async move {
        match value {
            Value::Array(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for entry in entries {
                    out.push(resolve_person_value(entry, resolver, cache).await);
                }
                Value::Array(out)
            }
            Value::String(_) | Value::Number(_) => {
                let Some(resolver) = resolver else {
                    return value;
                };
                let id = match &value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return value,
                };
                if let Some(name) = cache.lock().get(&id).cloned() {
                    return Value::String(name);
                }
                let name = match resolver.fetch(&id).await {
                    Ok(person) => person_display_name(&person, &id),
                    Err(_) => id.clone(),
                };
                cache.lock().insert(id, name.clone());
                Value::String(name)
            }
            other => other,
        }
    }
    .boxed()
}

fn field_names_by_id(fields: &[RawRecord]) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for field in fields {
        let Some(id) = field.get("id").and_then(record::to_id) else {
            continue;
        };
        let Some(name) = record::get_str(field, "name") else {
            continue;
        };
        out.insert(id, name.to_string());
    }
    out
}

fn field_value_types_by_id(fields: &[RawRecord]) -> HashMap<String, Value> {
    let mut out = HashMap::new();
    for field in fields {
        let Some(id) = field.get("id").and_then(record::to_id) else {
            continue;
        };
        if let Some(value_type) = record::get_scalar(field, "value_type") {
            out.insert(id, value_type.clone());
        }
    }
    out
}

fn is_person_value_type(value_type: Option<&Value>) -> bool {
    matches!(
        value_type,
        Some(Value::Number(n)) if n.as_i64() == Some(0)
    ) || matches!(value_type, Some(Value::String(s)) if s == "0")
}

/// Merge field values into the entity under a `fields` key, named by field
/// definition, normalized, and with person-typed values resolved to names.
pub async fn compile_entity(
    entity: RawRecord,
    field_values: Vec<RawRecord>,
    fields: Vec<RawRecord>,
    person_resolver: Option<&EntityResolver>,
) -> RawRecord {
    let names = field_names_by_id(&fields);
    let value_types = field_value_types_by_id(&fields);
    let person_cache = Mutex::new(HashMap::new());
    let mut compiled = RawRecord::new();

    for field_value in field_values {
        let value = match field_value.get("value") {
            None | Some(Value::Null) => continue,
            Some(value) => value.clone(),
        };

        let field_id = field_value.get("field_id").and_then(record::to_id);
        let key = field_id
            .as_ref()
            .and_then(|id| names.get(id).cloned())
            .or_else(|| field_id.as_ref().map(|id| format!("field_{id}")))
            .unwrap_or_else(|| {
                format!("field_value_{}", record::id_or(&field_value, "unknown"))
            });

        let normalized = normalize_field_value(value);
        let value_type = field_id.as_ref().and_then(|id| value_types.get(id));
        let value = if is_person_value_type(value_type) {
            resolve_person_value(normalized, person_resolver, &person_cache).await
        } else {
            normalized
        };
        append_compiled_value(&mut compiled, &key, value);
    }

    let mut out = entity;
    out.insert("fields".to_string(), Value::Object(compiled));
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    fn to_record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    fn to_records(value: Value) -> Vec<RawRecord> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_normalize_field_value_collapses_reference_objects() {
        assert_eq!(normalize_field_value(json!({ "text": "hello" })), json!("hello"));
        assert_eq!(normalize_field_value(json!({ "title": "CEO" })), json!("CEO"));
        assert_eq!(normalize_field_value(json!({ "name": "Acme" })), json!("Acme"));
        assert_eq!(
            normalize_field_value(json!({ "city": "Oslo", "country": "Norway" })),
            json!("Oslo, Norway")
        );
        assert_eq!(
            normalize_field_value(json!([{ "text": "a" }, 5])),
            json!(["a", 5])
        );
        assert_eq!(normalize_field_value(json!({ "other": 1 })), json!({ "other": 1 }));
    }

    #[test]
    fn test_append_compiled_value_collects_repeats() {
        let mut target = RawRecord::new();
        append_compiled_value(&mut target, "Status", json!("Active"));
        append_compiled_value(&mut target, "Status", json!("Churned"));
        append_compiled_value(&mut target, "Status", json!("Revived"));
        assert_eq!(
            target.get("Status"),
            Some(&json!(["Active", "Churned", "Revived"]))
        );
    }

    #[tokio::test]
    async fn test_compile_entity_names_and_normalizes() {
        let entity = to_record(json!({ "id": "1", "name": "Acme" }));
        let field_values = to_records(json!([
            { "id": 900, "field_id": 10, "value": { "text": "Series A" } },
            { "id": 901, "field_id": 99, "value": 7 },
            { "id": 902, "value": "orphan" },
            { "id": 903, "field_id": 10, "value": null }
        ]));
        let fields = to_records(json!([
            { "id": 10, "name": "Stage", "value_type": 2 }
        ]));

        let compiled = compile_entity(entity, field_values, fields, None).await;
        assert_eq!(
            compiled.get("fields"),
            Some(&json!({
                "Stage": "Series A",
                "field_99": 7,
                "field_value_902": "orphan"
            }))
        );
        assert_eq!(compiled.get("name"), Some(&json!("Acme")));
    }

    #[tokio::test]
    async fn test_compile_entity_resolves_person_fields_with_cache() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_inner = calls.clone();
        let resolver = EntityResolver::new(move |id| {
            let calls = calls_inner.clone();
            async move {
                calls.lock().push(id.clone());
                Ok(to_record(json!({
                    "id": id,
                    "first_name": "Person",
                    "last_name": id
                })))
            }
        });

        let entity = to_record(json!({ "id": "1" }));
        let field_values = to_records(json!([
            { "id": 900, "field_id": 20, "value": [7, 8, 7] },
            { "id": 901, "field_id": 20, "value": 7 }
        ]));
        let fields = to_records(json!([
            { "id": 20, "name": "Owners", "value_type": 0 }
        ]));

        let compiled = compile_entity(entity, field_values, fields, Some(&resolver)).await;
        assert_eq!(
            compiled.get("fields"),
            Some(&json!({
                "Owners": [["Person 7", "Person 8", "Person 7"], "Person 7"]
            }))
        );
        assert_eq!(calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_compile_entity_person_failure_keeps_raw_id() {
        let resolver = EntityResolver::new(|_id: String| async move {
            Err(crate::api::ApiError::Api {
                status: 404,
                payload: None,
                request_id: None,
            })
        });

        let entity = to_record(json!({ "id": "1" }));
        let field_values = to_records(json!([
            { "id": 900, "field_id": 20, "value": 55 }
        ]));
        let fields = to_records(json!([
            { "id": 20, "name": "Owner", "value_type": "0" }
        ]));

        let compiled = compile_entity(entity, field_values, fields, Some(&resolver)).await;
        assert_eq!(compiled.get("fields"), Some(&json!({ "Owner": "55" })));
    }
}
