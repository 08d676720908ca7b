//! Person resolution inside `interactions` blocks.
//!
//! Search and get responses can carry an `interactions` map keyed by
//! interaction type (`first_email`, `last_event`, ...), each entry holding a
//! `person_ids` array. All person IDs across all records and interaction
//! types are collected into one set, resolved once, and each entry's
//! `person_ids` is rewritten to a `persons` summary list.

use serde_json::{Map, Value};

use crate::record::RawRecord;
use crate::resolve::reference::{
    normalize_ids, resolve_batch, resolve_id_list, stub_reference, EntityResolver, Summarizer,
};

fn collect_interaction_person_ids(records: &[RawRecord]) -> Vec<String> {
    let mut ids = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for record in records {
        let Some(Value::Object(interactions)) = record.get("interactions") else {
            continue;
        };
        for interaction in interactions.values() {
            let Value::Object(entry) = interaction else {
                continue;
            };
            let Some(person_ids) = entry.get("person_ids") else {
                continue;
            };
            for id in normalize_ids(person_ids) {
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
        }
    }
    ids
}

/// Resolve a flat person-ID array into an ordered list of summaries. Used for
/// relationship-strength enrichment and other top-level person ID lists.
pub async fn resolve_person_ids(
    ids_value: &Value,
    resolver: &EntityResolver,
    summarize: Summarizer,
) -> Vec<RawRecord> {
    resolve_id_list(ids_value, resolver, summarize).await
}

/// Rewrite every `interactions.<type>.person_ids` into a resolved
/// `interactions.<type>.persons` list.
///
/// Person IDs are deduplicated globally across all records and fetched once;
/// each rewritten entry keeps its own ID order. Entries without an array
/// `person_ids`, non-record interaction values, and records without a
/// record-shaped `interactions` field pass through unchanged.
pub async fn resolve_interaction_persons(
    records: Vec<RawRecord>,
    resolver: &EntityResolver,
    summarize: Summarizer,
) -> Vec<RawRecord> {
    let ids = collect_interaction_person_ids(&records);
    let resolved = if ids.is_empty() {
        Default::default()
    } else {
        resolve_batch(&ids, resolver, summarize).await
    };

    records
        .into_iter()
        .map(|record| {
            let interactions = match record.get("interactions") {
                Some(Value::Object(interactions)) => interactions.clone(),
                _ => return record,
            };

            let mut next = Map::new();
            let mut changed = false;

            for (interaction_type, interaction_value) in interactions {
                let Value::Object(entry) = interaction_value else {
                    next.insert(interaction_type, interaction_value);
                    continue;
                };
                let is_ids_array = entry.get("person_ids").is_some_and(Value::is_array);
                if !is_ids_array {
                    next.insert(interaction_type, Value::Object(entry));
                    continue;
                }

                let person_ids = entry
                    .get("person_ids")
                    .map(normalize_ids)
                    .unwrap_or_default();
                let persons = person_ids
                    .iter()
                    .map(|id| {
                        Value::Object(resolved.get(id).cloned().unwrap_or_else(|| stub_reference(id)))
                    })
                    .collect();

                let mut rewritten = entry;
                rewritten.shift_remove("person_ids");
                rewritten.insert("persons".to_string(), Value::Array(persons));
                next.insert(interaction_type, Value::Object(rewritten));
                changed = true;
            }

            if !changed {
                return record;
            }
            let mut out = record;
            out.insert("interactions".to_string(), Value::Object(next));
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::api::ApiError;
    use crate::resolve::reference::summarize_interaction_person_reference;

    fn to_record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    fn person_resolver(calls: Arc<Mutex<Vec<String>>>) -> EntityResolver {
        EntityResolver::new(move |id| {
            let calls = calls.clone();
            async move {
                calls.lock().push(id.clone());
                Ok(to_record(json!({
                    "id": id,
                    "first_name": "Person",
                    "last_name": id,
                    "primary_email": format!("person.{id}@example.com")
                })))
            }
        })
    }

    fn failing_resolver() -> EntityResolver {
        EntityResolver::new(|_id| async move {
            Err(ApiError::Api {
                status: 403,
                payload: None,
                request_id: None,
            })
        })
    }

    #[tokio::test]
    async fn test_rewrites_person_ids_into_persons() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = person_resolver(calls.clone());

        let records = vec![to_record(json!({
            "id": "1",
            "interactions": {
                "last_email": { "date": "2026-01-05", "person_ids": [10, 11] },
                "next_event": { "date": "2026-02-01", "person_ids": [11] }
            }
        }))];
        let resolved =
            resolve_interaction_persons(records, &resolver, summarize_interaction_person_reference)
                .await;

        assert_eq!(calls.lock().len(), 2);
        assert_eq!(
            resolved[0].get("interactions"),
            Some(&json!({
                "last_email": {
                    "date": "2026-01-05",
                    "persons": [
                        { "id": "10", "name": "Person 10", "primary_email": "person.10@example.com" },
                        { "id": "11", "name": "Person 11", "primary_email": "person.11@example.com" }
                    ]
                },
                "next_event": {
                    "date": "2026-02-01",
                    "persons": [
                        { "id": "11", "name": "Person 11", "primary_email": "person.11@example.com" }
                    ]
                }
            }))
        );
    }

    #[tokio::test]
    async fn test_failure_degrades_to_stub_references() {
        let resolver = failing_resolver();
        let records = vec![to_record(json!({
            "interactions": { "last_email": { "date": "D", "person_ids": [1] } }
        }))];

        let resolved =
            resolve_interaction_persons(records, &resolver, summarize_interaction_person_reference)
                .await;
        assert_eq!(
            Value::Object(resolved[0].clone()),
            json!({
                "interactions": { "last_email": { "date": "D", "persons": [{ "id": "1" }] } }
            })
        );
    }

    #[tokio::test]
    async fn test_untouched_shapes_pass_through() {
        let resolver = failing_resolver();
        let records = vec![
            to_record(json!({ "id": "no-interactions" })),
            to_record(json!({ "id": "wrong-type", "interactions": "n/a" })),
            to_record(json!({
                "id": "no-ids",
                "interactions": { "last_email": { "date": "D" }, "banner": "stale" }
            })),
        ];

        let resolved =
            resolve_interaction_persons(records.clone(), &resolver, summarize_interaction_person_reference)
                .await;
        assert_eq!(resolved, records);
    }

    #[tokio::test]
    async fn test_global_dedup_single_fetch_per_person() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = person_resolver(calls.clone());

        let records = vec![
            to_record(json!({
                "interactions": { "last_email": { "person_ids": [1, 2] } }
            })),
            to_record(json!({
                "interactions": { "first_event": { "person_ids": [2, 1] } }
            })),
        ];
        resolve_interaction_persons(records, &resolver, summarize_interaction_person_reference).await;

        let mut seen = calls.lock().clone();
        seen.sort();
        assert_eq!(seen, ["1", "2"]);
    }

    #[tokio::test]
    async fn test_resolve_person_ids_orders_by_input() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = person_resolver(calls);

        let persons = resolve_person_ids(
            &json!([3, 1, 3, 2]),
            &resolver,
            summarize_interaction_person_reference,
        )
        .await;
        let ids: Vec<&str> = persons
            .iter()
            .map(|person| person.get("id").and_then(Value::as_str).unwrap())
            .collect();
        assert_eq!(ids, ["3", "1", "2"]);
    }
}
