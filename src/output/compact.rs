//! Compact output pass.
//!
//! Trims noise from records before rendering: audit keys disappear,
//! `{id, name}`-shaped reference objects collapse to their label, location
//! objects flatten to one line, and an `interactions` block drops out when
//! `interaction_dates` already carries the same dates and no entry has
//! person data.

use serde_json::{Map, Value};

const HIDDEN_KEYS: [&str; 4] = ["created_at", "updated_at", "creator_id", "modifier_id"];

fn is_hidden_key(key: &str) -> bool {
    HIDDEN_KEYS.contains(&key) || key.starts_with("test_")
}

/// True for objects whose only keys are `id` and the given label key.
fn is_scalar_ref_object(obj: &Map<String, Value>, label_key: &str) -> bool {
    obj.keys().all(|key| key == "id" || key == label_key)
}

fn format_location(obj: &Map<String, Value>) -> String {
    ["city", "state", "country"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn has_useful_person_data(interaction: &Map<String, Value>) -> bool {
    let ids = interaction.get("person_ids").and_then(Value::as_array);
    let persons = interaction.get("persons").and_then(Value::as_array);
    ids.is_some_and(|items| !items.is_empty()) || persons.is_some_and(|items| !items.is_empty())
}

/// True when every interaction entry repeats a date already present in
/// `interaction_dates` and carries nothing else worth keeping.
fn is_redundant_interactions(
    interaction_dates: &Map<String, Value>,
    interactions: &Map<String, Value>,
) -> bool {
    if interactions.is_empty() {
        return false;
    }

    for (interaction_type, value) in interactions {
        let Value::Object(entry) = value else {
            return false;
        };
        let Some(date) = entry.get("date").and_then(Value::as_str) else {
            return false;
        };
        if has_useful_person_data(entry) {
            return false;
        }

        let expected = interaction_dates.get(&format!("{interaction_type}_date"));
        if expected.and_then(Value::as_str) != Some(date) {
            return false;
        }
    }
    true
}

fn flatten_value(value: Value) -> Value {
    match value {
        Value::Array(entries) => Value::Array(entries.into_iter().map(flatten_value).collect()),
        Value::Object(obj) => {
            if let Some(title) = obj.get("title").and_then(Value::as_str) {
                if is_scalar_ref_object(&obj, "title") {
                    return Value::String(title.to_string());
                }
            }
            if let Some(name) = obj.get("name").and_then(Value::as_str) {
                if is_scalar_ref_object(&obj, "name") {
                    return Value::String(name.to_string());
                }
            }
            if obj.contains_key("city") || obj.contains_key("state") || obj.contains_key("country") {
                return Value::String(format_location(&obj));
            }

            let drop_interactions = match (obj.get("interaction_dates"), obj.get("interactions")) {
                (Some(Value::Object(dates)), Some(Value::Object(interactions))) => {
                    is_redundant_interactions(dates, interactions)
                }
                _ => false,
            };

            let mut out = Map::new();
            for (key, nested) in obj {
                if drop_interactions && key == "interactions" {
                    continue;
                }
                if is_hidden_key(&key) {
                    continue;
                }
                out.insert(key, flatten_value(nested));
            }
            Value::Object(out)
        }
        other => other,
    }
}

pub fn compact_data(value: Value) -> Value {
    flatten_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hidden_keys_are_dropped() {
        let compacted = compact_data(json!({
            "id": 1,
            "created_at": "2026-01-01",
            "updated_at": "2026-01-02",
            "creator_id": 9,
            "test_flag": true,
            "name": "Keep"
        }));
        assert_eq!(compacted, json!({ "id": 1, "name": "Keep" }));
    }

    #[test]
    fn test_reference_objects_collapse_to_labels() {
        let compacted = compact_data(json!({
            "owner": { "id": 1, "name": "Alex Doe" },
            "deal": { "id": 2, "title": "Renewal" },
            "keep": { "id": 3, "name": "Has more", "stage": "won" }
        }));
        assert_eq!(
            compacted,
            json!({
                "owner": "Alex Doe",
                "deal": "Renewal",
                "keep": { "id": 3, "name": "Has more", "stage": "won" }
            })
        );
    }

    #[test]
    fn test_locations_flatten() {
        let compacted = compact_data(json!({
            "hq": { "city": "Oslo", "state": null, "country": "Norway" }
        }));
        assert_eq!(compacted, json!({ "hq": "Oslo, Norway" }));
    }

    #[test]
    fn test_redundant_interactions_are_dropped() {
        let compacted = compact_data(json!({
            "id": 1,
            "interaction_dates": { "last_email_date": "2026-01-05" },
            "interactions": { "last_email": { "date": "2026-01-05" } }
        }));
        assert_eq!(
            compacted,
            json!({ "id": 1, "interaction_dates": { "last_email_date": "2026-01-05" } })
        );
    }

    #[test]
    fn test_interactions_with_persons_survive() {
        let record = json!({
            "interaction_dates": { "last_email_date": "2026-01-05" },
            "interactions": {
                "last_email": { "date": "2026-01-05", "persons": [{ "id": "1" }] }
            }
        });
        let compacted = compact_data(record.clone());
        assert_eq!(compacted, record);
    }

    #[test]
    fn test_interactions_with_differing_dates_survive() {
        let record = json!({
            "interaction_dates": { "last_email_date": "2026-01-04" },
            "interactions": { "last_email": { "date": "2026-01-05" } }
        });
        let compacted = compact_data(record.clone());
        assert_eq!(compacted, record);
    }
}
