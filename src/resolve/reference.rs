//! Foreign-key reference resolution.
//!
//! API records carry arrays of entity IDs (`person_ids`, `organization_ids`,
//! `opportunity_ids`, ...). The operators here replace or augment those ID
//! fields with resolved summary objects: IDs are normalized and deduplicated,
//! fetched in bounded concurrent batches through an injected [`EntityResolver`],
//! and summarized by a per-kind pure function. A fetch failure for one ID
//! degrades that reference to an `{ "id": .. }` stub instead of failing the
//! whole command.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::api::ApiError;
use crate::record::{self, RawRecord};

/// Default number of concurrently in-flight fetches per batch chunk.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Result of one entity fetch. The error is reference-counted so a memoized
/// in-flight future can hand the same failure to every waiter.
pub type FetchResult = Result<RawRecord, Arc<ApiError>>;

type FetchFuture = BoxFuture<'static, FetchResult>;

/// Builds a display summary from a raw payload and the ID it was fetched under.
pub type Summarizer = fn(&RawRecord, &str) -> RawRecord;

/// A cloneable handle around an injected fetch-entity-by-ID function.
///
/// The batch size bounds in-flight concurrency during batch resolution; it is
/// a tunable, not a protocol constant.
#[derive(Clone)]
pub struct EntityResolver {
    fetch: Arc<dyn Fn(String) -> FetchFuture + Send + Sync>,
    batch_size: usize,
}

impl EntityResolver {
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RawRecord, ApiError>> + Send + 'static,
    {
        Self {
            fetch: Arc::new(move |id| fetch(id).map(|result| result.map_err(Arc::new)).boxed()),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn fetch(&self, id: &str) -> FetchResult {
        (self.fetch)(id.to_string()).await
    }

    /// Wrap this resolver so each distinct ID is fetched at most once for the
    /// lifetime of the returned resolver. The first request for an ID installs
    /// a shared future; later requests for the same ID await that same future,
    /// whether it is still in flight or already settled. The cache lives only
    /// as long as the returned resolver.
    pub fn memoized(&self) -> EntityResolver {
        let inner = self.clone();
        let cache: Arc<Mutex<HashMap<String, Shared<FetchFuture>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        EntityResolver {
            batch_size: self.batch_size,
            fetch: Arc::new(move |id: String| {
                let shared = match cache.lock().entry(id.clone()) {
                    Entry::Occupied(entry) => entry.get().clone(),
                    Entry::Vacant(entry) => {
                        let inner = inner.clone();
                        let pending = (async move { inner.fetch(&id).await }).boxed().shared();
                        entry.insert(pending).clone()
                    }
                };
                shared.boxed()
            }),
        }
    }
}

/// Coerce an ID-array value into canonical string IDs: non-arrays yield
/// nothing, invalid elements are dropped, duplicates keep their first
/// occurrence, order is preserved.
pub fn normalize_ids(value: &Value) -> Vec<String> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in entries {
        let Some(id) = record::to_id(entry) else {
            continue;
        };
        if seen.insert(id.clone()) {
            out.push(id);
        }
    }
    out
}

/// The id-only reference used when a fetch fails.
pub fn stub_reference(id: &str) -> RawRecord {
    let mut record = Map::new();
    record.insert("id".to_string(), Value::String(id.to_string()));
    record
}

/// Fetch the given (already deduplicated) IDs in fixed-size chunks and build
/// a summary per ID. Chunks run sequentially; fetches within a chunk are
/// concurrently in flight. Every input ID gets an entry in the output map: a
/// summary on success, a stub on failure.
pub async fn resolve_batch(
    ids: &[String],
    resolver: &EntityResolver,
    summarize: Summarizer,
) -> HashMap<String, RawRecord> {
    let mut out = HashMap::with_capacity(ids.len());

    for chunk in ids.chunks(resolver.batch_size()) {
        let fetched = join_all(
            chunk
                .iter()
                .map(|id| async move { (id.as_str(), resolver.fetch(id).await) }),
        )
        .await;

        for (id, result) in fetched {
            match result {
                Ok(payload) => {
                    out.insert(id.to_string(), summarize(&payload, id));
                }
                Err(error) => {
                    log::debug!("reference resolution failed for id {id}: {error}");
                    out.insert(id.to_string(), stub_reference(id));
                }
            }
        }
    }
    out
}

/// Resolve a flat ID-array value into an ordered list of summaries.
pub async fn resolve_id_list(
    ids_value: &Value,
    resolver: &EntityResolver,
    summarize: Summarizer,
) -> Vec<RawRecord> {
    let ids = normalize_ids(ids_value);
    if ids.is_empty() {
        return Vec::new();
    }

    let resolved = resolve_batch(&ids, resolver, summarize).await;
    ids.iter()
        .map(|id| resolved.get(id).cloned().unwrap_or_else(|| stub_reference(id)))
        .collect()
}

// ---------------------------------------------------------------------------
// Summarizers
// ---------------------------------------------------------------------------

/// Person summary: id, display name, and whichever of first/last name and
/// email fields the payload carries.
pub fn summarize_person_reference(payload: &RawRecord, fallback_id: &str) -> RawRecord {
    let id = record::id_or(payload, fallback_id);
    let first_name = record::get_str(payload, "first_name");
    let last_name = record::get_str(payload, "last_name");
    let emails = record::get_string_items(payload, "emails");
    let primary_email = record::get_str(payload, "primary_email")
        .map(str::to_string)
        .or_else(|| emails.first().cloned());

    let full_name = [first_name, last_name]
        .iter()
        .flatten()
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let full_name = full_name.trim();
    let name = record::get_str(payload, "name")
        .map(str::to_string)
        .or_else(|| (!full_name.is_empty()).then(|| full_name.to_string()))
        .or_else(|| primary_email.clone())
        .unwrap_or_else(|| id.clone());

    let mut out = Map::new();
    out.insert("id".to_string(), Value::String(id));
    out.insert("name".to_string(), Value::String(name));
    if let Some(first_name) = first_name {
        out.insert("first_name".to_string(), Value::String(first_name.to_string()));
    }
    if let Some(last_name) = last_name {
        out.insert("last_name".to_string(), Value::String(last_name.to_string()));
    }
    if let Some(primary_email) = primary_email {
        out.insert("primary_email".to_string(), Value::String(primary_email));
    }
    if !emails.is_empty() {
        out.insert(
            "emails".to_string(),
            Value::Array(emails.into_iter().map(Value::String).collect()),
        );
    }
    out
}

/// Slim person summary used inside interaction blocks: id, name, and the
/// primary email only.
pub fn summarize_interaction_person_reference(payload: &RawRecord, fallback_id: &str) -> RawRecord {
    let full = summarize_person_reference(payload, fallback_id);
    let id = record::id_or(&full, fallback_id);
    let name = record::get_str(&full, "name")
        .map(str::to_string)
        .unwrap_or_else(|| id.clone());

    let mut out = Map::new();
    out.insert("id".to_string(), Value::String(id));
    out.insert("name".to_string(), Value::String(name));
    if let Some(primary_email) = record::get_str(&full, "primary_email") {
        out.insert("primary_email".to_string(), Value::String(primary_email.to_string()));
    }
    out
}

/// Organization summary: id plus name/domain/domains when present. Nothing is
/// synthesized.
pub fn summarize_organization_reference(payload: &RawRecord, fallback_id: &str) -> RawRecord {
    let id = record::id_or(payload, fallback_id);
    let domains = record::get_string_items(payload, "domains");

    let mut out = Map::new();
    out.insert("id".to_string(), Value::String(id));
    if let Some(name) = record::get_str(payload, "name") {
        out.insert("name".to_string(), Value::String(name.to_string()));
    }
    if let Some(domain) = record::get_str(payload, "domain") {
        out.insert("domain".to_string(), Value::String(domain.to_string()));
    }
    if !domains.is_empty() {
        out.insert(
            "domains".to_string(),
            Value::Array(domains.into_iter().map(Value::String).collect()),
        );
    }
    out
}

/// Opportunity summary: id, name, and re-normalized linked person and
/// organization ID lists.
pub fn summarize_opportunity_reference(payload: &RawRecord, fallback_id: &str) -> RawRecord {
    let id = record::id_or(payload, fallback_id);
    let person_ids = payload.get("person_ids").map(normalize_ids).unwrap_or_default();
    let organization_ids = payload
        .get("organization_ids")
        .map(normalize_ids)
        .unwrap_or_default();

    let mut out = Map::new();
    out.insert("id".to_string(), Value::String(id));
    if let Some(name) = record::get_str(payload, "name") {
        out.insert("name".to_string(), Value::String(name.to_string()));
    }
    if !person_ids.is_empty() {
        out.insert(
            "person_ids".to_string(),
            Value::Array(person_ids.into_iter().map(Value::String).collect()),
        );
    }
    if !organization_ids.is_empty() {
        out.insert(
            "organization_ids".to_string(),
            Value::Array(organization_ids.into_iter().map(Value::String).collect()),
        );
    }
    out
}

/// Full opportunity summary: the whole payload, with id and linked ID lists
/// normalized in place.
pub fn summarize_opportunity_resolved_reference(
    payload: &RawRecord,
    fallback_id: &str,
) -> RawRecord {
    let id = record::id_or(payload, fallback_id);
    let person_ids = payload.get("person_ids").map(normalize_ids).unwrap_or_default();
    let organization_ids = payload
        .get("organization_ids")
        .map(normalize_ids)
        .unwrap_or_default();

    let mut out = payload.clone();
    out.insert("id".to_string(), Value::String(id));
    if !person_ids.is_empty() {
        out.insert(
            "person_ids".to_string(),
            Value::Array(person_ids.into_iter().map(Value::String).collect()),
        );
    }
    if !organization_ids.is_empty() {
        out.insert(
            "organization_ids".to_string(),
            Value::Array(organization_ids.into_iter().map(Value::String).collect()),
        );
    }
    out
}

/// List summary: id, name, entity type, size, and privacy flag when present.
pub fn summarize_list_reference(payload: &RawRecord, fallback_id: &str) -> RawRecord {
    let id = record::id_or(payload, fallback_id);

    let mut out = Map::new();
    out.insert("id".to_string(), Value::String(id));
    if let Some(name) = record::get_str(payload, "name") {
        out.insert("name".to_string(), Value::String(name.to_string()));
    }
    if let Some(entity_type) = record::get_scalar(payload, "entity_type") {
        out.insert("entity_type".to_string(), entity_type.clone());
    }
    if let Some(list_size) = payload.get("list_size").filter(|v| v.is_number()) {
        out.insert("list_size".to_string(), list_size.clone());
    }
    if let Some(is_private) = payload.get("is_private").filter(|v| v.is_boolean()) {
        out.insert("is_private".to_string(), is_private.clone());
    }
    out
}

// ---------------------------------------------------------------------------
// Field-level operators
// ---------------------------------------------------------------------------

/// Configuration for resolving an array-valued ID field into a target field.
#[derive(Clone, Copy)]
pub struct IdFieldSpec<'a> {
    pub ids_field: &'a str,
    pub target_field: &'a str,
    pub summarize: Summarizer,
    pub drop_source_field: bool,
}

impl<'a> IdFieldSpec<'a> {
    pub fn new(ids_field: &'a str, target_field: &'a str, summarize: Summarizer) -> Self {
        Self {
            ids_field,
            target_field,
            summarize,
            drop_source_field: true,
        }
    }

    /// Keep the source ID field alongside the resolved target field.
    pub fn keep_source_field(mut self) -> Self {
        self.drop_source_field = false;
        self
    }
}

/// Configuration for resolving a scalar foreign-key field into a target field.
#[derive(Clone, Copy)]
pub struct ForeignKeySpec<'a> {
    pub id_field: &'a str,
    pub target_field: &'a str,
    pub summarize: Summarizer,
    pub drop_source_field: bool,
}

impl<'a> ForeignKeySpec<'a> {
    pub fn new(id_field: &'a str, target_field: &'a str, summarize: Summarizer) -> Self {
        Self {
            id_field,
            target_field,
            summarize,
            drop_source_field: true,
        }
    }

    pub fn keep_source_field(mut self) -> Self {
        self.drop_source_field = false;
        self
    }
}

/// Resolve one record's array ID field. A missing or non-array field returns
/// the record unchanged. An empty resolution keeps the source field; there is
/// nothing to replace it with.
pub async fn resolve_record_id_field(
    record: RawRecord,
    resolver: &EntityResolver,
    spec: &IdFieldSpec<'_>,
) -> RawRecord {
    let ids_value = match record.get(spec.ids_field) {
        Some(value) if value.is_array() => value.clone(),
        _ => return record,
    };

    let resolved = resolve_id_list(&ids_value, resolver, spec.summarize).await;

    let mut out = record;
    if spec.drop_source_field && !resolved.is_empty() {
        out.shift_remove(spec.ids_field);
    }
    out.insert(
        spec.target_field.to_string(),
        Value::Array(resolved.into_iter().map(Value::Object).collect()),
    );
    out
}

/// Resolve the same array ID field across many records. The union of IDs is
/// fetched exactly once; each record is then rewritten from the shared map,
/// so an ID referenced by several records costs one fetch.
pub async fn resolve_records_id_field(
    records: Vec<RawRecord>,
    resolver: &EntityResolver,
    spec: &IdFieldSpec<'_>,
) -> Vec<RawRecord> {
    let mut union = Vec::new();
    let mut seen = HashSet::new();
    for record in &records {
        let Some(value) = record.get(spec.ids_field) else {
            continue;
        };
        for id in normalize_ids(value) {
            if seen.insert(id.clone()) {
                union.push(id);
            }
        }
    }
    if union.is_empty() {
        return records;
    }

    let resolved = resolve_batch(&union, resolver, spec.summarize).await;

    records
        .into_iter()
        .map(|record| {
            let ids = match record.get(spec.ids_field) {
                Some(value) if value.is_array() => normalize_ids(value),
                _ => return record,
            };
            let summaries = ids
                .iter()
                .map(|id| {
                    Value::Object(resolved.get(id).cloned().unwrap_or_else(|| stub_reference(id)))
                })
                .collect();

            let mut out = record;
            if spec.drop_source_field {
                out.shift_remove(spec.ids_field);
            }
            out.insert(spec.target_field.to_string(), Value::Array(summaries));
            out
        })
        .collect()
}

/// Resolve a scalar foreign-key field across many records (`interaction_id`,
/// `parent_id`). Distinct values are fetched once; records without a scalar
/// ID pass through unchanged.
pub async fn resolve_records_foreign_key_field(
    records: Vec<RawRecord>,
    resolver: &EntityResolver,
    spec: &ForeignKeySpec<'_>,
) -> Vec<RawRecord> {
    let mut ids = Vec::new();
    let mut seen = HashSet::new();
    for record in &records {
        if let Some(id) = record.get(spec.id_field).and_then(record::to_id) {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }
    if ids.is_empty() {
        return records;
    }

    let resolved = resolve_batch(&ids, resolver, spec.summarize).await;

    records
        .into_iter()
        .map(|record| {
            let Some(id) = record.get(spec.id_field).and_then(record::to_id) else {
                return record;
            };
            let summary = resolved.get(&id).cloned().unwrap_or_else(|| stub_reference(&id));

            let mut out = record;
            if spec.drop_source_field {
                out.shift_remove(spec.id_field);
            }
            out.insert(spec.target_field.to_string(), Value::Object(summary));
            out
        })
        .collect()
}

/// Resolve a foreign key carried by each sub-object of an array field, e.g.
/// `list_entries[].list_id` into `list_entries[].list`. Distinct keys across
/// all sub-objects are fetched once. Sub-objects that are not records, or
/// that carry no scalar key, pass through untouched.
pub async fn resolve_nested_array_foreign_key_field(
    record: RawRecord,
    array_field: &str,
    resolver: &EntityResolver,
    spec: &ForeignKeySpec<'_>,
) -> RawRecord {
    let entries = match record.get(array_field) {
        Some(Value::Array(entries)) => entries.clone(),
        _ => return record,
    };

    let mut ids = Vec::new();
    let mut seen = HashSet::new();
    for entry in &entries {
        let Some(id) = entry
            .as_object()
            .and_then(|typed| typed.get(spec.id_field))
            .and_then(record::to_id)
        else {
            continue;
        };
        if seen.insert(id.clone()) {
            ids.push(id);
        }
    }

    let resolved = if ids.is_empty() {
        HashMap::new()
    } else {
        resolve_batch(&ids, resolver, spec.summarize).await
    };

    let rewritten = entries
        .into_iter()
        .map(|entry| {
            let Value::Object(typed) = entry else {
                return entry;
            };
            let Some(id) = typed.get(spec.id_field).and_then(record::to_id) else {
                return Value::Object(typed);
            };
            let summary = resolved.get(&id).cloned().unwrap_or_else(|| stub_reference(&id));

            let mut out = typed;
            if spec.drop_source_field {
                out.shift_remove(spec.id_field);
            }
            out.insert(spec.target_field.to_string(), Value::Object(summary));
            Value::Object(out)
        })
        .collect();

    let mut out = record;
    out.insert(array_field.to_string(), Value::Array(rewritten));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    fn org_resolver(calls: Arc<Mutex<Vec<String>>>) -> EntityResolver {
        EntityResolver::new(move |id| {
            let calls = calls.clone();
            async move {
                calls.lock().push(id.clone());
                Ok(to_record(json!({ "id": id, "name": format!("Org {id}") })))
            }
        })
    }

    fn failing_resolver() -> EntityResolver {
        EntityResolver::new(|_id| async move {
            Err(ApiError::Api {
                status: 404,
                payload: None,
                request_id: None,
            })
        })
    }

    #[test]
    fn test_normalize_ids_dedupes_preserving_first_seen_order() {
        assert_eq!(
            normalize_ids(&json!([97814168, 97814168, "205061870"])),
            vec!["97814168", "205061870"]
        );
        assert_eq!(normalize_ids(&json!(["a", "b", "c", "a"])), vec!["a", "b", "c"]);
        assert_eq!(normalize_ids(&json!(["a", null, "", 3.5])), vec!["a", "3.5"]);
        assert!(normalize_ids(&json!("a")).is_empty());
        assert!(normalize_ids(&json!(null)).is_empty());
    }

    #[test]
    fn test_summarize_person_reference_full_name() {
        let summary = summarize_person_reference(
            &to_record(json!({ "id": 1, "first_name": "Sample", "last_name": "User" })),
            "1",
        );
        assert_eq!(
            Value::Object(summary),
            json!({
                "id": "1",
                "name": "Sample User",
                "first_name": "Sample",
                "last_name": "User"
            })
        );
    }

    #[test]
    fn test_summarize_person_reference_email_fallbacks() {
        let summary = summarize_person_reference(
            &to_record(json!({ "emails": ["first@example.com", "second@example.com"] })),
            "9",
        );
        assert_eq!(
            Value::Object(summary),
            json!({
                "id": "9",
                "name": "first@example.com",
                "primary_email": "first@example.com",
                "emails": ["first@example.com", "second@example.com"]
            })
        );

        let bare = summarize_person_reference(&RawRecord::new(), "12");
        assert_eq!(Value::Object(bare), json!({ "id": "12", "name": "12" }));
    }

    #[test]
    fn test_summarize_interaction_person_reference_is_slim() {
        let summary = summarize_interaction_person_reference(
            &to_record(json!({
                "id": 5,
                "first_name": "Sample",
                "last_name": "User",
                "primary_email": "sample.user@example.com",
                "emails": ["sample.user@example.com"]
            })),
            "5",
        );
        assert_eq!(
            Value::Object(summary),
            json!({
                "id": "5",
                "name": "Sample User",
                "primary_email": "sample.user@example.com"
            })
        );
    }

    #[test]
    fn test_summarize_opportunity_reference_normalizes_linked_ids() {
        let summary = summarize_opportunity_reference(
            &to_record(json!({
                "id": 100574261,
                "name": "Example Opportunity",
                "person_ids": [244518312, 244518312, "251779079"],
                "organization_ids": []
            })),
            "100574261",
        );
        assert_eq!(
            Value::Object(summary),
            json!({
                "id": "100574261",
                "name": "Example Opportunity",
                "person_ids": ["244518312", "251779079"]
            })
        );
    }

    #[test]
    fn test_summarize_opportunity_resolved_reference_spreads_payload() {
        let summary = summarize_opportunity_resolved_reference(
            &to_record(json!({
                "id": 7,
                "name": "Deal",
                "stage": "won",
                "person_ids": [1, 1, 2]
            })),
            "7",
        );
        assert_eq!(summary.get("stage"), Some(&json!("won")));
        assert_eq!(summary.get("id"), Some(&json!("7")));
        assert_eq!(summary.get("person_ids"), Some(&json!(["1", "2"])));
    }

    #[test]
    fn test_summarize_list_reference() {
        let summary = summarize_list_reference(
            &to_record(json!({
                "id": 11,
                "name": "Pipeline",
                "entity_type": 8,
                "list_size": 140,
                "is_private": false,
                "owner_id": 3
            })),
            "11",
        );
        assert_eq!(
            Value::Object(summary),
            json!({
                "id": "11",
                "name": "Pipeline",
                "entity_type": 8,
                "list_size": 140,
                "is_private": false
            })
        );
    }

    #[tokio::test]
    async fn test_resolve_record_id_field_replaces_source() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = org_resolver(calls.clone());
        let spec = IdFieldSpec::new(
            "current_organization_ids",
            "current_organizations",
            summarize_organization_reference,
        );

        let resolved = resolve_record_id_field(
            to_record(json!({ "id": "97844218", "current_organization_ids": [304495417] })),
            &resolver,
            &spec,
        )
        .await;

        assert_eq!(
            Value::Object(resolved),
            json!({
                "id": "97844218",
                "current_organizations": [{ "id": "304495417", "name": "Org 304495417" }]
            })
        );
        assert_eq!(calls.lock().as_slice(), ["304495417"]);
    }

    #[tokio::test]
    async fn test_resolve_record_id_field_no_op_without_array() {
        let resolver = failing_resolver();
        let spec = IdFieldSpec::new("person_ids", "persons", summarize_person_reference);

        let record = to_record(json!({ "id": "1", "person_ids": "not-an-array" }));
        let resolved = resolve_record_id_field(record.clone(), &resolver, &spec).await;
        assert_eq!(resolved, record);

        let record = to_record(json!({ "id": "1" }));
        let resolved = resolve_record_id_field(record.clone(), &resolver, &spec).await;
        assert_eq!(resolved, record);
    }

    #[tokio::test]
    async fn test_resolve_record_id_field_empty_ids_keeps_source() {
        let resolver = failing_resolver();
        let spec = IdFieldSpec::new("person_ids", "persons", summarize_person_reference);

        let resolved =
            resolve_record_id_field(to_record(json!({ "person_ids": [] })), &resolver, &spec).await;
        assert_eq!(
            Value::Object(resolved),
            json!({ "person_ids": [], "persons": [] })
        );
    }

    #[tokio::test]
    async fn test_resolve_record_id_field_falls_back_to_stub_on_failure() {
        let resolver = failing_resolver();
        let spec = IdFieldSpec::new(
            "current_organization_ids",
            "current_organizations",
            summarize_organization_reference,
        );

        let resolved = resolve_record_id_field(
            to_record(json!({ "current_organization_ids": [123] })),
            &resolver,
            &spec,
        )
        .await;
        assert_eq!(
            Value::Object(resolved),
            json!({ "current_organizations": [{ "id": "123" }] })
        );
    }

    #[tokio::test]
    async fn test_resolve_record_id_field_keep_source_field() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = org_resolver(calls);
        let spec = IdFieldSpec::new("organization_ids", "organizations", summarize_organization_reference)
            .keep_source_field();

        let resolved = resolve_record_id_field(
            to_record(json!({ "organization_ids": [5] })),
            &resolver,
            &spec,
        )
        .await;
        assert_eq!(
            Value::Object(resolved),
            json!({
                "organization_ids": [5],
                "organizations": [{ "id": "5", "name": "Org 5" }]
            })
        );
    }

    #[tokio::test]
    async fn test_resolve_records_id_field_fetches_each_id_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = org_resolver(calls.clone());
        let spec = IdFieldSpec::new(
            "current_organization_ids",
            "current_organizations",
            summarize_organization_reference,
        );

        let records = vec![
            to_record(json!({ "current_organization_ids": [1, 2] })),
            to_record(json!({ "current_organization_ids": [2, 1] })),
        ];
        let resolved = resolve_records_id_field(records, &resolver, &spec).await;

        let mut seen = calls.lock().clone();
        seen.sort();
        assert_eq!(seen, ["1", "2"]);

        // Per-record order follows that record's own ID order.
        assert_eq!(
            resolved[1].get("current_organizations"),
            Some(&json!([
                { "id": "2", "name": "Org 2" },
                { "id": "1", "name": "Org 1" }
            ]))
        );
    }

    #[tokio::test]
    async fn test_resolve_records_id_field_empty_union_is_identity() {
        let resolver = failing_resolver();
        let spec = IdFieldSpec::new("person_ids", "persons", summarize_person_reference);

        let records = vec![
            to_record(json!({ "id": "1" })),
            to_record(json!({ "id": "2", "person_ids": "bad" })),
        ];
        let resolved = resolve_records_id_field(records.clone(), &resolver, &spec).await;
        assert_eq!(resolved, records);
    }

    #[tokio::test]
    async fn test_resolve_records_foreign_key_field_shares_fetches() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = org_resolver(calls.clone());
        let spec = ForeignKeySpec::new("interaction_id", "interaction", summarize_organization_reference)
            .keep_source_field();

        let records = vec![
            to_record(json!({ "id": "a", "interaction_id": 9 })),
            to_record(json!({ "id": "b", "interaction_id": "9" })),
            to_record(json!({ "id": "c" })),
        ];
        let resolved = resolve_records_foreign_key_field(records, &resolver, &spec).await;

        assert_eq!(calls.lock().as_slice(), ["9"]);
        assert_eq!(resolved[0].get("interaction"), Some(&json!({ "id": "9", "name": "Org 9" })));
        assert_eq!(resolved[0].get("interaction_id"), Some(&json!(9)));
        assert_eq!(resolved[1].get("interaction"), Some(&json!({ "id": "9", "name": "Org 9" })));
        assert_eq!(Value::Object(resolved[2].clone()), json!({ "id": "c" }));
    }

    #[tokio::test]
    async fn test_resolve_nested_array_foreign_key_field_resolves_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = org_resolver(calls.clone());
        let spec = ForeignKeySpec::new("list_id", "list", summarize_list_reference).keep_source_field();

        let resolved = resolve_nested_array_foreign_key_field(
            to_record(json!({
                "list_entries": [
                    { "id": 1, "list_id": "L" },
                    { "id": 2, "list_id": "L" },
                    "loose-entry",
                    { "id": 3 }
                ]
            })),
            "list_entries",
            &resolver,
            &spec,
        )
        .await;

        assert_eq!(calls.lock().as_slice(), ["L"]);
        let entries = resolved.get("list_entries").and_then(Value::as_array).unwrap();
        assert_eq!(entries[0].get("list"), entries[1].get("list"));
        assert_eq!(entries[0].get("list_id"), Some(&json!("L")));
        assert_eq!(entries[2], json!("loose-entry"));
        assert_eq!(entries[3], json!({ "id": 3 }));
    }

    #[tokio::test]
    async fn test_memoized_resolver_fetches_each_id_once_across_calls() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = org_resolver(calls.clone()).memoized();

        let first = resolver.fetch("42").await.unwrap();
        let second = resolver.fetch("42").await.unwrap();
        resolver.fetch("43").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.lock().as_slice(), ["42", "43"]);
    }

    #[tokio::test]
    async fn test_memoized_resolver_collapses_concurrent_requests() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = org_resolver(calls.clone()).memoized();

        let (first, second) = tokio::join!(resolver.fetch("7"), resolver.fetch("7"));
        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(calls.lock().as_slice(), ["7"]);
    }

    #[tokio::test]
    async fn test_resolve_batch_covers_every_id_across_chunks() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = org_resolver(calls.clone()).with_batch_size(2);

        let ids: Vec<String> = (1..=5).map(|n| n.to_string()).collect();
        let resolved = resolve_batch(&ids, &resolver, summarize_organization_reference).await;

        assert_eq!(resolved.len(), 5);
        assert_eq!(calls.lock().len(), 5);
        for id in &ids {
            assert_eq!(resolved[id].get("id"), Some(&Value::String(id.clone())));
        }
    }
}
