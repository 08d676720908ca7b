//! Person / organization / opportunity commands.
//!
//! The three entity kinds share one command tree. Search and get both
//! post-process API records through the reference-resolution engine; which
//! passes run depends on the kind, the detail flags, and compact output.

use std::collections::HashMap;

use clap::{Args, Subcommand, ValueEnum};
use serde_json::Value;

use crate::api::entities::{EntitiesEndpoint, EntityKind};
use crate::api::relationships::RelationshipStrengthsEndpoint;
use crate::commands::{parse_json_arg, parse_json_record};
use crate::error::CliError;
use crate::output::{emit, OutputOptions};
use crate::pagination::collect_all_pages;
use crate::record::{self, RawRecord};
use crate::resolve::interaction::resolve_interaction_persons;
use crate::resolve::reference::{
    resolve_id_list, resolve_nested_array_foreign_key_field, resolve_record_id_field,
    resolve_records_id_field, stub_reference, summarize_interaction_person_reference,
    summarize_list_reference, summarize_opportunity_reference,
    summarize_opportunity_resolved_reference, summarize_organization_reference,
    summarize_person_reference, EntityResolver, ForeignKeySpec, IdFieldSpec,
};
use crate::resolve::compiled::compile_entity;

#[derive(Debug, Subcommand)]
pub enum EntityCommand {
    /// Search records by term or domain
    Search(SearchArgs),
    /// Fetch one record by ID
    Get(GetArgs),
    /// Create a record from a JSON payload
    Create(CreateArgs),
    /// Update a record from a JSON payload
    Update(UpdateArgs),
    /// Create or update depending on a matching key
    Assert(AssertArgs),
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search term
    #[arg(long)]
    pub term: Option<String>,
    /// Exact domain lookup (performed server-side using term=<domain>)
    #[arg(long)]
    pub domain: Option<String>,
    /// Auto-paginate all records
    #[arg(long)]
    pub all: bool,
    /// Page size
    #[arg(long, default_value_t = 25)]
    pub page_size: u32,
    /// Starting page token
    #[arg(long)]
    pub page_token: Option<String>,
    /// Include interaction dates and interaction persons
    #[arg(long)]
    pub with_interactions: bool,
    /// Include opportunity IDs when supported
    #[arg(long)]
    pub with_opportunities: bool,
    /// Include current organizations (person endpoints)
    #[arg(long)]
    pub with_current_organizations: bool,
    /// Minimum first_email date (ISO 8601)
    #[arg(long)]
    pub min_first_email_date: Option<String>,
    /// Maximum first_email date (ISO 8601)
    #[arg(long)]
    pub max_first_email_date: Option<String>,
    /// Minimum last_email date (ISO 8601)
    #[arg(long)]
    pub min_last_email_date: Option<String>,
    /// Maximum last_email date (ISO 8601)
    #[arg(long)]
    pub max_last_email_date: Option<String>,
    /// Minimum last_interaction date (ISO 8601)
    #[arg(long)]
    pub min_last_interaction_date: Option<String>,
    /// Maximum last_interaction date (ISO 8601)
    #[arg(long)]
    pub max_last_interaction_date: Option<String>,
    /// Minimum last_event date (ISO 8601)
    #[arg(long)]
    pub min_last_event_date: Option<String>,
    /// Maximum last_event date (ISO 8601)
    #[arg(long)]
    pub max_last_event_date: Option<String>,
    /// Minimum first_event date (ISO 8601)
    #[arg(long)]
    pub min_first_event_date: Option<String>,
    /// Maximum first_event date (ISO 8601)
    #[arg(long)]
    pub max_first_event_date: Option<String>,
    /// Minimum next_event date (ISO 8601)
    #[arg(long)]
    pub min_next_event_date: Option<String>,
    /// Maximum next_event date (ISO 8601)
    #[arg(long)]
    pub max_next_event_date: Option<String>,
    /// Additional raw query params JSON passed to API
    #[arg(long)]
    pub query: Option<String>,
}

impl SearchArgs {
    fn date_filters(&self) -> Vec<(&'static str, &String)> {
        let pairs = [
            ("min_first_email_date", &self.min_first_email_date),
            ("max_first_email_date", &self.max_first_email_date),
            ("min_last_email_date", &self.min_last_email_date),
            ("max_last_email_date", &self.max_last_email_date),
            ("min_last_interaction_date", &self.min_last_interaction_date),
            ("max_last_interaction_date", &self.max_last_interaction_date),
            ("min_last_event_date", &self.min_last_event_date),
            ("max_last_event_date", &self.max_last_event_date),
            ("min_first_event_date", &self.min_first_event_date),
            ("max_first_event_date", &self.max_first_event_date),
            ("min_next_event_date", &self.min_next_event_date),
            ("max_next_event_date", &self.max_next_event_date),
        ];
        pairs
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key, v)))
            .collect()
    }
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Record ID
    pub id: String,
    /// Resolve linked references
    #[arg(long)]
    pub detailed: bool,
    /// Detailed output plus relationship strengths / normalized field values
    #[arg(long)]
    pub full: bool,
    /// Get entity merged with field values (legacy alias)
    #[arg(long)]
    pub compiled: bool,
    /// Include normalized field values keyed by field name
    #[arg(long)]
    pub with_fields: bool,
    /// Include interaction dates and interaction persons
    #[arg(long)]
    pub with_interactions: bool,
    /// Include opportunity IDs when supported
    #[arg(long)]
    pub with_opportunities: bool,
    /// Include current organizations (person endpoints)
    #[arg(long)]
    pub with_current_organizations: bool,
    /// Additional raw query params JSON passed to API
    #[arg(long)]
    pub query: Option<String>,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// JSON body for create
    #[arg(long, required = true)]
    pub data: String,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Record ID
    pub id: String,
    /// JSON body for update
    #[arg(long, required = true)]
    pub data: String,
}

#[derive(Debug, Args)]
pub struct AssertArgs {
    /// Matching key: email|domain|name
    #[arg(long, value_enum, required = true)]
    pub matching: MatchKey,
    /// JSON payload for assert
    #[arg(long, required = true)]
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatchKey {
    Email,
    Domain,
    Name,
}

impl MatchKey {
    fn as_str(&self) -> &'static str {
        match self {
            MatchKey::Email => "email",
            MatchKey::Domain => "domain",
            MatchKey::Name => "name",
        }
    }
}

/// Endpoint and resolver wiring for one entity kind's command tree.
pub struct EntityDeps {
    pub endpoint: EntitiesEndpoint,
    /// Person lookups for interaction blocks and linked persons.
    pub person_resolver: Option<EntityResolver>,
    pub organization_resolver: Option<EntityResolver>,
    pub opportunity_resolver: Option<EntityResolver>,
    pub list_resolver: Option<EntityResolver>,
    pub relationship_strengths: Option<RelationshipStrengthsEndpoint>,
}

pub async fn run(
    deps: &EntityDeps,
    command: &EntityCommand,
    output: &OutputOptions,
) -> Result<(), CliError> {
    match command {
        EntityCommand::Search(args) => search(deps, args, output).await,
        EntityCommand::Get(args) => get(deps, args, output).await,
        EntityCommand::Create(args) => {
            let payload = parse_json_arg(&args.data, "--data")?;
            let created = deps.endpoint.create(&payload).await?;
            emit(Value::Object(created), output);
            Ok(())
        }
        EntityCommand::Update(args) => {
            let payload = parse_json_arg(&args.data, "--data")?;
            let updated = deps.endpoint.update(&args.id, &payload).await?;
            emit(Value::Object(updated), output);
            Ok(())
        }
        EntityCommand::Assert(args) => assert_record(deps, args, output).await,
    }
}

async fn search(
    deps: &EntityDeps,
    args: &SearchArgs,
    output: &OutputOptions,
) -> Result<(), CliError> {
    let kind = deps.endpoint.kind();
    let allow_organization_resolution = !(kind == EntityKind::Organization && output.compact);
    let allow_opportunity_resolution = !output.compact;

    if args.term.is_none() && args.domain.is_none() {
        return Err(CliError::Usage(
            "At least one of --term or --domain is required".to_string(),
        ));
    }

    let include_interactions = args.with_interactions;

    let mut extra = match &args.query {
        Some(query) => parse_json_record(query, "--query")?,
        None => RawRecord::new(),
    };
    extra.insert(
        "with_interaction_dates".to_string(),
        Value::Bool(include_interactions),
    );
    extra.insert(
        "with_interaction_persons".to_string(),
        Value::Bool(include_interactions),
    );
    if args.with_opportunities {
        extra.insert("with_opportunities".to_string(), Value::Bool(true));
    }
    if args.with_current_organizations {
        extra.insert("with_current_organizations".to_string(), Value::Bool(true));
    }
    for (key, value) in args.date_filters() {
        extra.insert(key.to_string(), Value::String(value.clone()));
    }

    let effective_term = args.domain.as_deref().or(args.term.as_deref());

    let mut records = if args.all {
        collect_all_pages(|token| {
            let token = token.or_else(|| args.page_token.clone());
            let extra = &extra;
            async move {
                deps.endpoint
                    .search(effective_term, token.as_deref(), Some(args.page_size), extra)
                    .await
            }
        })
        .await?
    } else {
        deps.endpoint
            .search(
                effective_term,
                args.page_token.as_deref(),
                Some(args.page_size),
                &extra,
            )
            .await?
            .items
    };

    // Server-side term matching is fuzzy; an exact domain lookup filters the
    // page down to records whose domain or aliases match.
    if let Some(domain) = &args.domain {
        let domain = domain.to_lowercase();
        records.retain(|entry| {
            let primary = record::get_str(entry, "domain")
                .is_some_and(|d| d.to_lowercase() == domain);
            let alias = record::get_array(entry, "domains").is_some_and(|aliases| {
                aliases
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|d| d.to_lowercase() == domain)
            });
            primary || alias
        });
    }

    if include_interactions && allow_organization_resolution {
        if let Some(person) = &deps.person_resolver {
            records = resolve_interaction_persons(
                records,
                person,
                summarize_interaction_person_reference,
            )
            .await;
        }
    }
    if kind == EntityKind::Person && args.with_current_organizations {
        if let Some(organization) = &deps.organization_resolver {
            let spec = IdFieldSpec::new(
                "current_organization_ids",
                "current_organizations",
                summarize_organization_reference,
            );
            records = resolve_records_id_field(records, organization, &spec).await;
        }
    }
    if args.with_opportunities && allow_opportunity_resolution {
        if let Some(opportunity) = &deps.opportunity_resolver {
            let spec = IdFieldSpec::new(
                "opportunity_ids",
                "opportunities",
                summarize_opportunity_reference,
            );
            records = resolve_records_id_field(records, opportunity, &spec).await;
        }
    }

    emit(
        Value::Array(records.into_iter().map(Value::Object).collect()),
        output,
    );
    Ok(())
}

async fn get(deps: &EntityDeps, args: &GetArgs, output: &OutputOptions) -> Result<(), CliError> {
    let kind = deps.endpoint.kind();
    let is_organization = kind == EntityKind::Organization;
    let include_detailed = kind == EntityKind::Person && args.detailed;
    let include_full = kind == EntityKind::Person && args.full;
    let include_resolved_details = include_detailed || include_full;
    let include_organization_detailed = is_organization && (args.detailed || args.full);
    let include_organization_full = is_organization && args.full;
    let allow_organization_resolution = if is_organization {
        include_organization_detailed && !output.compact
    } else {
        !output.compact || include_resolved_details
    };
    let allow_opportunity_resolution = allow_organization_resolution;

    let include_interactions = if is_organization {
        include_organization_detailed
    } else {
        args.with_interactions || include_resolved_details
    };
    let include_opportunities = if is_organization {
        include_organization_detailed
    } else {
        args.with_opportunities || include_resolved_details
    };
    let include_current_organizations = if kind == EntityKind::Person {
        args.with_current_organizations || include_resolved_details
    } else {
        args.with_current_organizations
    };

    let mut params = match &args.query {
        Some(query) => parse_json_record(query, "--query")?,
        None => RawRecord::new(),
    };
    params.insert(
        "with_interaction_dates".to_string(),
        Value::Bool(include_interactions),
    );
    params.insert(
        "with_interaction_persons".to_string(),
        Value::Bool(include_interactions),
    );
    params.insert(
        "with_opportunities".to_string(),
        Value::Bool(include_opportunities),
    );
    params.insert(
        "with_current_organizations".to_string(),
        Value::Bool(include_current_organizations),
    );

    let mut entity = deps.endpoint.get(&args.id, &params).await?;

    if include_interactions && allow_organization_resolution {
        if let Some(person) = &deps.person_resolver {
            entity = resolve_interaction_persons(
                vec![entity],
                person,
                summarize_interaction_person_reference,
            )
            .await
            .pop()
            .unwrap_or_default();
        }
    }
    if is_organization && allow_organization_resolution {
        if let Some(person) = &deps.person_resolver {
            let spec = IdFieldSpec::new("person_ids", "persons", summarize_person_reference);
            entity = resolve_record_id_field(entity, person, &spec).await;
        }
    }
    if kind == EntityKind::Person && include_resolved_details {
        if let Some(organization) = &deps.organization_resolver {
            let spec = IdFieldSpec::new(
                "current_organization_ids",
                "current_organizations",
                summarize_organization_reference,
            );
            entity = resolve_record_id_field(entity, organization, &spec).await;
            let spec = IdFieldSpec::new(
                "organization_ids",
                "organizations",
                summarize_organization_reference,
            );
            entity = resolve_record_id_field(entity, organization, &spec).await;

            if let Some(list) = &deps.list_resolver {
                let spec = ForeignKeySpec::new("list_id", "list", summarize_list_reference)
                    .keep_source_field();
                entity = resolve_nested_array_foreign_key_field(entity, "list_entries", list, &spec)
                    .await;
            }
        }
    }
    if include_opportunities && allow_opportunity_resolution {
        if let Some(opportunity) = &deps.opportunity_resolver {
            let spec = IdFieldSpec::new(
                "opportunity_ids",
                "opportunities",
                summarize_opportunity_resolved_reference,
            );
            entity = resolve_record_id_field(entity, opportunity, &spec).await;

            if let Some(list) = &deps.list_resolver {
                entity = resolve_opportunity_list_entries(entity, list).await;
            }
        }
    }
    if include_full {
        if let Some(relationships) = &deps.relationship_strengths {
            let strengths = relationships.list_by_external_id(&args.id).await?;
            let enriched =
                enrich_relationship_strengths(strengths, deps.person_resolver.as_ref()).await;
            entity.insert(
                "relationship_strengths".to_string(),
                Value::Array(enriched.into_iter().map(Value::Object).collect()),
            );
        }
    }

    let should_include_fields = if is_organization {
        include_organization_full
    } else {
        args.with_fields || args.compiled
    };
    if !should_include_fields {
        emit(Value::Object(entity), output);
        return Ok(());
    }

    let (field_values, fields) = tokio::join!(
        deps.endpoint.field_values(&args.id),
        deps.endpoint.field_definitions()
    );
    let compiled = compile_entity(
        entity,
        field_values?,
        fields?,
        deps.person_resolver.as_ref(),
    )
    .await;
    emit(Value::Object(compiled), output);
    Ok(())
}

/// Resolve the `list` reference on each opportunity's list entries. Each
/// opportunity resolves independently, mirroring how they arrive from the
/// API.
async fn resolve_opportunity_list_entries(
    entity: RawRecord,
    list_resolver: &EntityResolver,
) -> RawRecord {
    let opportunities = match entity.get("opportunities") {
        Some(Value::Array(entries)) => entries.clone(),
        _ => return entity,
    };

    let mut resolved = Vec::with_capacity(opportunities.len());
    for opportunity in opportunities {
        let Value::Object(record) = opportunity else {
            resolved.push(opportunity);
            continue;
        };
        let spec = ForeignKeySpec::new("list_id", "list", summarize_list_reference)
            .keep_source_field();
        let rewritten =
            resolve_nested_array_foreign_key_field(record, "list_entries", list_resolver, &spec)
                .await;
        resolved.push(Value::Object(rewritten));
    }

    let mut out = entity;
    out.insert("opportunities".to_string(), Value::Array(resolved));
    out
}

/// Attach an `internal_person` summary to each relationship-strength record.
/// Distinct internal IDs resolve once; a failed lookup leaves a stub.
async fn enrich_relationship_strengths(
    strengths: Vec<RawRecord>,
    person_resolver: Option<&EntityResolver>,
) -> Vec<RawRecord> {
    let Some(person_resolver) = person_resolver else {
        return strengths;
    };
    if strengths.is_empty() {
        return strengths;
    }

    let mut internal_ids = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for item in &strengths {
        if let Some(id) = item.get("internal_id").and_then(record::to_id) {
            if seen.insert(id.clone()) {
                internal_ids.push(Value::String(id));
            }
        }
    }

    let resolved = resolve_id_list(
        &Value::Array(internal_ids),
        person_resolver,
        summarize_interaction_person_reference,
    )
    .await;
    let by_id: HashMap<String, RawRecord> = resolved
        .into_iter()
        .filter_map(|person| {
            person
                .get("id")
                .and_then(record::to_id)
                .map(|id| (id, person))
        })
        .collect();

    strengths
        .into_iter()
        .map(|item| {
            let Some(internal_id) = item.get("internal_id").and_then(record::to_id) else {
                return item;
            };
            let person = by_id
                .get(&internal_id)
                .cloned()
                .unwrap_or_else(|| stub_reference(&internal_id));
            let mut out = item;
            out.insert("internal_person".to_string(), Value::Object(person));
            out
        })
        .collect()
}

fn find_match<'a>(
    records: &'a [RawRecord],
    key: MatchKey,
    value: &str,
) -> Option<&'a RawRecord> {
    let lower = value.to_lowercase();

    records.iter().find(|record| match key {
        MatchKey::Email => record::get_array(record, "email_addresses")
            .is_some_and(|emails| {
                emails
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|email| email.to_lowercase() == lower)
            }),
        MatchKey::Domain | MatchKey::Name => record::get_str(record, key.as_str())
            .is_some_and(|field| field.to_lowercase() == lower),
    })
}

async fn assert_record(
    deps: &EntityDeps,
    args: &AssertArgs,
    output: &OutputOptions,
) -> Result<(), CliError> {
    let payload = parse_json_record(&args.data, "--data")?;
    let key = args.matching;

    let direct = payload.get(key.as_str()).and_then(Value::as_str);
    let match_value = direct.map(str::to_string).or_else(|| {
        payload
            .get(&format!("{}s", key.as_str()))
            .and_then(Value::as_array)
            .and_then(|plural| plural.iter().find_map(Value::as_str))
            .map(str::to_string)
    });
    let Some(match_value) = match_value else {
        return Err(CliError::Usage(format!(
            "Missing string value for matching key {} in --data payload",
            key.as_str()
        )));
    };

    let matches = collect_all_pages(|token| {
        let match_value = match_value.as_str();
        async move {
            deps.endpoint
                .search(Some(match_value), token.as_deref(), None, &RawRecord::new())
                .await
        }
    })
    .await?;
    let existing = find_match(&matches, key, &match_value);

    let body = Value::Object(payload.clone());
    match existing {
        None => {
            let created = deps.endpoint.create(&body).await?;
            emit(Value::Object(created), output);
        }
        Some(existing) => {
            let Some(id) = existing.get("id").and_then(record::to_id) else {
                return Err(CliError::Usage(
                    "Matched record is missing an id".to_string(),
                ));
            };
            let updated = deps.endpoint.update(&id, &body).await?;
            emit(Value::Object(updated), output);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    fn to_record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_find_match_by_email_is_case_insensitive() {
        let records = vec![
            to_record(json!({ "id": 1, "email_addresses": ["A@X.co"] })),
            to_record(json!({ "id": 2, "email_addresses": ["b@x.co"] })),
        ];
        let matched = find_match(&records, MatchKey::Email, "a@x.co").unwrap();
        assert_eq!(matched.get("id"), Some(&json!(1)));
        assert!(find_match(&records, MatchKey::Email, "c@x.co").is_none());
    }

    #[test]
    fn test_find_match_by_domain_and_name() {
        let records = vec![
            to_record(json!({ "id": 1, "domain": "acme.com" })),
            to_record(json!({ "id": 2, "name": "Acme" })),
        ];
        assert!(find_match(&records, MatchKey::Domain, "ACME.COM").is_some());
        assert!(find_match(&records, MatchKey::Name, "acme").is_some());
        assert!(find_match(&records, MatchKey::Name, "other").is_none());
    }

    #[tokio::test]
    async fn test_enrich_relationship_strengths_attaches_internal_person() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_inner = calls.clone();
        let resolver = EntityResolver::new(move |id| {
            let calls = calls_inner.clone();
            async move {
                calls.lock().push(id.clone());
                Ok(to_record(json!({ "id": id, "first_name": "Rep", "last_name": id })))
            }
        });

        let strengths = vec![
            to_record(json!({ "internal_id": 7, "strength": 0.9 })),
            to_record(json!({ "internal_id": 7, "strength": 0.4 })),
            to_record(json!({ "strength": 0.1 })),
        ];
        let enriched = enrich_relationship_strengths(strengths, Some(&resolver)).await;

        assert_eq!(calls.lock().as_slice(), ["7"]);
        assert_eq!(
            enriched[0].get("internal_person"),
            Some(&json!({ "id": "7", "name": "Rep 7" }))
        );
        assert_eq!(enriched[0].get("internal_person"), enriched[1].get("internal_person"));
        assert!(enriched[2].get("internal_person").is_none());
    }

    #[tokio::test]
    async fn test_enrich_relationship_strengths_without_resolver_is_identity() {
        let strengths = vec![to_record(json!({ "internal_id": 7 }))];
        let enriched = enrich_relationship_strengths(strengths.clone(), None).await;
        assert_eq!(enriched, strengths);
    }

    #[tokio::test]
    async fn test_resolve_opportunity_list_entries_per_opportunity() {
        let resolver = EntityResolver::new(|id: String| async move {
            Ok(to_record(json!({ "id": id, "name": "Pipeline" })))
        });

        let entity = to_record(json!({
            "id": "1",
            "opportunities": [
                { "id": "o1", "list_entries": [{ "id": 5, "list_id": "L1" }] },
                "loose",
                { "id": "o2" }
            ]
        }));
        let resolved = resolve_opportunity_list_entries(entity, &resolver).await;
        let opportunities = resolved.get("opportunities").and_then(Value::as_array).unwrap();

        assert_eq!(
            opportunities[0].pointer("/list_entries/0/list"),
            Some(&json!({ "id": "L1", "name": "Pipeline" }))
        );
        assert_eq!(opportunities[1], json!("loose"));
        assert_eq!(opportunities[2], json!({ "id": "o2" }));
    }

    #[test]
    fn test_date_filters_only_include_set_flags() {
        let args = SearchArgs {
            term: Some("x".to_string()),
            domain: None,
            all: false,
            page_size: 25,
            page_token: None,
            with_interactions: false,
            with_opportunities: false,
            with_current_organizations: false,
            min_first_email_date: Some("2026-01-01".to_string()),
            max_first_email_date: None,
            min_last_email_date: None,
            max_last_email_date: None,
            min_last_interaction_date: None,
            max_last_interaction_date: None,
            min_last_event_date: None,
            max_last_event_date: None,
            min_first_event_date: None,
            max_first_event_date: None,
            min_next_event_date: None,
            max_next_event_date: Some("2026-12-31".to_string()),
            query: None,
        };
        let filters = args.date_filters();
        assert_eq!(
            filters,
            vec![
                ("min_first_email_date", &"2026-01-01".to_string()),
                ("max_next_event_date", &"2026-12-31".to_string()),
            ]
        );
    }
}
