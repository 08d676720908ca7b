//! Person, organization, and opportunity endpoints.
//!
//! The three entity kinds share routes and semantics; one endpoint type
//! parameterized by kind covers them all.

use serde_json::{Number, Value};

use crate::api::{expect_record, AffinityClient, ApiError};
use crate::pagination::{page_from_payload, pick_record_items, Page};
use crate::record::RawRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Person,
    Organization,
    Opportunity,
}

impl EntityKind {
    pub fn route(&self) -> &'static str {
        match self {
            EntityKind::Person => "/persons",
            EntityKind::Organization => "/organizations",
            EntityKind::Opportunity => "/opportunities",
        }
    }

    /// Dedicated field-definition route, where one exists.
    fn field_route(&self) -> Option<&'static str> {
        match self {
            EntityKind::Person => Some("/persons/fields"),
            EntityKind::Organization => Some("/organizations/fields"),
            EntityKind::Opportunity => None,
        }
    }

    /// Numeric entity type used by the generic `/fields` route.
    fn entity_type(&self) -> u64 {
        match self {
            EntityKind::Person => 0,
            EntityKind::Organization => 1,
            EntityKind::Opportunity => 8,
        }
    }

    /// Query parameter naming this kind's ID on the `/field-values` route.
    fn id_param(&self) -> &'static str {
        match self {
            EntityKind::Person => "person_id",
            EntityKind::Organization => "organization_id",
            EntityKind::Opportunity => "opportunity_id",
        }
    }
}

#[derive(Clone)]
pub struct EntitiesEndpoint {
    client: AffinityClient,
    kind: EntityKind,
}

impl EntitiesEndpoint {
    pub fn new(client: AffinityClient, kind: EntityKind) -> Self {
        Self { client, kind }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub async fn search(
        &self,
        term: Option<&str>,
        page_token: Option<&str>,
        page_size: Option<u32>,
        extra_params: &RawRecord,
    ) -> Result<Page<RawRecord>, ApiError> {
        let mut params = RawRecord::new();
        if let Some(term) = term {
            params.insert("term".to_string(), Value::String(term.to_string()));
        }
        if let Some(token) = page_token {
            params.insert("page_token".to_string(), Value::String(token.to_string()));
        }
        if let Some(size) = page_size {
            params.insert("page_size".to_string(), Value::Number(Number::from(size)));
        }
        for (key, value) in extra_params {
            params.insert(key.clone(), value.clone());
        }

        let payload = self.client.get_json(self.kind.route(), &params).await?;
        Ok(page_from_payload(&payload))
    }

    pub async fn get(&self, id: &str, params: &RawRecord) -> Result<RawRecord, ApiError> {
        let path = format!("{}/{id}", self.kind.route());
        expect_record(self.client.get_json(&path, params).await?)
    }

    pub async fn create(&self, data: &Value) -> Result<RawRecord, ApiError> {
        expect_record(self.client.post_json(self.kind.route(), data).await?)
    }

    pub async fn update(&self, id: &str, data: &Value) -> Result<RawRecord, ApiError> {
        let path = format!("{}/{id}", self.kind.route());
        expect_record(self.client.put_json(&path, data).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/{id}", self.kind.route());
        self.client.delete_json(&path).await
    }

    pub async fn field_values(&self, id: &str) -> Result<Vec<RawRecord>, ApiError> {
        let mut params = RawRecord::new();
        params.insert(
            self.kind.id_param().to_string(),
            Value::String(id.to_string()),
        );
        let payload = self.client.get_json("/field-values", &params).await?;
        Ok(pick_record_items(&payload))
    }

    pub async fn field_definitions(&self) -> Result<Vec<RawRecord>, ApiError> {
        if let Some(route) = self.kind.field_route() {
            let payload = self.client.get_json(route, &RawRecord::new()).await?;
            return Ok(pick_record_items(&payload));
        }

        let mut params = RawRecord::new();
        params.insert(
            "entity_type".to_string(),
            Value::Number(Number::from(self.kind.entity_type())),
        );
        let payload = self.client.get_json("/fields", &params).await?;
        Ok(pick_record_items(&payload))
    }
}
