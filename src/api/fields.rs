//! Field-definition and field-value endpoints.

use serde_json::{json, Value};

use crate::api::{expect_record, AffinityClient, ApiError};
use crate::pagination::{page_from_payload, Page};
use crate::record::RawRecord;

#[derive(Clone)]
pub struct FieldsEndpoint {
    client: AffinityClient,
}

impl FieldsEndpoint {
    pub fn new(client: AffinityClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        entity_type: Option<&str>,
        list_id: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<Page<RawRecord>, ApiError> {
        let mut params = RawRecord::new();
        if let Some(entity_type) = entity_type {
            params.insert(
                "entity_type".to_string(),
                Value::String(entity_type.to_string()),
            );
        }
        if let Some(list_id) = list_id {
            params.insert("list_id".to_string(), Value::String(list_id.to_string()));
        }
        if let Some(token) = page_token {
            params.insert("page_token".to_string(), Value::String(token.to_string()));
        }
        let payload = self.client.get_json("/fields", &params).await?;
        Ok(page_from_payload(&payload))
    }

    pub async fn create(&self, data: &Value) -> Result<RawRecord, ApiError> {
        expect_record(self.client.post_json("/fields", data).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<Value, ApiError> {
        self.client.delete_json(&format!("/fields/{id}")).await
    }
}

/// Owner filters for field-value listing; exactly one is expected per call.
#[derive(Debug, Clone, Default)]
pub struct FieldValueOwner {
    pub person_id: Option<String>,
    pub organization_id: Option<String>,
    pub opportunity_id: Option<String>,
    pub list_entry_id: Option<String>,
}

#[derive(Clone)]
pub struct FieldValuesEndpoint {
    client: AffinityClient,
}

impl FieldValuesEndpoint {
    pub fn new(client: AffinityClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        owner: &FieldValueOwner,
        page_token: Option<&str>,
    ) -> Result<Page<RawRecord>, ApiError> {
        let mut params = RawRecord::new();
        let filters = [
            ("person_id", &owner.person_id),
            ("organization_id", &owner.organization_id),
            ("opportunity_id", &owner.opportunity_id),
            ("list_entry_id", &owner.list_entry_id),
        ];
        for (key, value) in filters {
            if let Some(value) = value {
                params.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        if let Some(token) = page_token {
            params.insert("page_token".to_string(), Value::String(token.to_string()));
        }
        let payload = self.client.get_json("/field-values", &params).await?;
        Ok(page_from_payload(&payload))
    }

    pub async fn update(&self, id: &str, value: &Value) -> Result<RawRecord, ApiError> {
        let body = json!({ "value": value });
        expect_record(
            self.client
                .put_json(&format!("/field-values/{id}"), &body)
                .await?,
        )
    }
}
