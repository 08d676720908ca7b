//! Notes endpoint.

use serde_json::{Number, Value};

use crate::api::{expect_record, AffinityClient, ApiError};
use crate::pagination::{page_from_payload, Page};
use crate::record::RawRecord;

/// Filters and paging for note listing.
#[derive(Debug, Clone, Default)]
pub struct NoteListParams {
    pub person_id: Option<String>,
    pub organization_id: Option<String>,
    pub opportunity_id: Option<String>,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

#[derive(Clone)]
pub struct NotesEndpoint {
    client: AffinityClient,
}

impl NotesEndpoint {
    pub fn new(client: AffinityClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &NoteListParams) -> Result<Page<RawRecord>, ApiError> {
        let mut query = RawRecord::new();
        if let Some(person_id) = &params.person_id {
            query.insert("person_id".to_string(), Value::String(person_id.clone()));
        }
        if let Some(organization_id) = &params.organization_id {
            query.insert(
                "organization_id".to_string(),
                Value::String(organization_id.clone()),
            );
        }
        if let Some(opportunity_id) = &params.opportunity_id {
            query.insert(
                "opportunity_id".to_string(),
                Value::String(opportunity_id.clone()),
            );
        }
        if let Some(page_size) = params.page_size {
            query.insert("page_size".to_string(), Value::Number(Number::from(page_size)));
        }
        if let Some(page_token) = &params.page_token {
            query.insert("page_token".to_string(), Value::String(page_token.clone()));
        }

        let payload = self.client.get_json("/notes", &query).await?;
        Ok(page_from_payload(&payload))
    }

    pub async fn get(&self, id: &str) -> Result<RawRecord, ApiError> {
        expect_record(
            self.client
                .get_json(&format!("/notes/{id}"), &RawRecord::new())
                .await?,
        )
    }

    pub async fn create(&self, data: &Value) -> Result<RawRecord, ApiError> {
        expect_record(self.client.post_json("/notes", data).await?)
    }

    pub async fn update(&self, id: &str, data: &Value) -> Result<RawRecord, ApiError> {
        expect_record(self.client.put_json(&format!("/notes/{id}"), data).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<Value, ApiError> {
        self.client.delete_json(&format!("/notes/{id}")).await
    }
}
