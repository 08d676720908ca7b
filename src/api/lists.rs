//! Lists and list-entry endpoints.

use serde_json::{json, Number, Value};

use crate::api::{expect_record, AffinityClient, ApiError};
use crate::pagination::{page_from_payload, Page};
use crate::record::RawRecord;

#[derive(Clone)]
pub struct ListsEndpoint {
    client: AffinityClient,
}

impl ListsEndpoint {
    pub fn new(client: AffinityClient) -> Self {
        Self { client }
    }

    pub async fn list_all(&self, page_token: Option<&str>) -> Result<Page<RawRecord>, ApiError> {
        let mut params = RawRecord::new();
        if let Some(token) = page_token {
            params.insert("page_token".to_string(), Value::String(token.to_string()));
        }
        let payload = self.client.get_json("/lists", &params).await?;
        Ok(page_from_payload(&payload))
    }

    pub async fn get(&self, id: &str) -> Result<RawRecord, ApiError> {
        expect_record(
            self.client
                .get_json(&format!("/lists/{id}"), &RawRecord::new())
                .await?,
        )
    }

    /// Create a dynamic list. `is_private` inverts into the API's `public`
    /// flag and is omitted when unset.
    pub async fn create(
        &self,
        name: &str,
        entity_type: &str,
        is_private: Option<bool>,
    ) -> Result<RawRecord, ApiError> {
        let mut body = json!({
            "name": name,
            "entity_type": entity_type,
            "list_type": "dynamic"
        });
        if let Some(is_private) = is_private {
            body["public"] = Value::Bool(!is_private);
        }
        expect_record(self.client.post_json("/lists", &body).await?)
    }
}

#[derive(Clone)]
pub struct EntriesEndpoint {
    client: AffinityClient,
}

impl EntriesEndpoint {
    pub fn new(client: AffinityClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        list_id: &str,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<Page<RawRecord>, ApiError> {
        let mut params = RawRecord::new();
        if let Some(token) = page_token {
            params.insert("page_token".to_string(), Value::String(token.to_string()));
        }
        if let Some(size) = page_size {
            params.insert("page_size".to_string(), Value::Number(Number::from(size)));
        }
        let payload = self
            .client
            .get_json(&format!("/lists/{list_id}/list-entries"), &params)
            .await?;
        Ok(page_from_payload(&payload))
    }

    pub async fn get(&self, list_id: &str, entry_id: &str) -> Result<RawRecord, ApiError> {
        expect_record(
            self.client
                .get_json(
                    &format!("/lists/{list_id}/list-entries/{entry_id}"),
                    &RawRecord::new(),
                )
                .await?,
        )
    }

    pub async fn add(&self, list_id: &str, entity_id: &str) -> Result<RawRecord, ApiError> {
        let body = json!({ "entity_id": entity_id });
        expect_record(
            self.client
                .post_json(&format!("/lists/{list_id}/list-entries"), &body)
                .await?,
        )
    }

    pub async fn delete(&self, list_id: &str, entry_id: &str) -> Result<Value, ApiError> {
        self.client
            .delete_json(&format!("/lists/{list_id}/list-entries/{entry_id}"))
            .await
    }
}
