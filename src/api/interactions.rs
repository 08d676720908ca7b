//! Interactions endpoint.

use serde_json::Value;

use crate::api::{expect_record, AffinityClient, ApiError};
use crate::record::RawRecord;

#[derive(Clone)]
pub struct InteractionsEndpoint {
    client: AffinityClient,
}

impl InteractionsEndpoint {
    pub fn new(client: AffinityClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &RawRecord) -> Result<Value, ApiError> {
        self.client.get_json("/interactions", params).await
    }

    pub async fn get(&self, id: &str) -> Result<RawRecord, ApiError> {
        expect_record(
            self.client
                .get_json(&format!("/interactions/{id}"), &RawRecord::new())
                .await?,
        )
    }

    pub async fn create(&self, data: &Value) -> Result<RawRecord, ApiError> {
        expect_record(self.client.post_json("/interactions", data).await?)
    }
}
