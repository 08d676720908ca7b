//! Relationship-strength endpoint.

use serde_json::Value;

use crate::api::{AffinityClient, ApiError};
use crate::record::RawRecord;

#[derive(Clone)]
pub struct RelationshipStrengthsEndpoint {
    client: AffinityClient,
}

impl RelationshipStrengthsEndpoint {
    pub fn new(client: AffinityClient) -> Self {
        Self { client }
    }

    /// Relationship strengths for an external person. The route answers a
    /// bare array; anything else yields no strengths, and loose non-record
    /// entries are dropped.
    pub async fn list_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Vec<RawRecord>, ApiError> {
        let mut params = RawRecord::new();
        params.insert(
            "external_id".to_string(),
            Value::String(external_id.to_string()),
        );
        let payload = self
            .client
            .get_json("/relationships-strengths", &params)
            .await?;

        let Value::Array(entries) = payload else {
            return Ok(Vec::new());
        };
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect())
    }
}
