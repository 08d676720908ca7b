//! API-key introspection endpoints.

use serde_json::Value;

use crate::api::{AffinityClient, ApiError};
use crate::record::RawRecord;

#[derive(Clone)]
pub struct AuthEndpoint {
    client: AffinityClient,
}

impl AuthEndpoint {
    pub fn new(client: AffinityClient) -> Self {
        Self { client }
    }

    pub async fn whoami(&self) -> Result<Value, ApiError> {
        self.client.get_json("/auth/whoami", &RawRecord::new()).await
    }

    pub async fn rate_limit(&self) -> Result<Value, ApiError> {
        self.client.get_json("/rate-limit", &RawRecord::new()).await
    }
}
