//! Affinity v1 API client.
//!
//! Direct HTTP via reqwest. Every request carries the API key (HTTP Basic
//! with an empty username by default, Bearer on request) and retries
//! rate-limit and upstream-failure statuses with exponential backoff.
//!
//! Modules:
//! - auth: whoami and rate-limit introspection
//! - entities: persons / organizations / opportunities
//! - fields: field definitions and field values
//! - interactions, lists, notes, relationships: their namesake resources

pub mod auth;
pub mod entities;
pub mod fields;
pub mod interactions;
pub mod lists;
pub mod notes;
pub mod relationships;

use std::time::Duration;

use base64::Engine;
use serde_json::Value;
use url::Url;

use crate::config::{ApiConfig, AuthMode};
use crate::record::RawRecord;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from Affinity API operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing AFFINITY_API_KEY or --api-key flag")]
    MissingApiKey,
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Affinity API request failed ({status})")]
    Api {
        status: u16,
        payload: Option<Value>,
        request_id: Option<String>,
    },
    #[error("Unexpected response shape: expected {0}")]
    UnexpectedShape(&'static str),
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 300,
            max_backoff_ms: 5_000,
        }
    }
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 502 | 503 | 504)
}

fn retry_delay(
    attempt: u32,
    policy: &RetryPolicy,
    retry_after: Option<&reqwest::header::HeaderValue>,
) -> Duration {
    if let Some(value) = retry_after.and_then(|v| v.to_str().ok()) {
        if let Ok(secs) = value.parse::<u64>() {
            return Duration::from_secs(secs.min(30));
        }
    }

    let exponent = 2u64.saturating_pow(attempt);
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    let jitter = (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0))
        % 250;
    Duration::from_millis(base.saturating_add(jitter))
}

/// Flatten scalar params into query pairs. Null values are omitted, matching
/// how the CLI builds optional parameters.
fn query_pairs(params: &RawRecord) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.clone(), rendered))
        })
        .collect()
}

/// HTTP client for the Affinity v1 API. Cheap to clone; endpoint wrappers
/// each hold their own copy.
#[derive(Clone)]
pub struct AffinityClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    auth_mode: AuthMode,
    retry: RetryPolicy,
}

impl AffinityClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| ApiError::InvalidBaseUrl(config.base_url.clone()))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
            auth_mode: config.auth_mode,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint_url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| ApiError::InvalidBaseUrl(format!("{}{path}", self.base_url)))
    }

    fn authorization(&self) -> Result<String, ApiError> {
        let key = self.api_key.as_deref().ok_or(ApiError::MissingApiKey)?;
        Ok(match self.auth_mode {
            AuthMode::Bearer => format!("Bearer {key}"),
            AuthMode::Basic => {
                let encoded =
                    base64::engine::general_purpose::STANDARD.encode(format!(":{key}"));
                format!("Basic {encoded}")
            }
        })
    }

    pub async fn get_json(&self, path: &str, params: &RawRecord) -> Result<Value, ApiError> {
        let request = self
            .http
            .get(self.endpoint_url(path)?)
            .query(&query_pairs(params));
        self.send(request).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let request = self.http.post(self.endpoint_url(path)?).json(body);
        self.send(request).await
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let request = self.http.put(self.endpoint_url(path)?).json(body);
        self.send(request).await
    }

    pub async fn delete_json(&self, path: &str) -> Result<Value, ApiError> {
        let request = self.http.delete(self.endpoint_url(path)?);
        self.send(request).await
    }

    /// Send with retry on 429/502/503/504. The request is rebuilt from a
    /// clone per attempt; requests in this client never carry streaming
    /// bodies, so cloning always succeeds.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let request = request
            .header(reqwest::header::AUTHORIZATION, self.authorization()?)
            .header(reqwest::header::ACCEPT, "application/json");

        let max_attempts = self.retry.max_retries + 1;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let Some(cloned) = request.try_clone() else {
                let response = request.send().await?;
                return self.finish(response).await;
            };

            let response = cloned.send().await?;
            let status = response.status();
            if is_retryable_status(status) && attempt < max_attempts {
                let delay = retry_delay(
                    attempt,
                    &self.retry,
                    response.headers().get(reqwest::header::RETRY_AFTER),
                );
                log::warn!(
                    "affinity api retry {attempt}/{} after status {status} (sleep {delay:?})",
                    self.retry.max_retries
                );
                tokio::time::sleep(delay).await;
                continue;
            }
            return self.finish(response).await;
        }
    }

    async fn finish(&self, response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let request_id = response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let payload = response.json::<Value>().await.ok();
            return Err(ApiError::Api {
                status: status.as_u16(),
                payload,
                request_id,
            });
        }

        let text = response.text().await?;
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Coerce a payload into an object record; the API returns a JSON object for
/// every single-entity route.
pub fn expect_record(payload: Value) -> Result<RawRecord, ApiError> {
    match payload {
        Value::Object(record) => Ok(record),
        _ => Err(ApiError::UnexpectedShape("object")),
    }
}
