//! Command-level errors and their terminal rendering.

use serde_json::{Map, Value};

use crate::api::ApiError;

/// Errors surfaced to the user by the binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{0}")]
    Usage(String),
}

const REDACTED_VALUE: &str = "[REDACTED]";

const SENSITIVE_KEY_PATTERNS: [&str; 8] = [
    "token",
    "authorization",
    "api_key",
    "apikey",
    "password",
    "secret",
    "cookie",
    "set-cookie",
];

fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.to_lowercase();
    SENSITIVE_KEY_PATTERNS
        .iter()
        .any(|pattern| normalized.contains(pattern))
}

/// Replace credential-bearing values anywhere in a payload before it is
/// printed.
pub fn redact_sensitive(value: &Value) -> Value {
    match value {
        Value::Array(entries) => Value::Array(entries.iter().map(redact_sensitive).collect()),
        Value::Object(obj) => {
            let mut out = Map::new();
            for (key, nested) in obj {
                let redacted = if is_sensitive_key(key) {
                    Value::String(REDACTED_VALUE.to_string())
                } else {
                    redact_sensitive(nested)
                };
                out.insert(key.clone(), redacted);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn hint_for_status(status: u16) -> Option<&'static str> {
    match status {
        401 => Some("Check your API key with: affinity auth whoami"),
        403 => Some("Your API key may not have permission for this operation"),
        404 => Some("The requested resource was not found. Verify the ID is correct."),
        429 => Some("Rate limit exceeded. Check limits with: affinity auth rate-limit"),
        500.. => Some("Affinity API server error. Try again in a moment."),
        _ => None,
    }
}

/// One-shot error rendering for `main`: the message, a resolution hint for
/// known statuses, and (verbose only) the redacted response payload.
pub fn render(error: &CliError, verbose: bool) -> String {
    let CliError::Api(api_error) = error else {
        return format!("Error: {error}");
    };

    let mut message = format!("Error: {api_error}");
    if let ApiError::Api {
        status,
        payload,
        request_id,
    } = api_error
    {
        if let Some(hint) = hint_for_status(*status) {
            message.push_str(&format!("\n  Hint: {hint}"));
        }
        if let Some(request_id) = request_id {
            message.push_str(&format!("\n  Request ID: {request_id}"));
        }
        if verbose {
            if let Some(payload) = payload {
                let rendered = serde_json::to_string_pretty(&redact_sensitive(payload))
                    .unwrap_or_else(|_| payload.to_string());
                message.push_str(&format!("\n  Payload: {rendered}"));
            }
        }
    }
    message
}
