//! Command handlers.
//!
//! Each module owns one subcommand tree. Handlers receive their endpoint
//! wrappers and resolvers pre-wired from `cli::run`, do the work, and hand
//! the result to the output layer.

pub mod auth;
pub mod entity;
pub mod field;
pub mod interaction;
pub mod list;
pub mod note;

use serde_json::Value;

use crate::error::CliError;
use crate::record::RawRecord;

/// Parse a JSON flag value with a usable diagnostic.
pub fn parse_json_arg(input: &str, flag_name: &str) -> Result<Value, CliError> {
    serde_json::from_str(input).map_err(|error| {
        let preview = if input.chars().count() > 50 {
            let head: String = input.chars().take(50).collect();
            format!("{head}...")
        } else {
            input.to_string()
        };
        CliError::Usage(format!(
            "Invalid JSON for {flag_name}: {error}\n  Input: {preview}\n  Tip: Ensure proper JSON format, e.g., '{{\"key\":\"value\"}}' with double quotes"
        ))
    })
}

/// Parse a JSON flag that must hold an object.
pub fn parse_json_record(input: &str, flag_name: &str) -> Result<RawRecord, CliError> {
    match parse_json_arg(input, flag_name)? {
        Value::Object(record) => Ok(record),
        _ => Err(CliError::Usage(format!(
            "Invalid JSON for {flag_name}: expected an object"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_arg_accepts_valid_json() {
        assert_eq!(
            parse_json_arg(r#"{"a":1}"#, "--data").unwrap(),
            json!({ "a": 1 })
        );
    }

    #[test]
    fn test_parse_json_arg_reports_flag_and_preview() {
        let error = parse_json_arg("{broken", "--query").unwrap_err();
        let message = error.to_string();
        assert!(message.contains("--query"));
        assert!(message.contains("{broken"));
    }

    #[test]
    fn test_parse_json_record_rejects_non_objects() {
        assert!(parse_json_record("[1]", "--data").is_err());
        assert!(parse_json_record(r#"{"a":1}"#, "--data").is_ok());
    }
}
