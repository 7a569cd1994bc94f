//! Request DTOs for the transient server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The transient name
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds, 0 for a permanent entry (uses default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The transient name
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}

/// Query string for the GET operation (GET /get/:key)
///
/// - `regenerator`: registered regenerator to use (defaults to one named like the key)
/// - `args`: comma-separated string arguments passed to the regenerator
/// - `ttl`: TTL for the regenerated value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetQuery {
    pub regenerator: Option<String>,
    pub args: Option<String>,
    pub ttl: Option<u64>,
}

impl GetQuery {
    /// Splits `args` into ordered JSON string arguments.
    pub fn parsed_args(&self) -> Vec<Value> {
        match self.args.as_deref() {
            None | Some("") => Vec::new(),
            Some(args) => args
                .split(',')
                .map(|arg| Value::String(arg.trim().to_string()))
                .collect(),
        }
    }
}

/// Checks a key taken from a path or body.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": {"items": [1, 2]}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, json!({"items": [1, 2]}));
        assert!(req.ttl.is_none());
    }

    #[test]
    fn test_set_request_with_ttl() {
        let json = r#"{"key": "test", "value": "hello", "ttl": 60}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, Some(60));
    }

    #[test]
    fn test_validate_empty_key() {
        let req = SetRequest {
            key: "".to_string(),
            value: json!("test"),
            ttl: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_long_key() {
        assert!(validate_key(&"x".repeat(MAX_KEY_LENGTH + 1)).is_some());
        assert!(validate_key(&"x".repeat(MAX_KEY_LENGTH)).is_none());
    }

    #[test]
    fn test_parsed_args() {
        let query = GetQuery {
            args: Some("ada, grace".to_string()),
            ..Default::default()
        };
        assert_eq!(query.parsed_args(), vec![json!("ada"), json!("grace")]);
        assert!(GetQuery::default().parsed_args().is_empty());
    }
}
