//! Normalized outcome of a backend call.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Synthetic status reported when a call exceeds its deadline.
pub const STATUS_TIMEOUT: u16 = 408;

/// Synthetic status reported for failures that carry no HTTP status.
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Outcome of exactly one backend invocation.
///
/// `success` is true iff `error` is absent. Build values through
/// [`ToolCallResult::ok`] and [`ToolCallResult::failed`] to keep that true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub success: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status_code: u16,
}

impl ToolCallResult {
    pub fn ok(status_code: u16, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status_code,
        }
    }

    pub fn failed(status_code: u16, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            status_code,
        }
    }

    pub fn timeout(error: impl Into<String>) -> Self {
        Self::failed(STATUS_TIMEOUT, error)
    }

    pub fn internal(error: impl Into<String>) -> Self {
        Self::failed(STATUS_INTERNAL_ERROR, error)
    }

    /// Failure for a non-2xx HTTP answer, embedding status and body.
    pub fn http_error(status_code: u16, body: &str) -> Self {
        Self::failed(status_code, format!("HTTP {}: {}", status_code, body))
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "success": false,
                "error": e.to_string(),
                "status_code": STATUS_INTERNAL_ERROR
            })
        })
    }
}

/// Keeps a present-but-null `data` as `Some(Value::Null)` so it survives a round trip.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Parses a 2xx body as JSON, falling back to the raw text.
pub fn parse_body(text: String) -> Value {
    match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_serializes_without_error_field() {
        let result = ToolCallResult::ok(200, json!({"x": 1}));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"success": true, "data": {"x": 1}, "status_code": 200})
        );
    }

    #[test]
    fn test_failed_has_no_data() {
        let result = ToolCallResult::http_error(404, "not here");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error.as_deref(), Some("HTTP 404: not here"));
        assert_eq!(result.status_code, 404);
    }

    #[test]
    fn test_synthetic_codes() {
        assert_eq!(ToolCallResult::timeout("slow").status_code, 408);
        assert_eq!(ToolCallResult::internal("boom").status_code, 500);
    }

    #[test]
    fn test_round_trip_through_pretty_text() {
        for original in [
            ToolCallResult::ok(200, json!({"x": 1, "nested": [1, 2, {"a": null}]})),
            ToolCallResult::ok(204, Value::Null),
            ToolCallResult::ok(200, Value::String("plain text".into())),
            ToolCallResult::failed(503, "HTTP 503: unavailable"),
        ] {
            let text = serde_json::to_string_pretty(&original).unwrap();
            let parsed: ToolCallResult = serde_json::from_str(&text).unwrap();
            assert_eq!(parsed, original);
        }
    }

    #[test]
    fn test_parse_body_falls_back_to_text() {
        assert_eq!(parse_body("{\"a\":1}".into()), json!({"a": 1}));
        assert_eq!(parse_body("not json".into()), json!("not json"));
        assert_eq!(parse_body(String::new()), json!(""));
    }
}
