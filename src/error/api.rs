//! Structured API errors
//!
//! The API does not use one fixed error schema. A body may carry:
//! - `message` as a plain string,
//! - `message.detail[]` as a list of `{type, loc[], msg, input}` validation records,
//! - a top-level `detail` string (authorization failures).

use serde_json::{Map, Value};
use std::fmt;

/// A non-retryable 4xx response: status code plus the raw JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    code: u16,
    content: Option<Map<String, Value>>,
}

impl ApiError {
    pub fn new(code: u16, content: Option<Map<String, Value>>) -> Self {
        Self { code, content }
    }

    /// Build from raw body bytes; a body that is not a JSON object is dropped.
    pub fn from_body(code: u16, body: &[u8]) -> Self {
        let content = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            });
        Self::new(code, content)
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn content(&self) -> Option<&Map<String, Value>> {
        self.content.as_ref()
    }

    /// The `type` field of the body, e.g. `invalid_request_error`.
    pub fn error_type(&self) -> Option<&str> {
        self.content
            .as_ref()?
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
    }

    /// Human-readable details, in body order.
    pub fn details(&self) -> Vec<String> {
        let Some(content) = &self.content else {
            return Vec::new();
        };

        match content.get("message") {
            Some(Value::String(msg)) => return vec![msg.clone()],
            Some(Value::Object(message)) => {
                if let Some(Value::Array(entries)) = message.get("detail") {
                    return entries.iter().map(format_detail).collect();
                }
            }
            _ => {}
        }

        match content.get("detail") {
            Some(Value::String(detail)) => vec![detail.clone()],
            _ => Vec::new(),
        }
    }
}

fn format_detail(entry: &Value) -> String {
    let field = |name: &str| entry.get(name).and_then(Value::as_str).unwrap_or_default();

    let mut out = String::new();
    let kind = field("type");
    if !kind.is_empty() {
        out.push_str(kind);
        out.push_str(": ");
    }
    out.push_str(field("msg"));

    let loc: Vec<String> = entry
        .get("loc")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .map(|part| match part {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    if !loc.is_empty() {
        out.push_str(" (");
        out.push_str(&loc.join("."));
        out.push(')');
    }
    out
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details = self.details().join("; ");
        let body = match (self.error_type(), details.is_empty()) {
            (Some(kind), false) => format!("{kind}: {details}"),
            (Some(kind), true) => kind.to_string(),
            (None, false) => details,
            (None, true) => "unknown API error".to_string(),
        };

        if self.code == 0 {
            f.write_str(&body)
        } else {
            write!(f, "[{}] {}", self.code, body)
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn formats_structured_detail() {
        let err = ApiError::new(
            400,
            body(json!({
                "object": "error",
                "message": {
                    "detail": [{
                        "type": "extra_forbidden",
                        "loc": ["body", "parallel_tool_calls"],
                        "msg": "Extra inputs are not permitted",
                        "input": true
                    }]
                },
                "type": "invalid_request_error",
                "param": null,
                "code": null
            })),
        );

        assert_eq!(
            err.to_string(),
            "[400] invalid_request_error: extra_forbidden: Extra inputs are not permitted (body.parallel_tool_calls)"
        );
    }

    #[test]
    fn joins_multiple_details_with_semicolons() {
        let err = ApiError::from_body(
            400,
            br#"{
                "object": "error",
                "message": {"detail": [
                    {"type": "extra_forbidden", "loc": ["body", "parallel_tool_calls"], "msg": "Extra inputs are not permitted", "input": true},
                    {"type": "missing_required", "loc": ["body", "messages"], "msg": "Missing required property: messages", "input": false}
                ]},
                "type": "invalid_request_error",
                "param": null,
                "code": null
            }"#,
        );

        assert_eq!(
            err.to_string(),
            "[400] invalid_request_error: extra_forbidden: Extra inputs are not permitted (body.parallel_tool_calls); missing_required: Missing required property: messages (body.messages)"
        );
    }

    #[test]
    fn string_message_is_sole_detail() {
        let err = ApiError::new(
            400,
            body(json!({
                "object": "error",
                "message": "This model does not support output_dimension.",
                "type": "invalid_request_invalid_args",
                "param": null,
                "code": "3051"
            })),
        );

        assert_eq!(
            err.to_string(),
            "[400] invalid_request_invalid_args: This model does not support output_dimension."
        );
    }

    #[test]
    fn top_level_detail_without_type() {
        let err = ApiError::new(401, body(json!({"detail": "Unauthorized"})));
        assert_eq!(err.to_string(), "[401] Unauthorized");
    }

    #[test]
    fn numeric_loc_entries_and_zero_code() {
        let err = ApiError::new(
            0,
            body(json!({
                "message": {"detail": [{"type": "missing", "loc": ["body", "messages", 0, "content"], "msg": "Field required"}]}
            })),
        );
        assert_eq!(err.to_string(), "missing: Field required (body.messages.0.content)");
    }

    #[test]
    fn non_json_body_is_dropped() {
        let err = ApiError::from_body(404, b"<html>not found</html>");
        assert!(err.content().is_none());
        assert_eq!(err.to_string(), "[404] unknown API error");
    }
}
