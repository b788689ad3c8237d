//! Wire shapes exchanged with the relay
//!
//! The generic execution path takes an RPC payload; the dedicated employee
//! path takes a narrower query body. Replies come back either as a
//! success/failure envelope or as raw text the relay never wrapped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generic RPC payload executed by the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcPayload {
    pub model: String,
    pub method: String,
    pub args: Vec<Value>,
    pub kwargs: serde_json::Map<String, Value>,
}

impl RpcPayload {
    pub fn new(model: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            method: method.into(),
            args: Vec::new(),
            kwargs: serde_json::Map::new(),
        }
    }

    pub fn arg(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }
}

/// Body of a dedicated employee lookup call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<i64>,
}

/// Reply envelope on the request/response path
///
/// `success: true` carries `result`; failures carry `error` and/or
/// `message`. Anything that does not deserialize into this shape is
/// treated as raw text, not a hard error.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ReplyEnvelope {
    /// Best failure text available from the envelope
    pub fn failure_text(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "relay reported failure without a message".to_string())
    }
}

/// Interpreted relay reply
#[derive(Debug, Clone)]
pub enum RelayReply {
    /// Envelope present with `success: true`
    Success(Value),
    /// Envelope present with `success: false`
    Failure(String),
    /// No recognizable envelope; body passed through verbatim
    Raw(String),
}

/// Interpret a response body into a tagged reply
///
/// A body only counts as an envelope when it is a JSON object carrying at
/// least one of the envelope keys; a bare JSON value (or non-JSON text)
/// falls through to `Raw`.
pub fn interpret_reply(body: &str) -> RelayReply {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return RelayReply::Raw(body.to_string()),
    };

    let Some(object) = parsed.as_object() else {
        return RelayReply::Raw(body.to_string());
    };

    if !object.contains_key("success")
        && !object.contains_key("error")
        && !object.contains_key("message")
    {
        return RelayReply::Raw(body.to_string());
    }

    match serde_json::from_value::<ReplyEnvelope>(parsed) {
        Ok(envelope) if envelope.success => {
            RelayReply::Success(envelope.result.unwrap_or(Value::Null))
        }
        Ok(envelope) => RelayReply::Failure(envelope.failure_text()),
        Err(_) => RelayReply::Raw(body.to_string()),
    }
}

/// Phrases indicating a requested model/capability is absent upstream
///
/// Matched case-insensitively as substrings of either the envelope error
/// text or the raw body. Deliberately narrow: broad phrases like "not
/// found" would misclassify ordinary empty-result errors.
const CAPABILITY_ABSENT_PHRASES: &[&str] = &[
    "doesn't exist",
    "does not exist",
    "object ai.assistant",
    "no such model",
    "unknown method",
];

/// Whether a failure text signals a capability-absent condition
pub fn is_capability_absent(text: &str) -> bool {
    let lower = text.to_lowercase();
    CAPABILITY_ABSENT_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

/// One frame received over the persistent connection
///
/// Chunked assistant replies set `stream` with a `stream_id`; the final
/// chunk sets `done`. Frames without the stream flag are standalone
/// messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamFrame {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub stream_id: Option<String>,
    #[serde(default)]
    pub done: bool,
}

/// Typed event emitted by the persistent connection's read loop
#[derive(Debug, Clone)]
pub enum RelayEvent {
    Opened,
    /// Raw text of one inbound frame, in arrival order
    Frame(String),
    Error(String),
    Closed,
}

/// Lifecycle state of the persistent connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rpc_payload_serialization() {
        let payload = RpcPayload::new("sale.order", "read_group")
            .arg(json!([["date_order", ">=", "2024-01-01"]]))
            .kwarg("limit", json!(10));
        let serialized = serde_json::to_value(&payload).unwrap();
        assert_eq!(serialized["model"], "sale.order");
        assert_eq!(serialized["method"], "read_group");
        assert_eq!(serialized["kwargs"]["limit"], 10);
    }

    #[test]
    fn test_employee_query_skips_absent_fields() {
        let query = EmployeeQuery {
            name: Some("Kogut".into()),
            limit: 20,
            department: None,
        };
        let json = serde_json::to_string(&query).unwrap();
        assert!(json.contains("\"name\":\"Kogut\""));
        assert!(!json.contains("department"));
    }

    #[test]
    fn test_interpret_success_envelope() {
        let reply = interpret_reply(r#"{"success": true, "result": [1, 2]}"#);
        assert!(matches!(reply, RelayReply::Success(Value::Array(_))));
    }

    #[test]
    fn test_interpret_failure_envelope_prefers_error() {
        let reply = interpret_reply(r#"{"success": false, "error": "boom", "message": "other"}"#);
        match reply {
            RelayReply::Failure(text) => assert_eq!(text, "boom"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_interpret_non_json_is_raw() {
        let reply = interpret_reply("Internal Server Error");
        assert!(matches!(reply, RelayReply::Raw(_)));
    }

    #[test]
    fn test_interpret_json_without_envelope_keys_is_raw() {
        let reply = interpret_reply(r#"{"rows": []}"#);
        assert!(matches!(reply, RelayReply::Raw(_)));
    }

    #[test]
    fn test_capability_absent_detection() {
        assert!(is_capability_absent("Object ai.assistant doesn't exist"));
        assert!(is_capability_absent("NO SUCH MODEL: ai.assistant"));
        assert!(!is_capability_absent("record not found"));
    }

    #[test]
    fn test_stream_frame_defaults() {
        let frame: StreamFrame =
            serde_json::from_str(r#"{"role": "assistant", "content": "hi"}"#).unwrap();
        assert!(!frame.stream);
        assert!(!frame.done);
        assert!(frame.stream_id.is_none());
    }
}
