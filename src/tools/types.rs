use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named parameters handed to a service.
pub type ToolParams = serde_json::Map<String, Value>;

/// Outcome key used when a result carries no decodable `status`.
pub const DEFAULT_OUTCOME: &str = "success";

/// Service description exposed to the model through the plan schema prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Result returned by a service: plain text or a structured object.
///
/// A structured payload keeps the exact text it was decoded from, so the
/// plan context stores what the service sent and not a re-encoding of it.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolPayload {
    Structured { raw: String, value: Value },
    Text(String),
}

impl ToolPayload {
    /// Decode raw service output, falling back to plain text when it is not
    /// a JSON object.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value @ Value::Object(_)) => Self::Structured { raw, value },
            _ => Self::Text(raw),
        }
    }

    /// Wrap a value built in-process; its raw form is the compact encoding.
    pub fn structured(value: Value) -> Self {
        Self::Structured {
            raw: value.to_string(),
            value,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Raw string form, as stored in the plan context.
    pub fn as_raw(&self) -> &str {
        match self {
            Self::Text(raw) | Self::Structured { raw, .. } => raw,
        }
    }

    pub fn summarize(&self) -> ResultSummary {
        ResultSummary::from_payload(self)
    }
}

impl From<String> for ToolPayload {
    fn from(raw: String) -> Self {
        Self::from_raw(raw)
    }
}

impl From<Value> for ToolPayload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::from_raw(text),
            other => Self::structured(other),
        }
    }
}

/// Human-readable message and outcome key extracted from a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSummary {
    pub msg: String,
    pub status: String,
}

impl ResultSummary {
    /// `msg` prefers `data.content`, then `message`, then the stringified
    /// `status`, then the raw text. `status` defaults to `"success"`.
    pub fn from_payload(payload: &ToolPayload) -> Self {
        let ToolPayload::Structured { raw, value } = payload else {
            return Self {
                msg: payload.as_raw().to_string(),
                status: DEFAULT_OUTCOME.to_string(),
            };
        };

        let status = value
            .get("status")
            .and_then(value_as_label)
            .unwrap_or_else(|| DEFAULT_OUTCOME.to_string());

        let msg = value
            .get("data")
            .and_then(|data| data.get("content"))
            .and_then(non_empty_label)
            .or_else(|| value.get("message").and_then(non_empty_label))
            .or_else(|| value.get("status").and_then(value_as_label))
            .unwrap_or_else(|| raw.clone());

        Self { msg, status }
    }
}

fn value_as_label(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn non_empty_label(value: &Value) -> Option<String> {
    value_as_label(value).filter(|label| !label.is_empty())
}
