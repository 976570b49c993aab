//! Local services that need no external provider. Useful for dry-running
//! plans from the CLI and for wiring tests.

use super::traits::Tool;
use super::types::{ToolParams, ToolPayload};
use anyhow::{Context, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

const MAX_SLEEP_MS: u64 = 60_000;

/// Returns its parameters back as a structured success payload.
#[derive(Debug, Default)]
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the given parameters back"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "additionalProperties": true})
    }

    async fn execute(&self, params: ToolParams) -> anyhow::Result<ToolPayload> {
        let content = params
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| Value::Object(params.clone()).to_string(), String::from);
        Ok(ToolPayload::structured(json!({
            "status": "success",
            "data": { "content": content },
            "params": params,
        })))
    }
}

/// Reports whatever outcome it is told to, for exercising conditional edges.
#[derive(Debug, Default)]
pub struct StatusTool;

#[async_trait]
impl Tool for StatusTool {
    fn name(&self) -> &str {
        "status"
    }

    fn description(&self) -> &str {
        "Return the requested outcome as the result status"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {"type": "string", "description": "Outcome key to report"},
                "message": {"type": "string"}
            },
            "required": ["status"]
        })
    }

    async fn execute(&self, params: ToolParams) -> anyhow::Result<ToolPayload> {
        let status = params
            .get("status")
            .and_then(Value::as_str)
            .context("missing required parameter: status")?;
        let mut body = json!({ "status": status });
        if let Some(message) = params.get("message").and_then(Value::as_str) {
            body["message"] = Value::String(message.to_string());
        }
        Ok(ToolPayload::structured(body))
    }
}

/// Waits for `ms` milliseconds before answering.
#[derive(Debug, Default)]
pub struct SleepTool;

#[async_trait]
impl Tool for SleepTool {
    fn name(&self) -> &str {
        "sleep"
    }

    fn description(&self) -> &str {
        "Wait for a number of milliseconds"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"ms": {"type": "integer", "minimum": 0, "maximum": MAX_SLEEP_MS}},
            "required": ["ms"]
        })
    }

    async fn execute(&self, params: ToolParams) -> anyhow::Result<ToolPayload> {
        let ms = params
            .get("ms")
            .and_then(|value| {
                value
                    .as_u64()
                    .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            })
            .context("missing or invalid parameter: ms")?;
        if ms > MAX_SLEEP_MS {
            bail!("ms must be at most {MAX_SLEEP_MS}");
        }
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(ToolPayload::text(format!("slept {ms}ms")))
    }
}

/// Always fails with the given reason.
#[derive(Debug, Default)]
pub struct FailTool;

#[async_trait]
impl Tool for FailTool {
    fn name(&self) -> &str {
        "fail"
    }

    fn description(&self) -> &str {
        "Fail with the given reason"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"reason": {"type": "string"}}})
    }

    async fn execute(&self, params: ToolParams) -> anyhow::Result<ToolPayload> {
        let reason = params
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("requested failure");
        bail!("{reason}")
    }
}

pub fn builtin_tools() -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(EchoTool),
        Box::new(StatusTool),
        Box::new(SleepTool),
        Box::new(FailTool),
    ]
}
