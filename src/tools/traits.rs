use super::types::{ToolParams, ToolPayload, ToolSpec};
use crate::error::InvocationError;
use async_trait::async_trait;
use serde_json::Value;

/// Performs one unit of work on behalf of a plan step or a tool request.
///
/// This is the only seam through which the executor and the tool loop
/// reach the outside world.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(
        &self,
        service: &str,
        params: &ToolParams,
    ) -> Result<ToolPayload, InvocationError>;
}

/// Core service trait. Implement it for any capability and register it with
/// a [`ServiceRegistry`](super::ServiceRegistry).
#[async_trait]
pub trait Tool: Send + Sync {
    /// Service name (the `agent` field of a plan step, `tool_name` of a request)
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the service with given parameters
    async fn execute(&self, params: ToolParams) -> anyhow::Result<ToolPayload>;

    /// Get the full spec for prompt rendering
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}
