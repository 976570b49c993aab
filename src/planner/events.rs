use super::context::PlanContext;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepStatus {
    Start,
    Running,
    Success,
    Error,
    Skip,
}

/// Progress report for one node. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    #[serde(rename = "step")]
    pub node_id: String,
    pub desc: String,
    pub status: StepStatus,
    #[serde(default)]
    pub msg: String,
    /// Outcome key the node's result resolved to, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, rename = "raw", skip_serializing_if = "Option::is_none")]
    pub raw_result: Option<String>,
}

impl StepEvent {
    pub fn new(
        node_id: impl Into<String>,
        desc: impl Into<String>,
        status: StepStatus,
        msg: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            desc: desc.into(),
            status,
            msg: msg.into(),
            outcome: None,
            raw_result: None,
        }
    }
}

/// One item of the live execution stream. Exactly one `Done` or `Error`
/// terminates every stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    Step(StepEvent),
    Done { context: PlanContext },
    Error { msg: String },
}

impl ExecutionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    pub fn as_step(&self) -> Option<&StepEvent> {
        match self {
            Self::Step(step) => Some(step),
            _ => None,
        }
    }
}
