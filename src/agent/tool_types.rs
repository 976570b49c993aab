use super::tool_request::ToolCall;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Which iteration ceiling applies to a loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoopMode {
    Streaming,
    #[default]
    NonStreaming,
}

/// Record of a single tool invocation within the loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub args: BTreeMap<String, String>,
    pub success: bool,
    /// Raw result on success, error message on failure.
    pub output: String,
    pub iteration: u32,
}

/// Why the tool loop terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStopReason {
    /// The model answered without requesting tools.
    Completed,
    /// The iteration ceiling was reached while the model still requested tools.
    MaxIterations,
    /// The model call failed; the last produced content is returned.
    Error(String),
}

/// Final output of a [`ToolLoop`](super::ToolLoop) run.
#[derive(Debug, Clone)]
pub struct ToolLoopResult {
    pub final_content: String,
    /// Number of model calls made.
    pub iterations: u32,
    /// Number of iterations that executed tool requests.
    pub tool_rounds: u32,
    pub tool_calls: Vec<ToolCallRecord>,
    pub messages: Vec<ChatMessage>,
    pub stop_reason: LoopStopReason,
}

/// Mutable state of one loop run. Dropped into a [`ToolLoopResult`] when
/// the loop ends.
#[derive(Debug, Clone, Default)]
pub struct LoopState {
    pub messages: Vec<ChatMessage>,
    pub iteration: u32,
    pub tool_rounds: u32,
    pub last_content: String,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl LoopState {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn record_call(&mut self, call: &ToolCall, success: bool, output: impl Into<String>) {
        self.tool_calls.push(ToolCallRecord {
            tool_name: call.name.clone(),
            args: call.args.clone(),
            success,
            output: output.into(),
            iteration: self.iteration,
        });
    }

    /// Append the assistant turn and the synthesized tool-result turn.
    pub fn push_round(&mut self, content: String, results: String) {
        self.messages.push(ChatMessage::assistant(content));
        self.messages.push(ChatMessage::user(results));
        self.tool_rounds += 1;
    }

    pub fn finish(self, stop_reason: LoopStopReason) -> ToolLoopResult {
        ToolLoopResult {
            final_content: self.last_content,
            iterations: self.iteration,
            tool_rounds: self.tool_rounds,
            tool_calls: self.tool_calls,
            messages: self.messages,
            stop_reason,
        }
    }
}
