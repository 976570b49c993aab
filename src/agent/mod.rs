//! Bounded tool-call loop driven by free-text model output.

pub mod model;
pub mod tool_loop;
pub mod tool_request;
pub mod tool_types;

pub use model::{ModelCaller, ScriptedModel};
pub use tool_loop::ToolLoop;
pub use tool_request::{ToolCall, parse_tool_calls};
pub use tool_types::{
    ChatMessage, LoopMode, LoopState, LoopStopReason, MessageRole, ToolCallRecord, ToolLoopResult,
};
