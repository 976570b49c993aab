use super::model::ModelCaller;
use super::tool_request::{
    TOOL_RESULT_SEPARATOR, ToolCall, parse_tool_calls, render_error, render_result,
};
use super::tool_types::{ChatMessage, LoopMode, LoopState, LoopStopReason, ToolLoopResult};
use crate::config::{HandoffConfig, schema::LOOP_CEILING_RANGE};
use crate::tools::ToolInvoker;
use std::sync::Arc;
use tracing::Instrument;

/// Absolute upper bound on tool-loop iterations, regardless of caller request.
pub(crate) const TOOL_LOOP_HARD_CAP: u32 = *LOOP_CEILING_RANGE.end();

/// Alternates model calls with rounds of tool execution until the model
/// stops requesting tools or the ceiling for the chosen mode is reached.
pub struct ToolLoop {
    invoker: Arc<dyn ToolInvoker>,
    max_stream: u32,
    max_non_stream: u32,
    show_output: bool,
}

impl ToolLoop {
    pub fn new(invoker: Arc<dyn ToolInvoker>, max_stream: u32, max_non_stream: u32) -> Self {
        Self {
            invoker,
            max_stream: max_stream.clamp(1, TOOL_LOOP_HARD_CAP),
            max_non_stream: max_non_stream.clamp(1, TOOL_LOOP_HARD_CAP),
            show_output: false,
        }
    }

    pub fn from_config(invoker: Arc<dyn ToolInvoker>, config: &HandoffConfig) -> Self {
        let mut tool_loop = Self::new(invoker, config.max_loop_stream, config.max_loop_non_stream);
        tool_loop.show_output = config.show_output;
        tool_loop
    }

    pub fn max_iterations(&self, mode: LoopMode) -> u32 {
        match mode {
            LoopMode::Streaming => self.max_stream,
            LoopMode::NonStreaming => self.max_non_stream,
        }
    }

    pub async fn run(
        &self,
        messages: Vec<ChatMessage>,
        model: &dyn ModelCaller,
        mode: LoopMode,
    ) -> ToolLoopResult {
        self.run_with_limit(messages, model, self.max_iterations(mode))
            .instrument(tracing::info_span!("tool_loop", mode = %mode))
            .await
    }

    /// Run with an explicit ceiling on model calls. Never fails: a model
    /// error or an exhausted ceiling ends the loop with the last content.
    pub async fn run_with_limit(
        &self,
        messages: Vec<ChatMessage>,
        model: &dyn ModelCaller,
        max_iterations: u32,
    ) -> ToolLoopResult {
        let mut state = LoopState::new(messages);

        while state.iteration < max_iterations {
            let content = match model.complete(&state.messages).await {
                Ok(content) => content,
                Err(error) => {
                    tracing::warn!(iteration = state.iteration, error = %error, "model call failed");
                    return state.finish(LoopStopReason::Error(format!("{error:#}")));
                }
            };
            state.iteration += 1;
            state.last_content.clone_from(&content);

            let calls = parse_tool_calls(&content);
            if calls.is_empty() {
                tracing::debug!(iteration = state.iteration, "model answered without tool requests");
                return state.finish(LoopStopReason::Completed);
            }

            tracing::debug!(iteration = state.iteration, requests = calls.len(), "executing tool requests");
            let results = self.execute_calls(&calls, &mut state).await;
            state.push_round(content, results);
        }

        tracing::warn!(max_iterations, "tool loop reached its iteration ceiling");
        state.finish(LoopStopReason::MaxIterations)
    }

    /// Run each request in order and render the follow-up turn. Failures
    /// become inline error text.
    async fn execute_calls(&self, calls: &[ToolCall], state: &mut LoopState) -> String {
        let mut rendered = Vec::with_capacity(calls.len());

        for call in calls {
            match self.invoker.invoke(&call.name, &call.params()).await {
                Ok(payload) => {
                    let raw = payload.as_raw().to_string();
                    if self.show_output {
                        tracing::info!(tool = %call.name, result = %raw, "tool succeeded");
                    } else {
                        tracing::debug!(tool = %call.name, "tool succeeded");
                    }
                    rendered.push(render_result(&call.name, &raw));
                    state.record_call(call, true, raw);
                }
                Err(error) => {
                    tracing::warn!(tool = %call.name, error = %error, "tool failed");
                    let message = error.to_string();
                    rendered.push(render_error(&call.name, &message));
                    state.record_call(call, false, message);
                }
            }
        }

        rendered.join(TOOL_RESULT_SEPARATOR)
    }
}
