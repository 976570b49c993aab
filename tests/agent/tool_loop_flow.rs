use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use handoff::agent::tool_request::{TOOL_RESULT_SEPARATOR, ToolCall};
use handoff::agent::{
    ChatMessage, LoopMode, LoopStopReason, MessageRole, ModelCaller, ScriptedModel, ToolLoop,
};
use handoff::config::HandoffConfig;
use handoff::tools::{ToolInvoker, ToolParams, ToolPayload};
use handoff::InvocationError;

/// Answers every tool request with `"<name> ok"` and remembers the order.
#[derive(Default)]
struct NamedInvoker {
    calls: Mutex<Vec<String>>,
}

impl NamedInvoker {
    fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ToolInvoker for NamedInvoker {
    async fn invoke(
        &self,
        service: &str,
        _params: &ToolParams,
    ) -> Result<ToolPayload, InvocationError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(service.to_string());
        Ok(ToolPayload::text(format!("{service} ok")))
    }
}

/// A model that never stops asking for tools.
#[derive(Default)]
struct StubbornModel {
    calls: AtomicU32,
}

#[async_trait]
impl ModelCaller for StubbornModel {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!(
            "attempt {n}\n{}{}",
            ToolCall::new("search").with_arg("q", "more").to_block(),
            ToolCall::new("search").to_block()
        ))
    }
}

fn tool_loop(invoker: &Arc<NamedInvoker>, config: &HandoffConfig) -> ToolLoop {
    let invoker: Arc<dyn ToolInvoker> = Arc::clone(invoker) as Arc<dyn ToolInvoker>;
    ToolLoop::from_config(invoker, config)
}

#[tokio::test]
async fn two_requests_are_answered_in_one_follow_up_turn() {
    let invoker = Arc::new(NamedInvoker::default());
    let first = format!(
        "I'll use two tools.\n{}\n{}",
        ToolCall::new("A").to_block(),
        ToolCall::new("B").to_block()
    );
    let model = ScriptedModel::new([first, "Both finished.".to_string()]);

    let result = tool_loop(&invoker, &HandoffConfig::default())
        .run(
            vec![ChatMessage::system("be brief"), ChatMessage::user("go")],
            &model,
            LoopMode::NonStreaming,
        )
        .await;

    assert_eq!(invoker.calls(), vec!["A", "B"]);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.stop_reason, LoopStopReason::Completed);
    assert_eq!(result.final_content, "Both finished.");

    let follow_up = result.messages.last().unwrap();
    assert_eq!(follow_up.role, MessageRole::User);
    let parts: Vec<_> = follow_up.content.split(TOOL_RESULT_SEPARATOR).collect();
    assert_eq!(
        parts,
        vec!["Result from tool \"A\":\nA ok", "Result from tool \"B\":\nB ok"]
    );
}

#[tokio::test]
async fn stubborn_model_stops_at_streaming_ceiling() {
    let invoker = Arc::new(NamedInvoker::default());
    let model = StubbornModel::default();
    let config = HandoffConfig {
        max_loop_stream: 4,
        max_loop_non_stream: 9,
        show_output: false,
    };

    let result = tool_loop(&invoker, &config)
        .run(vec![ChatMessage::user("find it")], &model, LoopMode::Streaming)
        .await;

    assert_eq!(result.stop_reason, LoopStopReason::MaxIterations);
    assert_eq!(result.iterations, 4);
    assert_eq!(model.calls.load(Ordering::SeqCst), 4);
    assert!(result.final_content.starts_with("attempt 4"));
    assert_eq!(invoker.calls().len(), 8);
    // the opening turn plus an assistant/user pair per round
    assert_eq!(result.messages.len(), 1 + 2 * 4);
}

#[tokio::test]
async fn malformed_blocks_never_reach_the_invoker() {
    let invoker = Arc::new(NamedInvoker::default());
    let content = "<<<[TOOL_REQUEST]>>>\nquery: 「始」no name「末」\n<<<[END_TOOL_REQUEST]>>>\n\
                   <<<[TOOL_REQUEST]>>>\ntool_name: 「始」dangling「末」";
    let model = ScriptedModel::new([content]);

    let result = tool_loop(&invoker, &HandoffConfig::default())
        .run(Vec::new(), &model, LoopMode::NonStreaming)
        .await;

    assert!(invoker.calls().is_empty());
    assert_eq!(result.stop_reason, LoopStopReason::Completed);
    assert_eq!(result.final_content, content);
}
