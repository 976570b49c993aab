use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use handoff::planner::{ExecutionEvent, ExecutorOptions, PlanContext, PlanExecutor, StepStatus};
use handoff::tools::{ToolInvoker, default_registry};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

fn executor(options: ExecutorOptions) -> PlanExecutor {
    let invoker: Arc<dyn ToolInvoker> = Arc::new(default_registry());
    PlanExecutor::new(invoker, options)
}

async fn run(plan: Value) -> Vec<ExecutionEvent> {
    executor(ExecutorOptions::default())
        .run(plan, CancellationToken::new())
        .collect()
        .await
}

fn done_context(events: &[ExecutionEvent]) -> &PlanContext {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "exactly one terminal event");
    match events.last() {
        Some(ExecutionEvent::Done { context }) => context,
        other => panic!("expected done, got {other:?}"),
    }
}

fn started(events: &[ExecutionEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(ExecutionEvent::as_step)
        .filter(|step| step.status == StepStatus::Start)
        .map(|step| step.node_id.as_str())
        .collect()
}

fn first_error(events: &[ExecutionEvent]) -> &handoff::planner::StepEvent {
    events
        .iter()
        .filter_map(ExecutionEvent::as_step)
        .find(|step| step.status == StepStatus::Error)
        .expect("an error step event")
}

#[tokio::test]
async fn linear_plan_runs_in_order() {
    let events = run(json!({"plan": {"start": "s1", "steps": [
        {"id": "s1", "desc": "first", "action": {"agent": "echo", "params": {}}, "next": "s2"},
        {"id": "s2", "desc": "second", "action": {"agent": "echo", "params": {}}}
    ]}}))
    .await;

    assert_eq!(started(&events), vec!["s1", "s2"]);
    let context = done_context(&events);
    assert!(context.contains("s1_result"));
    assert!(context.contains("s2_result"));
}

#[tokio::test]
async fn parallel_branches_both_contribute() {
    let started_at = Instant::now();
    let events = run(json!({"plan": {"start": "s1", "steps": [
        {"id": "s1", "desc": "fan out", "parallel": ["s2", "s3"]},
        {"id": "s2", "desc": "slow", "action": {"agent": "sleep", "params": {"ms": 150}}},
        {"id": "s3", "desc": "slower", "action": {"agent": "sleep", "params": {"ms": 150}}}
    ]}}))
    .await;

    assert!(started_at.elapsed() < Duration::from_millis(290));
    let context = done_context(&events);
    assert_eq!(context.get("s2_result"), Some("slept 150ms"));
    assert_eq!(context.get("s3_result"), Some("slept 150ms"));
}

#[tokio::test]
async fn fail_status_takes_fail_branch() {
    let events = run(json!({"plan": {"start": "s1", "steps": [
        {"id": "s1", "desc": "check", "action": {"agent": "status", "params": {"status": "fail"}},
         "next": {"success": "s3", "fail": "s4"}},
        {"id": "s3", "desc": "happy path", "action": {"agent": "echo", "params": {}}},
        {"id": "s4", "desc": "recovery", "action": {"agent": "echo", "params": {"message": "recovering"}}}
    ]}}))
    .await;

    assert_eq!(started(&events), vec!["s1", "s4"]);
    let context = done_context(&events);
    assert!(context.contains("s4_result"));
    assert!(!context.contains("s3_result"));

    let recovery = events
        .iter()
        .filter_map(ExecutionEvent::as_step)
        .find(|step| step.node_id == "s4" && step.status == StepStatus::Success)
        .unwrap();
    assert_eq!(recovery.msg, "recovering");
}

#[tokio::test]
async fn missing_plan_key_yields_single_error() {
    let events = run(json!({})).await;
    assert_eq!(
        events,
        vec![ExecutionEvent::Error {
            msg: "parse: no `plan` key found in model output".into()
        }]
    );
}

#[tokio::test]
async fn failing_service_keeps_earlier_results() {
    let events = run(json!({"plan": {"steps": [
        {"id": "s1", "desc": "greet", "action": {"agent": "echo", "params": {"message": "hi"}}, "next": "s2"},
        {"id": "s2", "desc": "break", "action": {"agent": "fail", "params": {"reason": "disk full"}}, "next": "s3"},
        {"id": "s3", "desc": "unreached", "action": {"agent": "echo", "params": {}}}
    ]}}))
    .await;

    let error = first_error(&events);
    assert_eq!(error.node_id, "s2");
    assert_eq!(error.msg, "service fail failed: disk full");

    let context = done_context(&events);
    assert_eq!(context.keys().collect::<Vec<_>>(), vec!["s1_result"]);
}

#[tokio::test]
async fn unknown_service_is_an_error_event() {
    let events = run(json!({"plan": {"steps": [
        {"id": "s1", "desc": "call", "action": {"agent": "weather", "params": {}}}
    ]}}))
    .await;

    assert_eq!(first_error(&events).msg, "service weather not found");
    assert!(done_context(&events).is_empty());
}

#[tokio::test]
async fn deadline_applies_to_builtin_sleep() {
    let options = ExecutorOptions {
        step_timeout: Some(Duration::from_millis(30)),
        ..ExecutorOptions::default()
    };
    let events: Vec<_> = executor(options)
        .run(
            json!({"plan": {"steps": [
                {"id": "s1", "desc": "nap", "action": {"agent": "sleep", "params": {"ms": 2000}}}
            ]}}),
            CancellationToken::new(),
        )
        .collect()
        .await;

    assert!(first_error(&events).msg.contains("timed out"));
}

#[tokio::test]
async fn dropping_the_stream_cancels_the_run() {
    let cancel = CancellationToken::new();
    let mut events = executor(ExecutorOptions::default()).run(
        json!({"plan": {"steps": [
            {"id": "s1", "desc": "first", "action": {"agent": "echo", "params": {}}, "next": "s2"},
            {"id": "s2", "desc": "long", "action": {"agent": "sleep", "params": {"ms": 50}}, "next": "s3"},
            {"id": "s3", "desc": "after", "action": {"agent": "echo", "params": {}}}
        ]}}),
        cancel.clone(),
    );

    let first = events.next().await.unwrap();
    assert_eq!(first.as_step().unwrap().node_id, "s1");
    drop(events);

    tokio::time::timeout(Duration::from_secs(2), cancel.cancelled())
        .await
        .expect("run should cancel once the receiver is gone");
}

#[tokio::test]
async fn events_serialize_as_json_lines() {
    let events = run(json!({"plan": {"steps": [
        {"id": "s1", "desc": "say", "action": {"agent": "echo", "params": {"message": "hello"}}}
    ]}}))
    .await;

    let lines: Vec<Value> = events
        .iter()
        .map(|event| serde_json::to_value(event).unwrap())
        .collect();
    assert_eq!(lines[0]["type"], "step");
    assert_eq!(lines[0]["step"], "s1");
    assert_eq!(lines[0]["status"], "start");
    let last = lines.last().unwrap();
    assert_eq!(last["type"], "done");
    assert!(last["context"]["s1_result"].as_str().unwrap().contains("hello"));
}
