use super::context::PlanContext;
use super::events::{ExecutionEvent, StepEvent, StepStatus};
use super::graph::{GraphBuilder, NextRef, NodeAction, NodeRef, TaskGraph, TaskNode};
use super::parser::{PlanInput, PlanParser};
use crate::config::Config;
use crate::error::{HandoffError, InvocationError};
use crate::tools::{DEFAULT_OUTCOME, ToolInvoker, ToolParams, ToolPayload};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Outcome key tried after the exact status and `"success"`.
pub const FALLBACK_OUTCOME: &str = "default";

pub type EventStream = ReceiverStream<ExecutionEvent>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Deadline for a single service call. `None` waits indefinitely.
    pub step_timeout: Option<Duration>,
    /// How many times one node may run when several branches converge on it.
    pub max_node_visits: u32,
    /// Capacity of the event channel handed to the caller.
    pub event_buffer: usize,
    /// Cancel every other branch as soon as one invocation fails.
    pub cancel_siblings_on_error: bool,
    /// Log service results at `info` instead of `debug`.
    pub show_output: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            step_timeout: Some(Duration::from_secs(120)),
            max_node_visits: 1,
            event_buffer: 64,
            cancel_siblings_on_error: false,
            show_output: false,
        }
    }
}

impl ExecutorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            step_timeout: (config.executor.step_timeout_secs > 0)
                .then(|| Duration::from_secs(config.executor.step_timeout_secs)),
            max_node_visits: config.executor.max_node_visits.max(1),
            event_buffer: config.executor.event_buffer.max(1),
            cancel_siblings_on_error: config.executor.cancel_siblings_on_error,
            show_output: config.handoff.show_output,
        }
    }
}

/// Walks a [`TaskGraph`], invoking one service per node and streaming
/// [`ExecutionEvent`]s to the caller.
pub struct PlanExecutor {
    invoker: Arc<dyn ToolInvoker>,
    options: ExecutorOptions,
}

impl PlanExecutor {
    pub fn new(invoker: Arc<dyn ToolInvoker>, options: ExecutorOptions) -> Self {
        Self { invoker, options }
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Parse, build and execute a plan in a background task. A parse or
    /// build failure yields a stream holding a single `Error` event.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(&self, input: impl Into<PlanInput>, cancel: CancellationToken) -> EventStream {
        match prepare(input.into()) {
            Ok(graph) => self.run_graph(graph, cancel),
            Err(error) => {
                tracing::warn!(error = %error, "plan rejected before execution");
                let (tx, rx) = mpsc::channel(1);
                let _ = tx.try_send(ExecutionEvent::Error {
                    msg: error.to_string(),
                });
                ReceiverStream::new(rx)
            }
        }
    }

    /// Execute an already built graph in a background task.
    pub fn run_graph(&self, graph: TaskGraph, cancel: CancellationToken) -> EventStream {
        let (tx, rx) = mpsc::channel(self.options.event_buffer.max(1));
        let invoker = Arc::clone(&self.invoker);
        let options = self.options.clone();
        tokio::spawn(async move {
            let executor = PlanExecutor { invoker, options };
            executor.execute(&graph, &tx, &cancel).await;
        });
        ReceiverStream::new(rx)
    }

    /// Execute `graph` on the current task, sending every event (terminal
    /// one included) to `events`. Returns the accumulated context.
    pub async fn execute(
        &self,
        graph: &TaskGraph,
        events: &mpsc::Sender<ExecutionEvent>,
        cancel: &CancellationToken,
    ) -> PlanContext {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("plan", run_id = %run_id, nodes = graph.len());

        async {
            tracing::info!(start = %graph.start_node().id, "plan execution started");
            let traversal = Traversal {
                graph,
                invoker: self.invoker.as_ref(),
                options: &self.options,
                events,
                cancel,
                context: Mutex::new(PlanContext::new()),
                visits: Mutex::new(HashMap::new()),
            };

            traversal.walk(graph.start()).await;

            let context = traversal
                .context
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner);

            let terminal = if cancel.is_cancelled() {
                tracing::warn!(results = context.len(), "plan execution cancelled");
                ExecutionEvent::Error {
                    msg: "plan execution cancelled".to_string(),
                }
            } else {
                tracing::info!(results = context.len(), "plan execution finished");
                ExecutionEvent::Done {
                    context: context.clone(),
                }
            };
            let _ = events.send(terminal).await;
            context
        }
        .instrument(span)
        .await
    }
}

/// Pick the successor of a node given the outcome key its result resolved
/// to: exact key, then `"success"`, then `"default"`, else terminal.
pub fn resolve_next(next: &NextRef, outcome: &str) -> Option<NodeRef> {
    match next {
        NextRef::Terminal => None,
        NextRef::Direct(target) => Some(*target),
        NextRef::Branch(branches) => branches
            .get(outcome)
            .or_else(|| branches.get(DEFAULT_OUTCOME))
            .or_else(|| branches.get(FALLBACK_OUTCOME))
            .copied(),
    }
}

fn prepare(input: PlanInput) -> Result<TaskGraph, HandoffError> {
    let plan = PlanParser::parse(input)?;
    Ok(GraphBuilder::build(&plan)?)
}

struct Traversal<'a> {
    graph: &'a TaskGraph,
    invoker: &'a dyn ToolInvoker,
    options: &'a ExecutorOptions,
    events: &'a mpsc::Sender<ExecutionEvent>,
    cancel: &'a CancellationToken,
    context: Mutex<PlanContext>,
    visits: Mutex<HashMap<NodeRef, u32>>,
}

impl Traversal<'_> {
    fn walk(&self, from: NodeRef) -> BoxFuture<'_, ()> {
        async move {
            let mut current = Some(from);
            while let Some(node) = current {
                current = self.visit(node).await;
            }
        }
        .boxed()
    }

    async fn visit(&self, node_ref: NodeRef) -> Option<NodeRef> {
        let node = self.graph.node(node_ref);
        if self.cancel.is_cancelled() {
            tracing::debug!(node_id = %node.id, "node abandoned, plan cancelled");
            self.emit_step(node, StepStatus::Error, "cancelled").await;
            return None;
        }

        let Some(visit) = self.claim_visit(node_ref) else {
            tracing::debug!(node_id = %node.id, "visit budget exhausted");
            self.emit_step(node, StepStatus::Skip, "visit budget exhausted")
                .await;
            return None;
        };

        let outcome = match &node.action {
            Some(action) => {
                self.emit_step(node, StepStatus::Start, "").await;
                self.invoke(node, action, visit).await?
            }
            None if node.is_fan_out() => {
                self.emit_step(node, StepStatus::Start, "").await;
                DEFAULT_OUTCOME.to_string()
            }
            None => {
                self.emit_step(node, StepStatus::Skip, "no action").await;
                DEFAULT_OUTCOME.to_string()
            }
        };

        if node.is_fan_out() {
            tracing::debug!(node_id = %node.id, branches = node.parallel.len(), "fanning out");
            join_all(node.parallel.iter().map(|child| self.walk(*child))).await;
            if self.cancel.is_cancelled() {
                return None;
            }
            tracing::debug!(node_id = %node.id, "parallel branches joined");
            if node.action.is_none() {
                let msg = format!("{} parallel branches joined", node.parallel.len());
                self.emit_step(node, StepStatus::Success, msg).await;
            }
        }

        resolve_next(&node.next, &outcome)
    }

    /// Returns the 1-based visit number, or `None` once the budget is spent.
    fn claim_visit(&self, node: NodeRef) -> Option<u32> {
        let mut visits = self.visits.lock().unwrap_or_else(PoisonError::into_inner);
        let count = visits.entry(node).or_insert(0);
        if *count >= self.options.max_node_visits.max(1) {
            return None;
        }
        *count += 1;
        Some(*count)
    }

    async fn invoke(&self, node: &TaskNode, action: &NodeAction, visit: u32) -> Option<String> {
        self.emit_step(
            node,
            StepStatus::Running,
            format!("calling {}", action.agent),
        )
        .await;

        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(InvocationError::Cancelled {
                name: action.agent.clone(),
            }),
            result = self.call_with_deadline(&action.agent, &action.params) => result,
        };

        match result {
            Ok(payload) => {
                let raw = payload.as_raw().to_string();
                let summary = payload.summarize();
                let key = if visit == 1 {
                    node.result_key()
                } else {
                    format!("{}_{visit}", node.result_key())
                };
                self.context
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record(key, raw.clone());

                if self.options.show_output {
                    tracing::info!(node_id = %node.id, agent = %action.agent, outcome = %summary.status, result = %raw, "step succeeded");
                } else {
                    tracing::debug!(node_id = %node.id, agent = %action.agent, outcome = %summary.status, "step succeeded");
                }

                let mut event = StepEvent::new(&node.id, &node.desc, StepStatus::Success, summary.msg);
                event.outcome = Some(summary.status.clone());
                event.raw_result = Some(raw);
                self.emit(ExecutionEvent::Step(event)).await;
                Some(summary.status)
            }
            Err(error) => {
                tracing::warn!(node_id = %node.id, agent = %action.agent, error = %error, "step failed");
                self.emit_step(node, StepStatus::Error, error.to_string())
                    .await;
                if self.options.cancel_siblings_on_error {
                    self.cancel.cancel();
                }
                None
            }
        }
    }

    async fn call_with_deadline(
        &self,
        service: &str,
        params: &ToolParams,
    ) -> Result<ToolPayload, InvocationError> {
        let call = self.invoker.invoke(service, params);
        match self.options.step_timeout {
            Some(deadline) => tokio::time::timeout(deadline, call)
                .await
                .unwrap_or_else(|_| {
                    Err(InvocationError::TimedOut {
                        name: service.to_string(),
                        timeout: deadline,
                    })
                }),
            None => call.await,
        }
    }

    async fn emit_step(&self, node: &TaskNode, status: StepStatus, msg: impl Into<String>) {
        self.emit(ExecutionEvent::Step(StepEvent::new(
            &node.id, &node.desc, status, msg,
        )))
        .await;
    }

    async fn emit(&self, event: ExecutionEvent) {
        if self.events.send(event).await.is_err() && !self.cancel.is_cancelled() {
            // consumer dropped the stream
            tracing::debug!("event receiver closed, cancelling plan");
            self.cancel.cancel();
        }
    }
}
