use crate::agent::{ChatMessage, LoopMode, ScriptedModel, ToolLoop, ToolLoopResult};
use crate::agent::tool_request::request_format_prompt;
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::planner::{
    ExecutionEvent, ExecutorOptions, GraphBuilder, PlanExecutor, PlanParser, TaskGraph,
};
use crate::tools::{ServiceRegistry, ToolInvoker, default_registry};
use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Input of `handoff replay`: the opening conversation and the model
/// responses to play back, one per loop iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub responses: Vec<String>,
}

impl ReplayScript {
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read replay script {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse replay script")
    }
}

/// Parse and build the plan stored at `path`.
pub async fn load_plan(path: &Path) -> Result<TaskGraph> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read plan file {}", path.display()))?;
    let plan = PlanParser::parse(contents)?;
    Ok(GraphBuilder::build(&plan)?)
}

/// Run the tool loop over a scripted model against `registry`.
pub async fn replay(
    config: &Config,
    registry: Arc<ServiceRegistry>,
    script: ReplayScript,
    mode: LoopMode,
) -> ToolLoopResult {
    let invoker: Arc<dyn ToolInvoker> = registry;
    let tool_loop = ToolLoop::from_config(invoker, &config.handoff);
    let model = ScriptedModel::new(script.responses);
    tool_loop.run(script.messages, &model, mode).await
}

async fn run_plan(config: &Config, path: &Path, timeout: Option<u64>) -> Result<()> {
    let graph = match load_plan(path).await {
        Ok(graph) => graph,
        Err(error) => {
            let event = ExecutionEvent::Error {
                msg: format!("{error:#}"),
            };
            println!("{}", serde_json::to_string(&event)?);
            return Err(error);
        }
    };

    let mut options = ExecutorOptions::from_config(config);
    if let Some(secs) = timeout {
        options.step_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    let invoker: Arc<dyn ToolInvoker> = Arc::new(default_registry());
    let executor = PlanExecutor::new(invoker, options);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling plan");
            on_interrupt.cancel();
        }
    });

    let mut events = executor.run_graph(graph, cancel);
    let mut failure = None;
    while let Some(event) = events.next().await {
        println!("{}", serde_json::to_string(&event)?);
        if let ExecutionEvent::Error { msg } = &event {
            failure = Some(msg.clone());
        }
    }

    match failure {
        Some(msg) => bail!("plan execution failed: {msg}"),
        None => Ok(()),
    }
}

pub async fn dispatch(cli: Cli, config: Arc<Config>) -> Result<()> {
    match cli.command {
        Commands::Run { plan, timeout } => run_plan(&config, &plan, timeout).await,

        Commands::Check { plan } => {
            let graph = load_plan(&plan).await?;
            let fan_out = graph.nodes().iter().filter(|node| node.is_fan_out()).count();
            println!(
                "plan ok: {} steps, start {}, {fan_out} fan-out points",
                graph.len(),
                graph.start_node().id
            );
            Ok(())
        }

        Commands::Replay {
            script,
            stream,
            transcript,
        } => {
            let script = ReplayScript::load(&script).await?;
            let mode = if stream {
                LoopMode::Streaming
            } else {
                LoopMode::NonStreaming
            };
            let result = replay(&config, Arc::new(default_registry()), script, mode).await;
            info!(
                iterations = result.iterations,
                tool_rounds = result.tool_rounds,
                stop_reason = ?result.stop_reason,
                "tool loop complete"
            );

            if transcript {
                println!("{}", serde_json::to_string_pretty(&result.messages)?);
            } else {
                println!("{}", result.final_content);
            }
            Ok(())
        }

        Commands::Services { prompt } => {
            let registry = default_registry();
            let specs = registry.specs();
            if prompt {
                println!("{}", PlanParser::schema_prompt(&specs));
                println!("{}", request_format_prompt(&specs));
            } else {
                for spec in &specs {
                    println!("{:<8} {}", spec.name, spec.description);
                }
            }
            Ok(())
        }
    }
}
