use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `handoff` - execute model-authored plans and bounded tool-call loops.
#[derive(Parser, Debug)]
#[command(name = "handoff")]
#[command(author = "theonlyhennygod")]
#[command(version = "0.1.0")]
#[command(about = "Execute model-authored plan graphs against local services.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.handoff/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a plan and print step events as JSON lines
    Run {
        /// Plan file (JSON, or model output containing the JSON)
        plan: PathBuf,

        /// Per-step deadline in seconds (0 disables, default from config)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Parse and build a plan without executing it
    Check {
        /// Plan file
        plan: PathBuf,
    },

    /// Drive the tool loop with scripted model responses
    Replay {
        /// JSON file: {"messages": [...], "responses": ["...", ...]}
        script: PathBuf,

        /// Use the streaming ceiling instead of the non-streaming one
        #[arg(long)]
        stream: bool,

        /// Print the full conversation as JSON instead of the final answer
        #[arg(long)]
        transcript: bool,
    },

    /// List registered services
    Services {
        /// Print the planning and tool-request instructions for a model
        #[arg(long)]
        prompt: bool,
    },
}
