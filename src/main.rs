#![warn(clippy::all, clippy::pedantic)]

use anyhow::{Context, Result};
use clap::Parser;
use handoff::Config;
use handoff::app::dispatch;
use handoff::cli::Cli;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

// Events go to stdout, logs to stderr
fn subscriber(level: Level) -> impl tracing::Subscriber + Send + Sync + 'static {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The file's own log level is unknown until it has been loaded.
    let config = tracing::subscriber::with_default(subscriber(Config::bootstrap_log_level()), || {
        Config::load_or_init(cli.config.as_deref())
    })?;

    tracing::subscriber::set_global_default(subscriber(config.log_level()?))
        .context("setting default subscriber failed")?;

    dispatch(cli, Arc::new(config)).await
}
