use std::time::Duration;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `handoff`.
///
/// Plan decoding and graph construction fail before any execution begins;
/// invocation failures are recovered at the node boundary and only surface
/// here when a caller invokes a service directly. Application glue (CLI,
/// config loading) uses `anyhow::Result` for context chains.
#[derive(Debug, Error)]
pub enum HandoffError {
    // ── Plan decoding ───────────────────────────────────────────────────
    #[error("parse: {0}")]
    Parse(#[from] ParseError),

    // ── Graph construction ──────────────────────────────────────────────
    #[error("graph: {0}")]
    Graph(#[from] GraphError),

    // ── Service invocation ──────────────────────────────────────────────
    #[error("invocation: {0}")]
    Invocation(#[from] InvocationError),

    // ── Config ──────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Plan decoding errors ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid plan JSON: {0}")]
    InvalidJson(String),

    #[error("no `plan` key found in model output")]
    MissingPlan,

    #[error("plan must have at least one step")]
    EmptySteps,

    #[error("malformed plan: {0}")]
    Malformed(String),
}

// ─── Graph construction errors ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("step {from} references unknown step: {target}")]
    DanglingReference { from: String, target: String },

    #[error("no resolvable start step{}", .requested.as_deref().map(|id| format!(" (requested: {id})")).unwrap_or_default())]
    NoStart { requested: Option<String> },

    #[error("cycle detected: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    #[error("duplicate plan step id: {0}")]
    DuplicateStep(String),

    #[error("plan step id cannot be empty")]
    EmptyStepId,
}

// ─── Invocation errors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("service {name} not found")]
    NotFound { name: String },

    #[error("service {name} failed: {message}")]
    Failed { name: String, message: String },

    #[error("service {name} timed out after {timeout:?}")]
    TimedOut { name: String, timeout: Duration },

    #[error("service {name} cancelled")]
    Cancelled { name: String },
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, HandoffError>;
