//! Plan parsing, graph construction and concurrent execution.

pub mod context;
pub mod events;
pub mod executor;
pub mod graph;
pub mod parser;
pub mod types;

pub use context::PlanContext;
pub use events::{ExecutionEvent, StepEvent, StepStatus};
pub use executor::{EventStream, ExecutorOptions, FALLBACK_OUTCOME, PlanExecutor, resolve_next};
pub use graph::{GraphBuilder, NextRef, NodeAction, NodeRef, TaskGraph, TaskNode};
pub use parser::{PlanInput, PlanParser};
pub use types::{NextStep, Plan, PlanStep, StepAction};
