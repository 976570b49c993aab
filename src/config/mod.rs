pub mod schema;

pub use schema::{Config, ExecutorConfig, HandoffConfig, ObservabilityConfig};
