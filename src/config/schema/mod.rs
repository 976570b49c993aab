mod core;
mod executor;
mod handoff;
mod observability;

pub use core::Config;
pub use executor::ExecutorConfig;
pub use handoff::{HandoffConfig, LOOP_CEILING_RANGE};
pub use observability::ObservabilityConfig;
