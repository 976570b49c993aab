pub mod builtin;
pub mod registry;
pub mod traits;
pub mod types;

pub use builtin::builtin_tools;
pub use registry::ServiceRegistry;
pub use traits::{Tool, ToolInvoker};
pub use types::{DEFAULT_OUTCOME, ResultSummary, ToolParams, ToolPayload, ToolSpec};

/// Registry populated with the built-in local services.
pub fn default_registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    let added = registry.register_all(builtin_tools());
    tracing::debug!(services = ?added, "registered built-in services");
    registry
}
