use super::traits::{Tool, ToolInvoker};
use super::types::{ToolParams, ToolPayload, ToolSpec};
use crate::error::InvocationError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Name-keyed registry of services, owned by the composition root.
#[derive(Default)]
pub struct ServiceRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service. Idempotent: an existing entry with the same name
    /// is kept and `false` is returned.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> bool {
        let tool: Arc<dyn Tool> = Arc::from(tool);
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            tracing::debug!(service = %name, "service already registered");
            return false;
        }
        self.tools.insert(name, tool);
        true
    }

    /// Register every service in `tools`, returning the names newly added.
    pub fn register_all(&mut self, tools: Vec<Box<dyn Tool>>) -> Vec<String> {
        let mut added = Vec::new();
        for tool in tools {
            let name = tool.name().to_string();
            if self.register(tool) {
                added.push(name);
            }
        }
        added
    }

    /// Remove a service by name. Returns whether it was present.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Return sorted list of registered service names.
    pub fn service_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Return specs for all registered services, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|tool| tool.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolInvoker for ServiceRegistry {
    async fn invoke(
        &self,
        service: &str,
        params: &ToolParams,
    ) -> Result<ToolPayload, InvocationError> {
        let Some(tool) = self.tools.get(service) else {
            return Err(InvocationError::NotFound {
                name: service.to_string(),
            });
        };

        tool.execute(params.clone())
            .await
            .map_err(|error| InvocationError::Failed {
                name: service.to_string(),
                message: format!("{error:#}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[derive(Debug)]
    struct TestTool {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl Tool for TestTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "test"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _params: ToolParams) -> anyhow::Result<ToolPayload> {
            Ok(ToolPayload::text(self.reply))
        }
    }

    #[derive(Debug)]
    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _params: ToolParams) -> anyhow::Result<ToolPayload> {
            anyhow::bail!("disk on fire")
        }
    }

    #[test]
    fn register_is_idempotent() {
        let mut registry = ServiceRegistry::new();
        assert!(registry.register(Box::new(TestTool {
            name: "file",
            reply: "first",
        })));
        assert!(!registry.register(Box::new(TestTool {
            name: "file",
            reply: "second",
        })));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_original_service() {
        let mut registry = ServiceRegistry::new();
        registry.register(Box::new(TestTool {
            name: "file",
            reply: "first",
        }));
        registry.register(Box::new(TestTool {
            name: "file",
            reply: "second",
        }));

        let payload = registry.invoke("file", &ToolParams::new()).await.unwrap();
        assert_eq!(payload, ToolPayload::text("first"));
    }

    #[test]
    fn register_all_reports_only_new_names() {
        let mut registry = ServiceRegistry::new();
        registry.register(Box::new(TestTool {
            name: "coder",
            reply: "",
        }));

        let added = registry.register_all(vec![
            Box::new(TestTool {
                name: "coder",
                reply: "",
            }),
            Box::new(TestTool {
                name: "app_launcher",
                reply: "",
            }),
        ]);
        assert_eq!(added, vec!["app_launcher"]);
        assert_eq!(registry.service_names(), vec!["app_launcher", "coder"]);
    }

    #[tokio::test]
    async fn invoke_unknown_service_is_not_found() {
        let registry = ServiceRegistry::new();
        let err = registry
            .invoke("nonexistent", &ToolParams::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            InvocationError::NotFound {
                name: "nonexistent".into()
            }
        );
    }

    #[tokio::test]
    async fn invoke_maps_tool_failure() {
        let mut registry = ServiceRegistry::new();
        registry.register(Box::new(BrokenTool));

        let err = registry
            .invoke("broken", &ToolParams::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "service broken failed: disk on fire");
    }

    #[test]
    fn specs_are_sorted_by_name() {
        let mut registry = ServiceRegistry::new();
        registry.register(Box::new(TestTool {
            name: "weather_time",
            reply: "",
        }));
        registry.register(Box::new(BrokenTool));

        let names: Vec<String> = registry.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["broken", "weather_time"]);
    }
}
