use serde::{Deserialize, Serialize};

fn default_step_timeout_secs() -> u64 {
    120
}

fn default_max_node_visits() -> u32 {
    1
}

fn default_event_buffer() -> usize {
    64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Per-invocation deadline in seconds; 0 disables it
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    /// Runs allowed per node when parallel branches converge on it
    #[serde(default = "default_max_node_visits")]
    pub max_node_visits: u32,
    /// Capacity of the step event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    #[serde(default)]
    pub cancel_siblings_on_error: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: default_step_timeout_secs(),
            max_node_visits: default_max_node_visits(),
            event_buffer: default_event_buffer(),
            cancel_siblings_on_error: false,
        }
    }
}
