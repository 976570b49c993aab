use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Accepted values for both loop ceilings.
pub const LOOP_CEILING_RANGE: RangeInclusive<u32> = 1..=20;

fn default_max_loop() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffConfig {
    /// Tool-loop ceiling for streaming conversations
    #[serde(default = "default_max_loop")]
    pub max_loop_stream: u32,
    /// Tool-loop ceiling for non-streaming requests
    #[serde(default = "default_max_loop")]
    pub max_loop_non_stream: u32,
    /// Log every tool result at info level
    #[serde(default)]
    pub show_output: bool,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            max_loop_stream: default_max_loop(),
            max_loop_non_stream: default_max_loop(),
            show_output: false,
        }
    }
}
