use super::super::{ExecutorConfig, HandoffConfig, LOOP_CEILING_RANGE, ObservabilityConfig};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - resolved at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub handoff: HandoffConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("handoff.max_loop_stream", self.handoff.max_loop_stream),
            ("handoff.max_loop_non_stream", self.handoff.max_loop_non_stream),
        ] {
            if !LOOP_CEILING_RANGE.contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be within {}..={}, got {value}",
                    LOOP_CEILING_RANGE.start(),
                    LOOP_CEILING_RANGE.end()
                )));
            }
        }

        if self.executor.max_node_visits == 0 {
            return Err(ConfigError::Validation(
                "executor.max_node_visits must be at least 1".into(),
            ));
        }
        if self.executor.event_buffer == 0 {
            return Err(ConfigError::Validation(
                "executor.event_buffer must be at least 1".into(),
            ));
        }

        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<tracing::Level, ConfigError> {
        self.observability
            .log_level
            .trim()
            .parse::<tracing::Level>()
            .map_err(|_| {
                ConfigError::Validation(format!(
                    "observability.log_level is not a log level: {}",
                    self.observability.log_level
                ))
            })
    }
}
