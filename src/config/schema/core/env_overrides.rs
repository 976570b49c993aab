use super::Config;

impl Config {
    /// Log level taken from `HANDOFF_LOG_LEVEL` alone, for logging that
    /// happens before the config file has been read. Falls back to `info`.
    pub fn bootstrap_log_level() -> tracing::Level {
        std::env::var("HANDOFF_LOG_LEVEL")
            .ok()
            .and_then(|level| level.trim().parse::<tracing::Level>().ok())
            .unwrap_or(tracing::Level::INFO)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("HANDOFF_MAX_LOOP_STREAM")
            && let Ok(limit) = value.trim().parse::<u32>()
        {
            self.handoff.max_loop_stream = limit;
        }

        if let Ok(value) = std::env::var("HANDOFF_MAX_LOOP_NON_STREAM")
            && let Ok(limit) = value.trim().parse::<u32>()
        {
            self.handoff.max_loop_non_stream = limit;
        }

        if let Ok(value) = std::env::var("HANDOFF_STEP_TIMEOUT_SECS")
            && let Ok(secs) = value.trim().parse::<u64>()
        {
            self.executor.step_timeout_secs = secs;
        }

        if let Ok(level) = std::env::var("HANDOFF_LOG_LEVEL")
            && !level.trim().is_empty()
        {
            self.observability.log_level = level.trim().to_string();
        }
    }
}
