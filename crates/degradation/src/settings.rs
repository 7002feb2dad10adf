//! The settings document covering every component.
//!
//! ```json
//! {
//!   "retry": { "strategy": "linear_backoff", "max_retries": 5 },
//!   "memory": { "memory_limit": 1073741824 },
//!   "controller": { "recovery": { "min_stable_time_ms": 120000 } }
//! }
//! ```
//!
//! Every field is optional and falls back to the component default.

use crate::controller::ControllerConfig;
use crate::memory::MemoryMonitorConfig;
use crate::notifier::NotifierConfig;
use excelmind_core::{Error, Result};
use excelmind_resilience::{CircuitBreakerConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub notifier: NotifierConfig,
    pub memory: MemoryMonitorConfig,
    pub controller: ControllerConfig,
}

impl Settings {
    /// Parse and validate a settings document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| Error::json("failed to parse settings document", e))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading settings");
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read settings", e))?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::json("failed to serialize settings", e))
    }

    pub fn validate(&self) -> Result<()> {
        let retry = &self.retry;
        if !(retry.backoff_multiplier.is_finite() && retry.backoff_multiplier > 0.0) {
            return Err(Error::validation(
                "retry.backoff_multiplier",
                "must be a positive number",
            ));
        }

        let breaker = &self.circuit_breaker;
        if !(breaker.failure_threshold > 0.0 && breaker.failure_threshold <= 100.0) {
            return Err(Error::validation(
                "circuit_breaker.failure_threshold",
                "must be within (0, 100]",
            ));
        }
        non_zero("circuit_breaker.sliding_window_size", breaker.sliding_window_size)?;
        non_zero("circuit_breaker.half_open_max_calls", breaker.half_open_max_calls)?;

        non_zero("notifier.max_history_size", self.notifier.max_history_size)?;

        let memory = &self.memory;
        ordered(
            "memory.warning_threshold",
            memory.warning_threshold,
            memory.critical_threshold,
        )?;
        non_zero("memory.monitor_interval_ms", memory.monitor_interval.as_millis())?;
        non_zero("memory.memory_limit", memory.memory_limit)?;
        non_zero("memory.max_history_size", memory.max_history_size)?;

        let controller = &self.controller;
        let t = &controller.thresholds;
        ordered("controller.thresholds.memory_warning", t.memory_warning, t.memory_critical)?;
        ordered(
            "controller.thresholds.file_size_warning",
            t.file_size_warning as f64,
            t.file_size_critical as f64,
        )?;
        ordered(
            "controller.thresholds.api_failure_warning",
            t.api_failure_warning,
            t.api_failure_critical,
        )?;
        ordered(
            "controller.thresholds.execution_warning_secs",
            t.execution_warning_secs,
            t.execution_timeout_secs,
        )?;
        non_zero(
            "controller.recovery.check_interval_ms",
            controller.recovery.check_interval.as_millis(),
        )?;
        non_zero("controller.execution_samples", controller.execution_samples)?;

        Ok(())
    }
}

fn ordered(field: &str, warning: f64, critical: f64) -> Result<()> {
    if warning >= critical {
        return Err(Error::validation(
            field,
            format!("warning ({warning}) must be below critical ({critical})"),
        ));
    }
    Ok(())
}

fn non_zero<N>(field: &str, value: N) -> Result<()>
where
    N: PartialEq + Default,
{
    if value == N::default() {
        return Err(Error::validation(field, "must be greater than zero"));
    }
    Ok(())
}
