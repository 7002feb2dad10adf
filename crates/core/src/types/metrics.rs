//! Resource metrics and memory snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource metrics recomputed on every monitoring tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationMetrics {
    /// Memory usage, percent of the runtime budget
    pub memory_usage: f64,
    /// Size of the file currently being processed, bytes
    pub file_size: u64,
    /// API failure rate over the breaker's window, percent
    pub api_failure_rate: f64,
    /// Mean execution time of recent operations, seconds
    pub avg_execution_time: f64,
    pub consecutive_failures: u32,
    pub last_update: DateTime<Utc>,
}

impl DegradationMetrics {
    /// All-zero metrics stamped with the current time
    #[must_use]
    pub fn empty() -> Self {
        Self {
            memory_usage: 0.0,
            file_size: 0,
            api_failure_rate: 0.0,
            avg_execution_time: 0.0,
            consecutive_failures: 0,
            last_update: Utc::now(),
        }
    }
}

impl Default for DegradationMetrics {
    fn default() -> Self {
        Self::empty()
    }
}

/// Point-in-time memory snapshot produced by each sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStatus {
    /// Memory budget, bytes
    pub total: u64,
    /// Memory in use, bytes
    pub used: u64,
    pub usage_percent: f64,
    pub under_pressure: bool,
    /// Probability in `[0, 1]` that the runtime runs out of memory soon
    pub overflow_probability: f64,
    pub last_check: DateTime<Utc>,
}

impl MemoryStatus {
    /// Bytes left before the budget is exhausted
    #[must_use]
    pub fn available(&self) -> u64 {
        self.total.saturating_sub(self.used)
    }
}
