//! Configuration and result types for the memory monitor.

use excelmind_core::{
    config::duration_ms, DegradationLevel, MemoryStatus, DEFAULT_MEMORY_LIMIT_BYTES,
    MEMORY_CRITICAL_PERCENT, MEMORY_WARNING_PERCENT,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryMonitorConfig {
    /// Usage percent at which memory counts as under pressure
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    /// Usage percent at which a sample triggers cleanup
    pub cleanup_threshold: f64,
    #[serde(rename = "monitor_interval_ms", with = "duration_ms")]
    pub monitor_interval: Duration,
    /// Budget usage is measured against, in bytes
    pub memory_limit: u64,
    /// Samples kept for trend and statistics
    pub max_history_size: usize,
    /// Wait between a forced cleanup and the follow-up sample
    #[serde(rename = "cleanup_settle_ms", with = "duration_ms")]
    pub cleanup_settle: Duration,
    /// Multiplier applied to projected usage in overflow prediction
    pub safety_margin: f64,
}

impl Default for MemoryMonitorConfig {
    fn default() -> Self {
        Self {
            warning_threshold: MEMORY_WARNING_PERCENT,
            critical_threshold: MEMORY_CRITICAL_PERCENT,
            cleanup_threshold: 70.0,
            monitor_interval: Duration::from_millis(5000),
            memory_limit: DEFAULT_MEMORY_LIMIT_BYTES,
            max_history_size: 100,
            cleanup_settle: Duration::from_millis(1000),
            safety_margin: 1.2,
        }
    }
}

/// Workbook processing stage, each with its own memory cost per row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Parse,
    Transform,
    Export,
}

impl OperationKind {
    pub const fn bytes_per_row(self) -> u64 {
        match self {
            OperationKind::Parse => 500,
            OperationKind::Transform => 800,
            OperationKind::Export => 600,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OperationKind::Parse => "parse",
            OperationKind::Transform => "transform",
            OperationKind::Export => "export",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Proceed,
    Caution,
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationRisk {
    pub risk_level: RiskLevel,
    /// Extra bytes the operation is expected to need
    pub estimated_memory: u64,
    pub recommended: Recommendation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryTrend {
    pub direction: TrendDirection,
    /// MiB per minute between the first and last sample in the window
    pub rate_mb_per_min: f64,
    pub samples: usize,
}

impl MemoryTrend {
    pub(crate) fn stable() -> Self {
        Self {
            direction: TrendDirection::Stable,
            rate_mb_per_min: 0.0,
            samples: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStatistics {
    pub average_usage: f64,
    pub peak_usage: f64,
    pub current_usage: f64,
    /// Recorded samples taken under pressure
    pub pressure_count: usize,
}

/// Published to [`crate::MemoryMonitor::on_event`] subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryEvent {
    Pressure {
        level: DegradationLevel,
        usage_percent: f64,
        status: MemoryStatus,
    },
    Cleanup {
        status: MemoryStatus,
    },
}
