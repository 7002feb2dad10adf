//! Memory monitoring
//!
//! - [`probe`] - Where the "bytes in use" figure comes from
//! - [`types`] - Configuration, risk estimates, trends and events
//! - [`monitor`] - The sampling [`MemoryMonitor`]

pub mod monitor;
pub mod probe;
pub mod types;

pub use monitor::MemoryMonitor;
pub use probe::{ManualMemoryProbe, MemoryProbe, ProcessMemoryProbe};
pub use types::{
    MemoryEvent, MemoryMonitorConfig, MemoryStatistics, MemoryTrend, OperationKind,
    OperationRisk, Recommendation, RiskLevel, TrendDirection,
};
