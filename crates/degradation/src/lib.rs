//! Graceful degradation for ExcelMind
//!
//! Work runs in one of three modes: in the browser, split between browser
//! and backend, or entirely on the backend. This crate decides which.
//!
//! - [`memory`] - Memory sampling, overflow prediction and trends
//! - [`policy`] - Thresholds and the [`TransitionPolicy`] seam
//! - [`notifier`] - Events, user notifications and mode-change history
//! - [`health`] - Health check scoring
//! - [`controller`] - [`DegradationController`], tying it all together
//! - [`settings`] - The JSON settings document
//!
//! ## Example
//!
//! ```rust,no_run
//! use excelmind_degradation::{ControllerConfig, DegradationController};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let controller = Arc::new(DegradationController::with_defaults(ControllerConfig::default()));
//! let _sub = controller.notifier().on_notification(|n| println!("{}: {}", n.title, n.message));
//! controller.start_monitoring();
//!
//! controller.record_file_size(25 * 1024 * 1024);
//! let decision = controller.check_degradation();
//! println!("{} -> {:?}", decision.reason, controller.current_mode());
//! # }
//! ```

pub mod controller;
pub mod health;
pub mod memory;
pub mod notifier;
pub mod policy;
pub mod settings;

pub use controller::{
    level_for_mode, ControllerConfig, ControllerStatistics, DegradationController,
    DegradationState, RecoveryConfig,
};
pub use health::{HealthCheck, HealthCheckResult, HealthChecks, HEALTHY_SCORE};
pub use memory::{
    ManualMemoryProbe, MemoryEvent, MemoryMonitor, MemoryMonitorConfig, MemoryProbe,
    MemoryStatistics, MemoryTrend, OperationKind, OperationRisk, ProcessMemoryProbe,
    Recommendation, RiskLevel, TrendDirection,
};
pub use notifier::{DegradationNotifier, NotifierConfig, WarningContext};
pub use policy::{
    DegradationDecision, DegradationThresholds, ThresholdPolicy, TransitionPolicy,
    TriggeredThreshold,
};
pub use settings::Settings;
