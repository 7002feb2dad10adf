//! Domain types shared by the resilience and degradation crates

pub mod metrics;
pub mod mode;
pub mod notification;
pub mod warning;

pub use metrics::{DegradationMetrics, MemoryStatus};
pub use mode::{DegradationLevel, DegradationMode};
pub use notification::{DegradationNotification, NotificationKind};
pub use warning::WarningKind;
