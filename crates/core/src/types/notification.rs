//! User-facing notifications emitted on degradation changes

use super::mode::DegradationMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Visual severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload handed to notification subscribers (toasts, banners)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub current_mode: DegradationMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_actions: Vec<String>,
    /// Auto-dismiss delay; `None` keeps the notification until dismissed
    #[serde(with = "crate::config::option_duration_ms", default)]
    pub duration: Option<Duration>,
}

impl DegradationNotification {
    /// Whether the notification stays on screen until dismissed
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.duration.is_none()
    }
}
