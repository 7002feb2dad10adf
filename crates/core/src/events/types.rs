//! Degradation event records

use crate::types::{DegradationLevel, DegradationMetrics, DegradationMode, WarningKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationEventKind {
    ModeChanged,
    WarningTriggered,
    MetricsUpdated,
    RecoveryAttempt,
    RecoverySuccess,
}

impl DegradationEventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DegradationEventKind::ModeChanged => "mode_changed",
            DegradationEventKind::WarningTriggered => "warning_triggered",
            DegradationEventKind::MetricsUpdated => "metrics_updated",
            DegradationEventKind::RecoveryAttempt => "recovery_attempt",
            DegradationEventKind::RecoverySuccess => "recovery_success",
        }
    }
}

impl fmt::Display for DegradationEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    ModeChange {
        reason: String,
        metrics: Option<DegradationMetrics>,
    },
    Warning {
        warning: WarningKind,
        level: DegradationLevel,
        metrics: Option<DegradationMetrics>,
    },
    Metrics {
        metrics: DegradationMetrics,
    },
    Recovery {
        reason: String,
    },
}

/// Immutable record appended to the notifier's event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationEvent {
    pub kind: DegradationEventKind,
    pub timestamp: DateTime<Utc>,
    pub from_mode: Option<DegradationMode>,
    pub to_mode: Option<DegradationMode>,
    pub message: String,
    pub payload: EventPayload,
}

/// Mode-change record kept for later inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationHistory {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_kind: DegradationEventKind,
    pub from_mode: DegradationMode,
    pub to_mode: DegradationMode,
    pub reason: String,
    pub metrics_snapshot: DegradationMetrics,
}
