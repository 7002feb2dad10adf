//! Degradation events, user notifications and mode-change history.
//!
//! The notifier is the single publisher of [`DegradationEvent`]s and
//! [`DegradationNotification`]s. Every publish appends to a bounded event
//! log, fans out to event listeners, then to notification listeners, all
//! synchronously and in registration order.

use crate::policy::DegradationThresholds;
use chrono::Utc;
use excelmind_core::{
    config::duration_ms, DegradationEvent, DegradationEventKind, DegradationHistory,
    DegradationLevel, DegradationMetrics, DegradationMode, DegradationNotification, EventPayload,
    ListenerSet, NotificationKind, Subscription, WarningKind, DEFAULT_MAX_HISTORY_SIZE,
    NOTIFICATION_DURATION_MS, RECOVERY_ATTEMPT_DURATION_MS,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Log every event and notification through `tracing`
    pub log_events: bool,
    /// Keep mode-change history records
    pub persist_history: bool,
    /// Bound for both the event log and the history
    pub max_history_size: usize,
    #[serde(rename = "notification_duration_ms", with = "duration_ms")]
    pub notification_duration: Duration,
    #[serde(rename = "recovery_attempt_duration_ms", with = "duration_ms")]
    pub recovery_attempt_duration: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            log_events: true,
            persist_history: true,
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            notification_duration: Duration::from_millis(NOTIFICATION_DURATION_MS),
            recovery_attempt_duration: Duration::from_millis(RECOVERY_ATTEMPT_DURATION_MS),
        }
    }
}

/// Extra data attached to a warning
#[derive(Debug, Clone, Default)]
pub struct WarningContext {
    /// Mode to report in the notification; `Browser` when unknown
    pub current_mode: Option<DegradationMode>,
    pub metrics: Option<DegradationMetrics>,
}

pub struct DegradationNotifier {
    config: NotifierConfig,
    thresholds: DegradationThresholds,
    notifications: ListenerSet<DegradationNotification>,
    events: ListenerSet<DegradationEvent>,
    event_log: Mutex<VecDeque<DegradationEvent>>,
    history: Mutex<VecDeque<DegradationHistory>>,
}

impl std::fmt::Debug for DegradationNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradationNotifier")
            .field("config", &self.config)
            .field("notification_listeners", &self.notifications.len())
            .field("event_listeners", &self.events.len())
            .field("events", &self.event_log.lock().len())
            .field("history", &self.history.lock().len())
            .finish()
    }
}

impl Default for DegradationNotifier {
    fn default() -> Self {
        Self::new(NotifierConfig::default())
    }
}

impl DegradationNotifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self::with_thresholds(config, DegradationThresholds::default())
    }

    /// Use custom limits for the warnings raised by [`DegradationNotifier::broadcast_metrics`]
    pub fn with_thresholds(config: NotifierConfig, thresholds: DegradationThresholds) -> Self {
        debug!(
            max_history_size = config.max_history_size,
            persist_history = config.persist_history,
            "Degradation notifier initialized"
        );
        Self {
            config,
            thresholds,
            notifications: ListenerSet::new("notifications"),
            events: ListenerSet::new("degradation_events"),
            event_log: Mutex::new(VecDeque::new()),
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    pub fn on_notification<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&DegradationNotification) + Send + Sync + 'static,
    {
        self.notifications.subscribe(callback)
    }

    pub fn on_event<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&DegradationEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn notify_mode_change(
        &self,
        from: DegradationMode,
        to: DegradationMode,
        reason: &str,
        metrics: Option<&DegradationMetrics>,
    ) {
        let event = DegradationEvent {
            kind: DegradationEventKind::ModeChanged,
            timestamp: Utc::now(),
            from_mode: Some(from),
            to_mode: Some(to),
            message: format!("Mode changed from {from} to {to}"),
            payload: EventPayload::ModeChange {
                reason: reason.to_string(),
                metrics: metrics.cloned(),
            },
        };
        let timestamp = event.timestamp;
        self.publish_event(event);

        let downgrade = from.is_downgrade_to(to);
        self.publish_notification(DegradationNotification {
            kind: if downgrade {
                NotificationKind::Warning
            } else {
                NotificationKind::Success
            },
            title: format!("Switched to {}", to.title()),
            message: format!("{reason}\n\n{}", to.description()),
            current_mode: to,
            suggested_actions: to.suggested_actions(),
            duration: if downgrade {
                None
            } else {
                Some(self.config.notification_duration)
            },
        });

        self.record_history(DegradationHistory {
            id: Uuid::new_v4(),
            timestamp,
            event_kind: DegradationEventKind::ModeChanged,
            from_mode: from,
            to_mode: to,
            reason: reason.to_string(),
            metrics_snapshot: metrics.cloned().unwrap_or_else(DegradationMetrics::empty),
        });
    }

    pub fn notify_warning(
        &self,
        kind: WarningKind,
        message: &str,
        level: DegradationLevel,
        context: WarningContext,
    ) {
        let critical = level == DegradationLevel::Critical;
        let title = format!("{kind} Warning");
        let suggested_actions = kind.suggested_actions();

        self.publish_event(DegradationEvent {
            kind: DegradationEventKind::WarningTriggered,
            timestamp: Utc::now(),
            from_mode: None,
            to_mode: None,
            message: message.to_string(),
            payload: EventPayload::Warning {
                warning: kind,
                level,
                metrics: context.metrics,
            },
        });

        self.publish_notification(DegradationNotification {
            kind: if critical {
                NotificationKind::Error
            } else {
                NotificationKind::Warning
            },
            title,
            message: message.to_string(),
            current_mode: context.current_mode.unwrap_or(DegradationMode::Browser),
            suggested_actions,
            duration: if critical {
                None
            } else {
                Some(self.config.notification_duration)
            },
        });
    }

    /// Publish fresh metrics and warn about any that cross a threshold
    pub fn broadcast_metrics(&self, metrics: &DegradationMetrics) {
        self.broadcast_metrics_in(None, metrics);
    }

    /// Same as [`DegradationNotifier::broadcast_metrics`], reporting warnings against `mode`
    pub fn broadcast_metrics_in(&self, mode: Option<DegradationMode>, metrics: &DegradationMetrics) {
        self.publish_event(DegradationEvent {
            kind: DegradationEventKind::MetricsUpdated,
            timestamp: Utc::now(),
            from_mode: None,
            to_mode: None,
            message: "Metrics updated".to_string(),
            payload: EventPayload::Metrics {
                metrics: metrics.clone(),
            },
        });

        self.check_metric_thresholds(mode, metrics);
    }

    fn check_metric_thresholds(&self, mode: Option<DegradationMode>, metrics: &DegradationMetrics) {
        let t = &self.thresholds;
        let level = |critical: bool| {
            if critical {
                DegradationLevel::Critical
            } else {
                DegradationLevel::Warning
            }
        };
        let context = || WarningContext {
            current_mode: mode,
            metrics: Some(metrics.clone()),
        };

        if metrics.memory_usage > t.memory_warning {
            self.notify_warning(
                WarningKind::Memory,
                &format!("High memory usage: {:.1}%", metrics.memory_usage),
                level(metrics.memory_usage > t.memory_critical),
                context(),
            );
        }

        if metrics.api_failure_rate > t.api_failure_warning {
            self.notify_warning(
                WarningKind::Api,
                &format!("High API failure rate: {:.1}%", metrics.api_failure_rate),
                level(metrics.api_failure_rate > t.api_failure_critical),
                context(),
            );
        }

        if metrics.avg_execution_time > t.execution_warning_secs {
            self.notify_warning(
                WarningKind::Execution,
                &format!("Slow execution: {:.1}s average", metrics.avg_execution_time),
                level(metrics.avg_execution_time > t.execution_timeout_secs),
                context(),
            );
        }
    }

    pub fn notify_recovery_attempt(&self, target: DegradationMode, reason: &str) {
        self.publish_event(DegradationEvent {
            kind: DegradationEventKind::RecoveryAttempt,
            timestamp: Utc::now(),
            from_mode: None,
            to_mode: Some(target),
            message: format!("Attempting recovery to {target} mode"),
            payload: EventPayload::Recovery {
                reason: reason.to_string(),
            },
        });

        self.publish_notification(DegradationNotification {
            kind: NotificationKind::Info,
            title: "Recovery Attempt".to_string(),
            message: format!("Attempting to recover to {target} mode: {reason}"),
            current_mode: target,
            suggested_actions: Vec::new(),
            duration: Some(self.config.recovery_attempt_duration),
        });
    }

    pub fn notify_recovery_success(&self, from: DegradationMode, to: DegradationMode, reason: &str) {
        let event = DegradationEvent {
            kind: DegradationEventKind::RecoverySuccess,
            timestamp: Utc::now(),
            from_mode: Some(from),
            to_mode: Some(to),
            message: format!("Successfully recovered from {from} to {to}"),
            payload: EventPayload::Recovery {
                reason: reason.to_string(),
            },
        };
        let timestamp = event.timestamp;
        self.publish_event(event);

        self.publish_notification(DegradationNotification {
            kind: NotificationKind::Success,
            title: "Recovery Successful".to_string(),
            message: format!("Successfully recovered to {to} mode"),
            current_mode: to,
            suggested_actions: Vec::new(),
            duration: Some(self.config.notification_duration),
        });

        self.record_history(DegradationHistory {
            id: Uuid::new_v4(),
            timestamp,
            event_kind: DegradationEventKind::RecoverySuccess,
            from_mode: from,
            to_mode: to,
            reason: reason.to_string(),
            metrics_snapshot: DegradationMetrics::empty(),
        });
    }

    /// Most recent events, oldest first; all of them when `limit` is `None`
    pub fn event_history(&self, limit: Option<usize>) -> Vec<DegradationEvent> {
        tail(&self.event_log.lock(), limit)
    }

    /// Most recent history records, oldest first
    pub fn history(&self, limit: Option<usize>) -> Vec<DegradationHistory> {
        tail(&self.history.lock(), limit)
    }

    pub fn clear_history(&self) {
        self.event_log.lock().clear();
        self.history.lock().clear();
        info!("Degradation history cleared");
    }

    /// Drop every listener and all recorded history
    pub fn destroy(&self) {
        self.notifications.clear();
        self.events.clear();
        self.event_log.lock().clear();
        self.history.lock().clear();
        info!("Degradation notifier destroyed");
    }

    fn publish_event(&self, event: DegradationEvent) {
        {
            let mut log = self.event_log.lock();
            push_bounded(&mut log, event.clone(), self.config.max_history_size);
        }

        self.events.emit(&event);

        if self.config.log_events {
            if event.kind == DegradationEventKind::WarningTriggered {
                warn!(kind = %event.kind, message = %event.message, "Degradation event");
            } else {
                info!(kind = %event.kind, message = %event.message, "Degradation event");
            }
        }
    }

    fn publish_notification(&self, notification: DegradationNotification) {
        self.notifications.emit(&notification);

        if self.config.log_events {
            let kind = notification.kind;
            let title = notification.title.as_str();
            let mode = notification.current_mode;
            match kind {
                NotificationKind::Error => error!(%kind, title, %mode, "Degradation notification"),
                NotificationKind::Warning => warn!(%kind, title, %mode, "Degradation notification"),
                NotificationKind::Info | NotificationKind::Success => {
                    info!(%kind, title, %mode, "Degradation notification")
                }
            }
        }
    }

    fn record_history(&self, record: DegradationHistory) {
        if !self.config.persist_history {
            return;
        }
        debug!(
            id = %record.id,
            kind = %record.event_kind,
            from = %record.from_mode,
            to = %record.to_mode,
            "Persisting degradation history"
        );
        let mut history = self.history.lock();
        push_bounded(&mut history, record, self.config.max_history_size);
    }
}

fn push_bounded<T>(buffer: &mut VecDeque<T>, value: T, capacity: usize) {
    buffer.push_back(value);
    while buffer.len() > capacity {
        buffer.pop_front();
    }
}

fn tail<T: Clone>(buffer: &VecDeque<T>, limit: Option<usize>) -> Vec<T> {
    let skip = match limit {
        Some(limit) => buffer.len().saturating_sub(limit),
        None => 0,
    };
    buffer.iter().skip(skip).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn collect_notifications(
        notifier: &DegradationNotifier,
    ) -> (Arc<Mutex<Vec<DegradationNotification>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = notifier.on_notification(move |n| sink.lock().push(n.clone()));
        (seen, sub)
    }

    #[test]
    fn test_downgrade_notification_is_persistent() {
        let notifier = DegradationNotifier::default();
        let (seen, _sub) = collect_notifications(&notifier);

        notifier.notify_mode_change(
            DegradationMode::Browser,
            DegradationMode::Backend,
            "Large file size (35.0MB)",
            None,
        );

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        let n = &seen[0];
        assert_eq!(n.kind, NotificationKind::Warning);
        assert_eq!(n.title, "Switched to Backend Mode");
        assert!(n.message.starts_with("Large file size (35.0MB)\n\n"));
        assert!(n.message.ends_with(DegradationMode::Backend.description()));
        assert!(n.is_persistent());
        assert_eq!(n.suggested_actions.len(), 3);
    }

    #[test]
    fn test_upgrade_notification_auto_dismisses() {
        let notifier = DegradationNotifier::default();
        let (seen, _sub) = collect_notifications(&notifier);

        notifier.notify_mode_change(
            DegradationMode::Hybrid,
            DegradationMode::Browser,
            "Recovered",
            None,
        );

        let n = seen.lock()[0].clone();
        assert_eq!(n.kind, NotificationKind::Success);
        assert_eq!(n.duration, Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_mode_change_writes_history() {
        let notifier = DegradationNotifier::default();
        let metrics = DegradationMetrics {
            memory_usage: 91.0,
            ..DegradationMetrics::empty()
        };
        notifier.notify_mode_change(
            DegradationMode::Browser,
            DegradationMode::Hybrid,
            "memory",
            Some(&metrics),
        );

        let history = notifier.history(None);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_kind, DegradationEventKind::ModeChanged);
        assert_eq!(history[0].metrics_snapshot.memory_usage, 91.0);

        let events = notifier.event_history(None);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "Mode changed from browser to hybrid");
    }

    #[test]
    fn test_history_disabled() {
        let notifier = DegradationNotifier::new(NotifierConfig {
            persist_history: false,
            ..Default::default()
        });
        notifier.notify_mode_change(DegradationMode::Browser, DegradationMode::Hybrid, "x", None);
        notifier.notify_recovery_success(DegradationMode::Hybrid, DegradationMode::Browser, "y");
        assert!(notifier.history(None).is_empty());
        assert_eq!(notifier.event_history(None).len(), 2);
    }

    #[test]
    fn test_critical_warning_is_error() {
        let notifier = DegradationNotifier::default();
        let (seen, _sub) = collect_notifications(&notifier);

        notifier.notify_warning(
            WarningKind::Memory,
            "High memory usage: 95.0%",
            DegradationLevel::Critical,
            WarningContext {
                current_mode: Some(DegradationMode::Hybrid),
                metrics: None,
            },
        );
        notifier.notify_warning(
            WarningKind::from("disk"),
            "Disk almost full",
            DegradationLevel::Warning,
            WarningContext::default(),
        );

        let seen = seen.lock();
        assert_eq!(seen[0].kind, NotificationKind::Error);
        assert_eq!(seen[0].title, "memory Warning");
        assert_eq!(seen[0].current_mode, DegradationMode::Hybrid);
        assert!(seen[0].is_persistent());

        assert_eq!(seen[1].kind, NotificationKind::Warning);
        assert_eq!(seen[1].current_mode, DegradationMode::Browser);
        assert_eq!(seen[1].suggested_actions, vec!["Please try again later"]);
        assert_eq!(seen[1].duration, Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_broadcast_raises_threshold_warnings() {
        let notifier = DegradationNotifier::default();
        let (seen, _sub) = collect_notifications(&notifier);

        notifier.broadcast_metrics(&DegradationMetrics {
            memory_usage: 80.0,
            api_failure_rate: 55.0,
            avg_execution_time: 10.0,
            ..DegradationMetrics::empty()
        });

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].message, "High memory usage: 80.0%");
        assert_eq!(seen[0].kind, NotificationKind::Warning);
        assert_eq!(seen[1].message, "High API failure rate: 55.0%");
        assert_eq!(seen[1].kind, NotificationKind::Error);

        let kinds: Vec<_> = notifier
            .event_history(None)
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                DegradationEventKind::MetricsUpdated,
                DegradationEventKind::WarningTriggered,
                DegradationEventKind::WarningTriggered,
            ]
        );
    }

    #[test]
    fn test_thresholds_are_strict() {
        let notifier = DegradationNotifier::default();
        let (seen, _sub) = collect_notifications(&notifier);
        notifier.broadcast_metrics(&DegradationMetrics {
            memory_usage: 75.0,
            api_failure_rate: 20.0,
            avg_execution_time: 30.0,
            ..DegradationMetrics::empty()
        });
        assert!(seen.lock().is_empty());
    }

    fn warning_levels(notifier: &DegradationNotifier) -> Vec<(WarningKind, DegradationLevel)> {
        notifier
            .event_history(None)
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::Warning { warning, level, .. } => Some((warning, level)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_critical_memory_usage_broadcasts_error() {
        let notifier = DegradationNotifier::default();
        let (seen, _sub) = collect_notifications(&notifier);

        notifier.broadcast_metrics_in(
            Some(DegradationMode::Hybrid),
            &DegradationMetrics {
                memory_usage: 95.0,
                ..DegradationMetrics::empty()
            },
        );

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, "High memory usage: 95.0%");
        assert_eq!(seen[0].kind, NotificationKind::Error);
        assert_eq!(seen[0].current_mode, DegradationMode::Hybrid);
        assert!(seen[0].is_persistent());
        assert_eq!(
            warning_levels(&notifier),
            vec![(WarningKind::Memory, DegradationLevel::Critical)]
        );
    }

    #[test]
    fn test_execution_time_warning_levels() {
        for (secs, expected) in [
            (30.0, None),
            (31.0, Some(DegradationLevel::Warning)),
            (60.0, Some(DegradationLevel::Warning)),
            (61.0, Some(DegradationLevel::Critical)),
        ] {
            let notifier = DegradationNotifier::default();
            let (seen, _sub) = collect_notifications(&notifier);
            notifier.broadcast_metrics(&DegradationMetrics {
                avg_execution_time: secs,
                ..DegradationMetrics::empty()
            });

            let levels = warning_levels(&notifier);
            match expected {
                None => {
                    assert!(levels.is_empty(), "{secs}s should not warn");
                    assert!(seen.lock().is_empty());
                }
                Some(level) => {
                    assert_eq!(levels, vec![(WarningKind::Execution, level)], "{secs}s");
                    let seen = seen.lock();
                    assert_eq!(seen[0].message, format!("Slow execution: {secs:.1}s average"));
                    assert_eq!(seen[0].title, "execution Warning");
                }
            }
        }
    }

    #[test]
    fn test_recovery_notifications() {
        let notifier = DegradationNotifier::default();
        let (seen, _sub) = collect_notifications(&notifier);

        notifier.notify_recovery_attempt(DegradationMode::Browser, "System metrics improved");
        notifier.notify_recovery_success(
            DegradationMode::Hybrid,
            DegradationMode::Browser,
            "System recovered",
        );

        let seen = seen.lock();
        assert_eq!(seen[0].kind, NotificationKind::Info);
        assert_eq!(seen[0].duration, Some(Duration::from_millis(3000)));
        assert_eq!(
            seen[0].message,
            "Attempting to recover to browser mode: System metrics improved"
        );
        assert_eq!(seen[1].kind, NotificationKind::Success);
        assert_eq!(seen[1].title, "Recovery Successful");

        let history = notifier.history(None);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_kind, DegradationEventKind::RecoverySuccess);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let notifier = DegradationNotifier::default();
        let _bad = notifier.on_event(|_| panic!("listener bug"));
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        let _good = notifier.on_event(move |_| *sink.lock() += 1);

        notifier.notify_recovery_attempt(DegradationMode::Hybrid, "test");
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let notifier = DegradationNotifier::default();
        let (seen, sub) = collect_notifications(&notifier);
        notifier.notify_recovery_attempt(DegradationMode::Hybrid, "first");
        assert!(sub.unsubscribe());
        notifier.notify_recovery_attempt(DegradationMode::Hybrid, "second");
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let notifier = DegradationNotifier::new(NotifierConfig {
            max_history_size: 3,
            log_events: false,
            ..Default::default()
        });
        for i in 0..5 {
            notifier.notify_recovery_attempt(DegradationMode::Hybrid, &format!("attempt {i}"));
        }

        let events = notifier.event_history(None);
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0].payload,
            EventPayload::Recovery {
                reason: "attempt 2".to_string()
            }
        );
        assert_eq!(notifier.event_history(Some(1)).len(), 1);
        assert_eq!(notifier.event_history(Some(10)).len(), 3);
    }

    #[test]
    fn test_destroy_clears_everything() {
        let notifier = DegradationNotifier::default();
        let (seen, _sub) = collect_notifications(&notifier);
        notifier.notify_mode_change(DegradationMode::Browser, DegradationMode::Hybrid, "x", None);

        notifier.destroy();
        assert!(notifier.history(None).is_empty());
        assert!(notifier.event_history(None).is_empty());

        notifier.notify_recovery_attempt(DegradationMode::Hybrid, "after destroy");
        assert_eq!(seen.lock().len(), 1);
    }
}
