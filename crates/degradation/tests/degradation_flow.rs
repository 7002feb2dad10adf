//! Controller, monitor, breaker and notifier wired together through the public API

use excelmind_core::{DegradationMode, NotificationKind, MIB};
use excelmind_degradation::{
    ControllerConfig, DegradationController, DegradationNotifier, DegradationThresholds,
    ManualMemoryProbe, MemoryMonitor, MemoryMonitorConfig, MemoryProbe, NotifierConfig,
    Settings, ThresholdPolicy,
};
use excelmind_resilience::{ApiCircuitBreaker, CircuitBreakerConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn build(settings: &Settings) -> (Arc<DegradationController>, Arc<ManualMemoryProbe>) {
    let probe = Arc::new(ManualMemoryProbe::new(200 * MIB));
    let monitor = Arc::new(MemoryMonitor::with_probe(
        settings.memory.clone(),
        Arc::clone(&probe) as Arc<dyn MemoryProbe>,
    ));
    let thresholds = settings.controller.thresholds.clone();
    let controller = DegradationController::new(
        settings.controller.clone(),
        monitor,
        Arc::new(ApiCircuitBreaker::new(settings.circuit_breaker.clone())),
        Arc::new(DegradationNotifier::with_thresholds(
            settings.notifier.clone(),
            thresholds.clone(),
        )),
        Arc::new(ThresholdPolicy::new(thresholds)),
    );
    (Arc::new(controller), probe)
}

fn settings() -> Settings {
    Settings {
        memory: MemoryMonitorConfig {
            memory_limit: 1000 * MIB,
            ..Default::default()
        },
        notifier: NotifierConfig {
            log_events: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn degrade_under_pressure_then_recover() {
    let (controller, probe) = build(&settings());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = controller
        .notifier()
        .on_notification(move |n| sink.lock().push((n.kind, n.title.clone())));

    controller.start_monitoring();
    probe.set_used(930 * MIB);
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(controller.current_mode(), DegradationMode::Backend);

    probe.set_used(150 * MIB);
    // let the sampler pick up the lower reading, then wait out the stable time
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(controller.attempt_recovery());
    assert_eq!(controller.current_mode(), DegradationMode::Browser);
    controller.stop_monitoring();

    let seen = seen.lock();
    assert!(seen.contains(&(NotificationKind::Warning, "Switched to Backend Mode".to_string())));
    assert!(seen.contains(&(NotificationKind::Info, "Recovery Attempt".to_string())));
    assert!(seen.contains(&(NotificationKind::Success, "Recovery Successful".to_string())));
}

#[tokio::test(start_paused = true)]
async fn failing_api_pushes_work_to_backend() {
    let mut settings = settings();
    settings.circuit_breaker = CircuitBreakerConfig {
        minimum_requests: 4,
        ..Default::default()
    };
    let (controller, _) = build(&settings);

    for _ in 0..4 {
        controller.record_api_call(false, Some(Duration::from_millis(120)));
    }
    assert!(!controller.allow_api_request());

    let decision = controller.check_degradation();
    assert!(decision.should_degrade);
    assert_eq!(controller.current_mode(), DegradationMode::Backend);

    let stats = controller.statistics();
    assert_eq!(stats.circuit.total_opens, 1);
    assert_eq!(stats.current_state.metrics.api_failure_rate, 100.0);
    assert!(!stats.health_check.checks.api.passed);
}

#[tokio::test(start_paused = true)]
async fn custom_thresholds_from_settings() {
    let settings = Settings::from_json_str(
        r#"{
            "memory": { "memory_limit": 1048576000 },
            "notifier": { "log_events": false },
            "controller": { "thresholds": { "file_size_warning": 1048576, "file_size_critical": 2097152 } }
        }"#,
    )
    .unwrap();
    assert_eq!(
        settings.controller.thresholds,
        DegradationThresholds {
            file_size_warning: MIB,
            file_size_critical: 2 * MIB,
            ..Default::default()
        }
    );

    let (controller, _) = build(&settings);
    controller.record_file_size(MIB + 1);
    controller.check_degradation();
    assert_eq!(controller.current_mode(), DegradationMode::Hybrid);

    controller.record_file_size(3 * MIB);
    controller.check_degradation();
    assert_eq!(controller.current_mode(), DegradationMode::Backend);
    assert_eq!(controller.notifier().history(None).len(), 2);
}

#[test]
fn default_controller_builds_without_runtime() {
    let controller = DegradationController::with_defaults(ControllerConfig::default());
    assert_eq!(controller.current_mode(), DegradationMode::Browser);
    assert!(!controller.is_monitoring());
}
