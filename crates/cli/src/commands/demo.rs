use super::Scenario;
use excelmind_core::{DegradationMode, DegradationNotification, Error, MIB};
use excelmind_degradation::{
    DegradationController, DegradationNotifier, ManualMemoryProbe, MemoryMonitor, MemoryProbe,
    OperationKind, Settings, ThresholdPolicy,
};
use excelmind_resilience::{
    producers, ApiCircuitBreaker, FallbackStrategy, ResilienceStrategy, RetryConfig,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const OPERATION: &str = "suggest_formulas";

/// Every component wired together, with a memory probe the demo controls
pub struct Components {
    pub controller: Arc<DegradationController>,
    pub probe: Arc<ManualMemoryProbe>,
    pub resilience: ResilienceStrategy<Vec<String>>,
}

impl Components {
    pub fn build(settings: &Settings) -> Self {
        let mut controller_config = settings.controller.clone();
        // the demo runs in seconds, not minutes
        controller_config.recovery.min_stable_time = Duration::ZERO;

        let probe = Arc::new(ManualMemoryProbe::new(settings.memory.memory_limit / 5));
        let monitor = Arc::new(MemoryMonitor::with_probe(
            settings.memory.clone(),
            Arc::clone(&probe) as Arc<dyn MemoryProbe>,
        ));
        let breaker = Arc::new(ApiCircuitBreaker::new(settings.circuit_breaker.clone()));
        let notifier = Arc::new(DegradationNotifier::with_thresholds(
            settings.notifier.clone(),
            controller_config.thresholds.clone(),
        ));
        let policy = Arc::new(ThresholdPolicy::new(controller_config.thresholds.clone()));
        let controller = Arc::new(DegradationController::new(
            controller_config,
            monitor,
            breaker,
            notifier,
            policy,
        ));

        let fallbacks = Arc::new(FallbackStrategy::new());
        fallbacks.register(
            OPERATION,
            producers::default_value(vec!["=SUM(A:A)".to_string()]),
        );
        let retry = RetryConfig {
            jitter: false,
            ..RetryConfig::fast_retry()
        };
        let resilience = ResilienceStrategy::with_config(retry, Some(fallbacks));

        Self {
            controller,
            probe,
            resilience,
        }
    }

    fn set_memory_percent(&self, percent: u64) {
        let limit = self.controller.monitor().config().memory_limit;
        self.probe.set_used(limit / 100 * percent);
        self.controller.monitor().sample_now();
    }

    /// One AI request through the breaker, retried, then served by the fallback
    async fn request_suggestions(&self) -> excelmind_core::Result<Vec<String>> {
        let breaker = Arc::clone(self.controller.breaker());
        self.resilience
            .execute(OPERATION, || {
                let breaker = Arc::clone(&breaker);
                async move {
                    breaker
                        .call(|| async {
                            Err::<Vec<String>, _>(Error::network("ai-api", "connection reset"))
                        })
                        .await
                }
            })
            .await
    }
}

#[derive(Debug)]
pub struct DemoReport {
    pub final_mode: DegradationMode,
    pub notifications: Vec<String>,
}

pub async fn run(settings: &Settings, scenario: Scenario) -> excelmind_core::Result<DemoReport> {
    let components = Components::build(settings);
    let controller = &components.controller;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = controller
        .notifier()
        .on_notification(move |n: &DegradationNotification| {
            sink.lock().push(format!("[{}] {}", n.kind, n.title));
        });

    controller.check_degradation();
    match scenario {
        Scenario::Memory => {
            components.set_memory_percent(93);
            controller.check_degradation();
            info!(mode = %controller.current_mode(), "Memory spiked");

            components.set_memory_percent(20);
            controller.attempt_recovery();
        }
        Scenario::Api => {
            for _ in 0..3 {
                let suggestions = components.request_suggestions().await?;
                info!(?suggestions, "Suggestions served");
            }
            controller.check_degradation();
        }
        Scenario::File => {
            let size = 35 * MIB;
            controller.record_file_size(size);
            let risk = controller
                .monitor()
                .estimate_operation_risk(OperationKind::Parse, size / 100);
            info!(?risk, "Estimated parse risk");
            controller.check_degradation();
        }
    }

    let notifications = seen.lock().clone();
    Ok(DemoReport {
        final_mode: controller.current_mode(),
        notifications,
    })
}

pub async fn execute(settings: Arc<Settings>, scenario: Scenario) -> eyre::Result<()> {
    let report = run(&settings, scenario).await?;
    for line in &report.notifications {
        println!("{line}");
    }
    println!("final mode: {}", report.final_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use excelmind_degradation::NotifierConfig;

    fn settings() -> Settings {
        Settings {
            notifier: NotifierConfig {
                log_events: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_scenario_degrades_and_recovers() {
        let report = run(&settings(), Scenario::Memory).await.unwrap();
        assert_eq!(report.final_mode, DegradationMode::Browser);
        assert!(report
            .notifications
            .contains(&"[warning] Switched to Backend Mode".to_string()));
        assert!(report
            .notifications
            .contains(&"[success] Recovery Successful".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_scenario_uses_fallback_and_goes_backend() {
        let report = run(&settings(), Scenario::Api).await.unwrap();
        assert_eq!(report.final_mode, DegradationMode::Backend);
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_scenario() {
        let report = run(&settings(), Scenario::File).await.unwrap();
        assert_eq!(report.final_mode, DegradationMode::Backend);
    }
}
