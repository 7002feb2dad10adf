//! Orchestrates monitoring, mode transitions and recovery.
//!
//! The controller periodically gathers [`DegradationMetrics`] from the
//! memory monitor, the API circuit breaker, recorded execution times and
//! the current workbook size. It asks its [`TransitionPolicy`] whether to
//! switch mode and reports every change through the notifier.

use crate::health::HealthCheckResult;
use crate::memory::{MemoryMonitor, MemoryMonitorConfig, MemoryStatistics};
use crate::notifier::{DegradationNotifier, NotifierConfig};
use crate::policy::{DegradationDecision, DegradationThresholds, ThresholdPolicy, TransitionPolicy};
use chrono::{DateTime, Utc};
use excelmind_core::{config::duration_ms, DegradationLevel, DegradationMetrics, DegradationMode};
use excelmind_resilience::{ApiCircuitBreaker, CircuitBreakerConfig, CircuitStatistics};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Most consecutive API failures a healthy system may show
const HEALTHY_MAX_CONSECUTIVE_FAILURES: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// How often the controller re-evaluates metrics
    #[serde(rename = "check_interval_ms", with = "duration_ms")]
    pub check_interval: Duration,
    /// Time without a mode change before recovery is considered
    #[serde(rename = "min_stable_time_ms", with = "duration_ms")]
    pub min_stable_time: Duration,
    pub max_recovery_attempts: u32,
    /// Fraction of the warning thresholds below which recovery targets the browser
    pub browser_recovery_factor: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            min_stable_time: Duration::from_secs(60),
            max_recovery_attempts: 3,
            browser_recovery_factor: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub thresholds: DegradationThresholds,
    pub recovery: RecoveryConfig,
    /// Execution times kept for the moving average
    pub execution_samples: usize,
    /// How recent the last API failure must be to count the failure streak
    #[serde(rename = "failure_window_ms", with = "duration_ms")]
    pub failure_window: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            thresholds: DegradationThresholds::default(),
            recovery: RecoveryConfig::default(),
            execution_samples: 10,
            failure_window: Duration::from_secs(60),
        }
    }
}

/// Snapshot of the controller's view of the system
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradationState {
    pub current_mode: DegradationMode,
    pub current_level: DegradationLevel,
    pub reason: Option<String>,
    pub last_check: DateTime<Utc>,
    pub metrics: DegradationMetrics,
    /// Set once a degradation has happened; cleared by `reset`
    pub can_recover: bool,
}

impl DegradationState {
    fn initial() -> Self {
        Self {
            current_mode: DegradationMode::Browser,
            current_level: DegradationLevel::Normal,
            reason: None,
            last_check: Utc::now(),
            metrics: DegradationMetrics::empty(),
            can_recover: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatistics {
    pub current_state: DegradationState,
    pub health_check: HealthCheckResult,
    pub memory: MemoryStatistics,
    pub circuit: CircuitStatistics,
    pub recovery_attempts: u32,
}

struct ControllerState {
    state: DegradationState,
    execution_times: VecDeque<f64>,
    file_size: u64,
    recovery_attempts: u32,
    last_transition: Instant,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            state: DegradationState::initial(),
            execution_times: VecDeque::new(),
            file_size: 0,
            recovery_attempts: 0,
            last_transition: Instant::now(),
        }
    }

    fn average_execution_time(&self) -> f64 {
        if self.execution_times.is_empty() {
            return 0.0;
        }
        self.execution_times.iter().sum::<f64>() / self.execution_times.len() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionKind {
    Degradation,
    Recovery,
}

pub const fn level_for_mode(mode: DegradationMode) -> DegradationLevel {
    match mode {
        DegradationMode::Browser => DegradationLevel::Normal,
        DegradationMode::Hybrid => DegradationLevel::Warning,
        DegradationMode::Backend => DegradationLevel::Degraded,
    }
}

pub struct DegradationController {
    config: ControllerConfig,
    monitor: Arc<MemoryMonitor>,
    breaker: Arc<ApiCircuitBreaker>,
    notifier: Arc<DegradationNotifier>,
    policy: Arc<dyn TransitionPolicy>,
    inner: Mutex<ControllerState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for DegradationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradationController")
            .field("config", &self.config)
            .field("state", &self.inner.lock().state)
            .field("monitoring", &self.is_monitoring())
            .finish()
    }
}

impl DegradationController {
    pub fn new(
        config: ControllerConfig,
        monitor: Arc<MemoryMonitor>,
        breaker: Arc<ApiCircuitBreaker>,
        notifier: Arc<DegradationNotifier>,
        policy: Arc<dyn TransitionPolicy>,
    ) -> Self {
        debug!(?config, "Degradation controller initialized");
        Self {
            config,
            monitor,
            breaker,
            notifier,
            policy,
            inner: Mutex::new(ControllerState::new()),
            task: Mutex::new(None),
        }
    }

    /// Default components around `config`, monitoring the current process
    pub fn with_defaults(config: ControllerConfig) -> Self {
        let thresholds = config.thresholds.clone();
        Self::new(
            config,
            Arc::new(MemoryMonitor::new(MemoryMonitorConfig::default())),
            Arc::new(ApiCircuitBreaker::new(CircuitBreakerConfig::default())),
            Arc::new(DegradationNotifier::with_thresholds(
                NotifierConfig::default(),
                thresholds.clone(),
            )),
            Arc::new(ThresholdPolicy::new(thresholds)),
        )
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Arc<MemoryMonitor> {
        &self.monitor
    }

    pub fn breaker(&self) -> &Arc<ApiCircuitBreaker> {
        &self.breaker
    }

    pub fn notifier(&self) -> &Arc<DegradationNotifier> {
        &self.notifier
    }

    /// Start memory sampling and the periodic degradation check
    pub fn start_monitoring(self: &Arc<Self>) {
        let period = self.config.recovery.check_interval;
        {
            let mut task = self.task.lock();
            if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
                warn!("Degradation monitoring already started");
                return;
            }

            let controller = Arc::downgrade(self);
            *task = Some(tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let Some(controller) = controller.upgrade() else {
                        break;
                    };
                    controller.check_degradation();
                }
            }));
        }
        info!(
            check_interval_ms = period.as_millis() as u64,
            "Degradation monitoring started"
        );

        // first memory sample notifies listeners; no controller lock is held
        self.monitor.start_monitoring();
    }

    pub fn stop_monitoring(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
        self.monitor.stop_monitoring();
        info!("Degradation monitoring stopped");
    }

    pub fn is_monitoring(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Evaluate current metrics, switch mode if the policy says so, and broadcast metrics
    pub fn check_degradation(&self) -> DegradationDecision {
        self.breaker.expire_inactive_window();

        let metrics = self.collect_metrics();
        let decision = self.policy.decide(self.current_mode(), &metrics);
        if decision.should_degrade {
            if let Some(target) = decision.target_mode {
                self.transition(target, &decision.reason, TransitionKind::Degradation);
            }
        }

        let mode = {
            let mut inner = self.inner.lock();
            inner.state.metrics = metrics.clone();
            inner.state.last_check = Utc::now();
            inner.state.current_mode
        };
        self.notifier.broadcast_metrics_in(Some(mode), &metrics);
        decision
    }

    /// Switch to `mode` regardless of metrics
    pub fn execute_degradation(&self, mode: DegradationMode, reason: Option<&str>) {
        self.transition(
            mode,
            reason.unwrap_or("Manual degradation"),
            TransitionKind::Degradation,
        );
    }

    fn transition(&self, mode: DegradationMode, reason: &str, kind: TransitionKind) {
        let (previous, metrics) = {
            let mut inner = self.inner.lock();
            let previous = inner.state.current_mode;
            inner.state.current_mode = mode;
            inner.state.current_level = level_for_mode(mode);
            inner.state.reason = Some(reason.to_string());
            inner.state.last_check = Utc::now();
            inner.last_transition = Instant::now();
            match kind {
                TransitionKind::Degradation => {
                    inner.recovery_attempts = 0;
                    inner.state.can_recover = true;
                }
                TransitionKind::Recovery => {
                    inner.state.can_recover = mode != DegradationMode::Browser;
                }
            }
            (previous, inner.state.metrics.clone())
        };

        info!(from = %previous, to = %mode, reason, "Executing mode transition");
        self.notifier
            .notify_mode_change(previous, mode, reason, Some(&metrics));
    }

    pub fn can_recover(&self) -> bool {
        let (can_recover, mode, since) = {
            let inner = self.inner.lock();
            (
                inner.state.can_recover,
                inner.state.current_mode,
                inner.last_transition,
            )
        };

        if !can_recover || mode == DegradationMode::Browser {
            return false;
        }
        if since.elapsed() < self.config.recovery.min_stable_time {
            return false;
        }
        self.is_healthy(&self.collect_metrics())
    }

    /// Try to move to a less degraded mode; true when the mode changed
    pub fn attempt_recovery(&self) -> bool {
        if !self.can_recover() {
            debug!("Cannot recover yet");
            return false;
        }

        {
            let mut inner = self.inner.lock();
            if inner.recovery_attempts >= self.config.recovery.max_recovery_attempts {
                info!(
                    attempts = inner.recovery_attempts,
                    "Max recovery attempts reached"
                );
                return false;
            }
            inner.recovery_attempts += 1;
        }

        let previous = self.current_mode();
        let target = self.decide_recovery_mode();
        if target == previous {
            debug!(mode = %previous, "Recovery would not change mode");
            return false;
        }

        info!(from = %previous, to = %target, "Attempting recovery");
        self.notifier
            .notify_recovery_attempt(target, "System metrics improved");
        self.transition(target, "Recovery attempt", TransitionKind::Recovery);

        let recovered = self.current_mode() == target;
        if recovered {
            self.notifier
                .notify_recovery_success(previous, target, "System recovered");
        }
        recovered
    }

    fn decide_recovery_mode(&self) -> DegradationMode {
        let metrics = self.collect_metrics();
        let t = &self.config.thresholds;
        let factor = self.config.recovery.browser_recovery_factor;
        if metrics.memory_usage < t.memory_warning * factor
            && (metrics.file_size as f64) < t.file_size_warning as f64 * factor
        {
            DegradationMode::Browser
        } else {
            DegradationMode::Hybrid
        }
    }

    fn is_healthy(&self, metrics: &DegradationMetrics) -> bool {
        let t = &self.config.thresholds;
        metrics.memory_usage < t.memory_warning
            && metrics.file_size < t.file_size_warning
            && metrics.api_failure_rate < t.api_failure_warning
            && metrics.avg_execution_time < t.execution_timeout_secs
            && metrics.consecutive_failures <= HEALTHY_MAX_CONSECUTIVE_FAILURES
    }

    fn collect_metrics(&self) -> DegradationMetrics {
        let memory = self.monitor.current_status();
        let circuit = self.breaker.snapshot();
        let consecutive_failures = match circuit.last_failure_time {
            Some(at) if at.elapsed() < self.config.failure_window => {
                u32::try_from(circuit.consecutive_failures).unwrap_or(u32::MAX)
            }
            _ => 0,
        };

        let inner = self.inner.lock();
        DegradationMetrics {
            memory_usage: memory.usage_percent,
            file_size: inner.file_size,
            api_failure_rate: circuit.failure_rate,
            avg_execution_time: inner.average_execution_time(),
            consecutive_failures,
            last_update: Utc::now(),
        }
    }

    pub fn record_execution(&self, duration: Duration) {
        let mut inner = self.inner.lock();
        inner.execution_times.push_back(duration.as_secs_f64());
        while inner.execution_times.len() > self.config.execution_samples {
            inner.execution_times.pop_front();
        }
    }

    pub fn record_file_size(&self, bytes: u64) {
        let mut inner = self.inner.lock();
        inner.file_size = bytes;
        inner.state.metrics.file_size = bytes;
    }

    pub fn record_api_call(&self, success: bool, duration: Option<Duration>) {
        self.breaker.record_call(success, duration);
    }

    pub fn allow_api_request(&self) -> bool {
        self.breaker.allow_request()
    }

    pub fn current_state(&self) -> DegradationState {
        self.inner.lock().state.clone()
    }

    pub fn current_mode(&self) -> DegradationMode {
        self.inner.lock().state.current_mode
    }

    pub fn current_level(&self) -> DegradationLevel {
        self.inner.lock().state.current_level
    }

    pub fn perform_health_check(&self) -> HealthCheckResult {
        HealthCheckResult::evaluate(&self.collect_metrics(), &self.config.thresholds)
    }

    pub fn statistics(&self) -> ControllerStatistics {
        let (current_state, recovery_attempts) = {
            let inner = self.inner.lock();
            (inner.state.clone(), inner.recovery_attempts)
        };
        ControllerStatistics {
            current_state,
            health_check: self.perform_health_check(),
            memory: self.monitor.statistics(),
            circuit: self.breaker.statistics(),
            recovery_attempts,
        }
    }

    /// Back to browser mode with no recorded history; stops memory sampling
    pub fn reset(&self) {
        *self.inner.lock() = ControllerState::new();
        self.breaker.reset();
        self.monitor.reset();
        info!("Degradation controller reset");
    }
}

impl Drop for DegradationController {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}
