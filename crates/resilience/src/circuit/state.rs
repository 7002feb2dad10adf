//! API circuit breaker state management and execution logic.

use super::metrics::CallRecord;
use super::transitions::BreakerState;
use crate::config::CircuitBreakerConfig;
use crate::types::{CircuitSnapshot, CircuitState, CircuitStatistics};
use excelmind_core::{DegradationLevel, Error, Result};
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Share of the failure threshold at which the breaker reports a warning
const WARNING_RATE_FACTOR: f64 = 0.7;

/// Failure-rate circuit breaker over a sliding window of API calls
#[derive(Debug)]
pub struct ApiCircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl Default for ApiCircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl ApiCircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let inner = Mutex::new(BreakerState::new(&config));
        Self { config, inner }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state, moving Open to HalfOpen when the open duration has passed
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        inner.check_half_open_transition(&self.config);
        inner.state
    }

    /// Whether a request may go out now
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Open => inner.check_half_open_transition(&self.config),
            CircuitState::HalfOpen | CircuitState::Closed => true,
        }
    }

    /// Record the outcome of a call made outside [`ApiCircuitBreaker::call`]
    pub fn record_call(&self, success: bool, duration: Option<Duration>) {
        let record = CallRecord {
            success,
            at: Instant::now(),
            duration,
        };
        self.inner.lock().record(record, &self.config);
    }

    pub fn record_success(&self) {
        self.record_call(true, None);
    }

    pub fn record_failure(&self) {
        self.record_call(false, None);
    }

    /// Execute an operation through the circuit breaker
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.allow_request() {
            return Err(Error::circuit_open(&self.config.service));
        }

        let started = Instant::now();
        let result = operation().await;
        self.record_call(result.is_ok(), Some(started.elapsed()));
        result
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let mut inner = self.inner.lock();
        inner.check_half_open_transition(&self.config);
        CircuitSnapshot {
            state: inner.state,
            is_open: inner.state == CircuitState::Open,
            failure_count: inner.total_failures,
            success_count: inner.total_successes,
            total_calls: inner.total_failures + inner.total_successes,
            failure_rate: inner.window.failure_rate(),
            consecutive_failures: inner.window.consecutive_failures(),
            last_failure_time: inner.window.last_failure(),
            last_success_time: inner.window.last_success(),
            opened_at: inner.opened_at,
            half_open_requests: inner.half_open_calls,
        }
    }

    pub fn statistics(&self) -> CircuitStatistics {
        let mut inner = self.inner.lock();
        inner.check_half_open_transition(&self.config);
        let total_calls = inner.total_successes + inner.total_failures;
        let uptime_percentage = if total_calls == 0 {
            100.0
        } else {
            inner.total_successes as f64 / total_calls as f64 * 100.0
        };
        CircuitStatistics {
            total_opens: inner.total_opens,
            total_successful_calls: inner.total_successes,
            total_failed_calls: inner.total_failures,
            total_calls,
            current_state: inner.state,
            uptime_percentage,
        }
    }

    /// Mean duration of timed calls in the window
    pub fn average_call_duration(&self) -> Option<Duration> {
        self.inner.lock().window.average_duration()
    }

    /// Severity implied by the breaker's state and failure rate
    pub fn degradation_level(&self) -> DegradationLevel {
        let mut inner = self.inner.lock();
        inner.check_half_open_transition(&self.config);
        match inner.state {
            CircuitState::Open => DegradationLevel::Critical,
            CircuitState::HalfOpen => DegradationLevel::Warning,
            CircuitState::Closed => {
                if inner.window.len() >= self.config.minimum_requests
                    && inner.window.failure_rate()
                        >= self.config.failure_threshold * WARNING_RATE_FACTOR
                {
                    DegradationLevel::Warning
                } else {
                    DegradationLevel::Normal
                }
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Force the circuit open, e.g. when the service reports an outage
    pub fn open(&self, reason: &str) {
        let mut inner = self.inner.lock();
        warn!(service = %self.config.service, reason, "Forcing circuit breaker open");
        inner.transition_to_open(&self.config);
    }

    /// Force the circuit closed
    pub fn close(&self) {
        self.inner.lock().transition_to_closed(&self.config);
    }

    /// Close the circuit and clear the window; lifetime counters are kept
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.window.clear();
        inner.opened_at = None;
        inner.half_open_calls = 0;
        inner.last_activity = Instant::now();
    }

    /// Clear the window of a closed breaker idle past `reset_timeout`
    pub fn expire_inactive_window(&self) -> bool {
        self.inner.lock().expire_inactive(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn breaker() -> ApiCircuitBreaker {
        ApiCircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 50.0,
            minimum_requests: 4,
            open_duration: Duration::from_secs(60),
            half_open_max_calls: 2,
            sliding_window_size: 10,
            ..Default::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_waits_for_minimum_requests() {
        let cb = breaker();
        for _ in 0..3 {
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().failure_rate, 100.0);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());
        assert_eq!(cb.degradation_level(), DegradationLevel::Critical);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_opens_on_failure_rate() {
        let cb = breaker();
        cb.record_success();
        cb.record_success();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.statistics().total_opens, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_call_is_rejected_without_running() {
        let cb = breaker();
        for _ in 0..4 {
            cb.record_failure();
        }

        let mut ran = false;
        let result: Result<()> = cb
            .call(|| {
                ran = true;
                async { Ok(()) }
            })
            .await;

        assert!(!ran);
        assert!(matches!(result, Err(Error::CircuitOpen { .. })));
        assert!(result.unwrap_err().to_string().contains("is open"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_recovery() {
        let cb = breaker();
        for _ in 0..4 {
            cb.record_failure();
        }
        advance(Duration::from_secs(61)).await;

        assert!(cb.allow_request());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.degradation_level(), DegradationLevel::Warning);

        let _ = cb.call(|| async { Ok::<_, Error>(1) }).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        let _ = cb.call(|| async { Ok::<_, Error>(2) }).await;
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().failure_rate, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let cb = breaker();
        for _ in 0..4 {
            cb.record_failure();
        }
        advance(Duration::from_secs(61)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        let _: Result<()> = cb.call(|| async { Err(Error::network("api", "reset")) }).await;
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.statistics().total_opens, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warning_level_below_threshold() {
        let cb = breaker();
        // 40% >= 0.7 * 50%
        for success in [true, true, true, false, false] {
            cb.record_call(success, None);
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.degradation_level(), DegradationLevel::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_keeps_lifetime_counters() {
        let cb = breaker();
        for _ in 0..4 {
            cb.record_failure();
        }
        cb.reset();

        let snapshot = cb.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failure_rate, 0.0);
        assert_eq!(snapshot.failure_count, 4);
        assert_eq!(cb.statistics().uptime_percentage, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_open_and_close() {
        let cb = breaker();
        cb.open("maintenance window");
        assert!(cb.is_open());
        assert!(!cb.allow_request());

        cb.close();
        assert!(!cb.is_open());
        assert!(cb.allow_request());
        assert_eq!(cb.statistics().total_opens, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_warning_before_minimum_requests() {
        let cb = breaker();
        cb.record_failure();
        assert_eq!(cb.degradation_level(), DegradationLevel::Normal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_window_expires() {
        let cb = breaker();
        cb.record_failure();
        assert!(!cb.expire_inactive_window());

        advance(Duration::from_secs(301)).await;
        assert!(cb.expire_inactive_window());
        assert_eq!(cb.snapshot().consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_records_duration() {
        let cb = breaker();
        let _ = cb
            .call(|| async {
                tokio::time::sleep(Duration::from_millis(250)).await;
                Ok::<_, Error>(())
            })
            .await;
        let average = cb.average_call_duration().unwrap();
        assert!(average >= Duration::from_millis(250));
        assert_eq!(cb.statistics().uptime_percentage, 100.0);
    }
}
