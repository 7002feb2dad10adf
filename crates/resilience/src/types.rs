//! Core types and enums shared by the retry and circuit breaker modules.

use excelmind_core::Error;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Instant;

/// Which errors should trigger a retry
#[derive(Clone, Default)]
pub enum RetryOn {
    /// Retry when the error message matches a transient indicator
    #[default]
    Transient,
    /// Retry on all errors
    All,
    /// Custom retry predicate
    Custom(Arc<dyn Fn(&Error) -> bool + Send + Sync>),
}

impl RetryOn {
    /// Build a custom predicate
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        RetryOn::Custom(Arc::new(predicate))
    }
}

impl std::fmt::Debug for RetryOn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryOn::Transient => write!(f, "RetryOn::Transient"),
            RetryOn::All => write!(f, "RetryOn::All"),
            RetryOn::Custom(_) => write!(f, "RetryOn::Custom(<predicate>)"),
        }
    }
}

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests pass through normally
    Closed,
    /// Requests are rejected
    Open,
    /// Probing whether the service recovered
    HalfOpen,
}

impl CircuitState {
    pub const fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the breaker
#[derive(Debug, Clone)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub is_open: bool,
    /// Failed calls since the breaker was created
    pub failure_count: usize,
    /// Successful calls since the breaker was created
    pub success_count: usize,
    pub total_calls: usize,
    /// Failure percentage over the sliding window
    pub failure_rate: f64,
    /// Trailing failures in the sliding window
    pub consecutive_failures: usize,
    pub last_failure_time: Option<Instant>,
    pub last_success_time: Option<Instant>,
    pub opened_at: Option<Instant>,
    pub half_open_requests: usize,
}

/// Lifetime counters for reporting
#[derive(Debug, Clone, Serialize)]
pub struct CircuitStatistics {
    pub total_opens: usize,
    pub total_successful_calls: usize,
    pub total_failed_calls: usize,
    pub total_calls: usize,
    pub current_state: CircuitState,
    /// Share of all calls that succeeded; 100 when nothing was recorded
    pub uptime_percentage: f64,
}
