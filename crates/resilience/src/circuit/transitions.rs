//! State transition logic for the API circuit breaker.

use super::metrics::{CallRecord, CallWindow};
use crate::config::CircuitBreakerConfig;
use crate::types::CircuitState;
use tokio::time::Instant;
use tracing::{info, warn};

/// Mutable breaker state, guarded by the breaker's lock
#[derive(Debug)]
pub struct BreakerState {
    pub state: CircuitState,
    pub window: CallWindow,
    pub opened_at: Option<Instant>,
    pub half_open_calls: usize,
    pub last_activity: Instant,
    pub total_opens: usize,
    pub total_successes: usize,
    pub total_failures: usize,
}

impl BreakerState {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            state: CircuitState::Closed,
            window: CallWindow::new(config.sliding_window_size),
            opened_at: None,
            half_open_calls: 0,
            last_activity: Instant::now(),
            total_opens: 0,
            total_successes: 0,
            total_failures: 0,
        }
    }

    pub fn transition_to_open(&mut self, config: &CircuitBreakerConfig) {
        if self.state == CircuitState::Open {
            return;
        }
        warn!(
            service = %config.service,
            failure_rate = self.window.failure_rate(),
            "Circuit breaker opening"
        );
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.half_open_calls = 0;
        self.total_opens += 1;
    }

    pub fn transition_to_half_open(&mut self, config: &CircuitBreakerConfig) {
        if self.state == CircuitState::HalfOpen {
            return;
        }
        info!(service = %config.service, "Circuit breaker entering half-open state");
        self.state = CircuitState::HalfOpen;
        self.half_open_calls = 0;
    }

    /// Closing forgets the window so old failures cannot re-trip the breaker
    pub fn transition_to_closed(&mut self, config: &CircuitBreakerConfig) {
        if self.state == CircuitState::Closed {
            return;
        }
        info!(service = %config.service, "Circuit breaker closing");
        self.state = CircuitState::Closed;
        self.opened_at = None;
        self.half_open_calls = 0;
        self.window.clear();
    }

    /// Move Open to HalfOpen once the open duration has elapsed
    pub fn check_half_open_transition(&mut self, config: &CircuitBreakerConfig) -> bool {
        if self.state != CircuitState::Open {
            return false;
        }
        match self.opened_at {
            Some(opened_at) if opened_at.elapsed() >= config.open_duration => {
                self.transition_to_half_open(config);
                true
            }
            _ => false,
        }
    }

    pub fn record(&mut self, record: CallRecord, config: &CircuitBreakerConfig) {
        self.window.push(record);
        self.last_activity = record.at;
        if record.success {
            self.total_successes += 1;
        } else {
            self.total_failures += 1;
        }

        match self.state {
            CircuitState::HalfOpen => {
                self.half_open_calls += 1;
                if !record.success {
                    self.transition_to_open(config);
                } else if self.half_open_calls >= config.half_open_max_calls {
                    self.transition_to_closed(config);
                }
            }
            CircuitState::Closed => {
                if self.window.len() >= config.minimum_requests
                    && self.window.failure_rate() >= config.failure_threshold
                {
                    self.transition_to_open(config);
                }
            }
            CircuitState::Open => {
                self.check_half_open_transition(config);
            }
        }
    }

    /// Forget the window of a closed breaker that has been idle past `reset_timeout`
    pub fn expire_inactive(&mut self, config: &CircuitBreakerConfig) -> bool {
        if self.state != CircuitState::Closed || self.window.is_empty() {
            return false;
        }
        if self.last_activity.elapsed() < config.reset_timeout {
            return false;
        }
        info!(service = %config.service, "Resetting idle circuit breaker window");
        self.window.clear();
        true
    }
}
