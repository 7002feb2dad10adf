//! Configuration structs for retry and circuit breaker behavior.

use super::types::RetryOn;
use excelmind_core::config::{duration_ms, option_duration_ms};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Status codes and phrases that mark an error as transient
pub const TRANSIENT_INDICATORS: &[&str] = &[
    "network",
    "fetch failed",
    "timeout",
    "timed out",
    "rate limit",
    "429",
    "500",
    "502",
    "503",
];

/// Jitter amount used when none is configured, as a fraction of the delay
const DEFAULT_JITTER_FRACTION: f64 = 0.1;

/// Case-insensitive check of an error message against [`TRANSIENT_INDICATORS`]
pub fn is_transient_message(message: &str) -> bool {
    let message = message.to_lowercase();
    TRANSIENT_INDICATORS
        .iter()
        .any(|indicator| message.contains(indicator))
}

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategyType {
    ExponentialBackoff,
    LinearBackoff,
    FixedDelay,
    Immediate,
}

/// Configuration for retry behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub strategy: RetryStrategyType,
    /// Retries after the first attempt
    pub max_retries: usize,
    #[serde(rename = "initial_delay_ms", with = "duration_ms")]
    pub initial_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "option_duration_ms")]
    pub max_delay: Option<Duration>,
    /// Growth factor for exponential backoff
    pub backoff_multiplier: f64,
    pub jitter: bool,
    /// Half-width of the jitter window; 10% of the delay when unset
    #[serde(rename = "jitter_amount_ms", with = "option_duration_ms")]
    pub jitter_amount: Option<Duration>,
    /// Which errors are retried; not part of the settings document
    #[serde(skip)]
    pub retry_on: RetryOn,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::exponential_backoff()
    }
}

impl RetryConfig {
    /// Exponential backoff, suited to network requests
    pub fn exponential_backoff() -> Self {
        Self {
            strategy: RetryStrategyType::ExponentialBackoff,
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Some(Duration::from_secs(10)),
            backoff_multiplier: 2.0,
            jitter: true,
            jitter_amount: Some(Duration::from_millis(500)),
            retry_on: RetryOn::Transient,
        }
    }

    pub fn linear_backoff() -> Self {
        Self {
            strategy: RetryStrategyType::LinearBackoff,
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Some(Duration::from_secs(5)),
            backoff_multiplier: 2.0,
            jitter: true,
            jitter_amount: None,
            retry_on: RetryOn::Transient,
        }
    }

    pub fn fixed_delay() -> Self {
        Self {
            strategy: RetryStrategyType::FixedDelay,
            max_retries: 3,
            initial_delay: Duration::from_millis(2000),
            max_delay: None,
            backoff_multiplier: 2.0,
            jitter: false,
            jitter_amount: None,
            retry_on: RetryOn::Transient,
        }
    }

    /// Many quick attempts for short-lived glitches
    pub fn fast_retry() -> Self {
        Self {
            strategy: RetryStrategyType::ExponentialBackoff,
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Some(Duration::from_secs(1)),
            backoff_multiplier: 1.5,
            jitter: true,
            jitter_amount: None,
            retry_on: RetryOn::Transient,
        }
    }

    /// Few, widely spaced attempts for serious outages
    pub fn slow_retry() -> Self {
        Self {
            strategy: RetryStrategyType::ExponentialBackoff,
            max_retries: 2,
            initial_delay: Duration::from_millis(5000),
            max_delay: Some(Duration::from_secs(30)),
            backoff_multiplier: 2.0,
            jitter: true,
            jitter_amount: None,
            retry_on: RetryOn::Transient,
        }
    }

    /// Check if an error should be retried, ignoring the attempt budget
    pub fn is_retryable(&self, error: &excelmind_core::Error) -> bool {
        match &self.retry_on {
            RetryOn::All => true,
            RetryOn::Transient => is_transient_message(&error.to_string()),
            RetryOn::Custom(predicate) => predicate(error),
        }
    }

    /// Delay before retry `attempt` (0-indexed), clamped to `max_delay`, without jitter
    pub fn base_delay(&self, attempt: usize) -> Duration {
        let initial_ms = self.initial_delay.as_secs_f64() * 1000.0;
        let millis = match self.strategy {
            RetryStrategyType::ExponentialBackoff => {
                initial_ms * self.backoff_multiplier.powf(attempt as f64)
            }
            RetryStrategyType::LinearBackoff => initial_ms * (attempt as f64 + 1.0),
            RetryStrategyType::FixedDelay => initial_ms,
            RetryStrategyType::Immediate => 0.0,
        };

        let delay = millis_to_duration(millis);
        match self.max_delay {
            Some(max_delay) => delay.min(max_delay),
            None => delay,
        }
    }

    /// Delay before retry `attempt`, with jitter applied when enabled
    pub fn retry_delay(&self, attempt: usize) -> Duration {
        self.retry_delay_with_rng(attempt, &mut rand::thread_rng())
    }

    /// Same as [`RetryConfig::retry_delay`] with a caller-supplied RNG
    pub fn retry_delay_with_rng<R: Rng + ?Sized>(&self, attempt: usize, rng: &mut R) -> Duration {
        let delay = self.base_delay(attempt);
        if !self.jitter {
            return delay;
        }

        let delay_ms = delay.as_secs_f64() * 1000.0;
        let amount_ms = match self.jitter_amount {
            Some(amount) => amount.as_secs_f64() * 1000.0,
            None => delay_ms * DEFAULT_JITTER_FRACTION,
        };
        if amount_ms <= 0.0 {
            return delay;
        }

        let offset = rng.gen_range(-amount_ms..=amount_ms);
        millis_to_duration(delay_ms + offset)
    }
}

/// Microsecond precision, saturating; negative and NaN inputs become zero
fn millis_to_duration(millis: f64) -> Duration {
    let millis = millis.max(0.0);
    let whole = millis.trunc();
    let micros = ((millis - whole) * 1000.0).round() as u64;
    Duration::from_millis(whole as u64).saturating_add(Duration::from_micros(micros))
}

/// Configuration for the API circuit breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Service name used in logs and rejection errors
    pub service: String,
    /// Failure rate (percent) at or above which the circuit opens
    pub failure_threshold: f64,
    /// Calls in the window before the failure rate is trusted
    pub minimum_requests: usize,
    /// How long the circuit stays open before probing
    #[serde(rename = "open_duration_ms", with = "duration_ms")]
    pub open_duration: Duration,
    /// Successful probes needed to close from half-open
    pub half_open_max_calls: usize,
    /// Number of most recent calls kept for the failure rate
    pub sliding_window_size: usize,
    /// Idle time after which a closed circuit forgets its window
    #[serde(rename = "reset_timeout_ms", with = "duration_ms")]
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            service: "ai-api".to_string(),
            failure_threshold: 50.0,
            minimum_requests: 10,
            open_duration: Duration::from_secs(60),
            half_open_max_calls: 3,
            sliding_window_size: 100,
            reset_timeout: Duration::from_secs(300),
        }
    }
}
