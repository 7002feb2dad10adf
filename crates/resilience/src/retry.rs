//! Retry logic for resilient operations.

use crate::circuit::ApiCircuitBreaker;
use crate::config::RetryConfig;
use excelmind_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Runs an operation until it succeeds, fails permanently, or exhausts its retries
#[derive(Debug, Clone, Default)]
pub struct RetryStrategy {
    config: RetryConfig,
}

impl RetryStrategy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay before retry `attempt` (0-indexed), jittered when configured
    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.config.retry_delay(attempt)
    }

    /// Whether a failure on `attempt` (0-indexed) should be retried
    pub fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        attempt < self.config.max_retries && self.config.is_retryable(error)
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_with_observer(operation, |_, _, _| {}).await
    }

    /// Like [`RetryStrategy::execute`], calling `on_retry(error, attempt, delay)`
    /// before each wait
    pub async fn execute_with_observer<F, Fut, T, O>(
        &self,
        mut operation: F,
        mut on_retry: O,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        O: FnMut(&Error, usize, Duration),
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(retries = attempt, "Operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !self.should_retry(&error, attempt) {
                        debug!(attempt = attempt + 1, error = %error, "Giving up on operation");
                        return Err(error);
                    }

                    let delay = self.config.retry_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.config.max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Operation failed, retrying"
                    );
                    on_retry(&error, attempt, delay);
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Retry with circuit breaker protection
///
/// Rejections from an open circuit are not transient, so they end the retry loop.
pub async fn retry_with_circuit_breaker<F, Fut, T>(
    strategy: &RetryStrategy,
    circuit_breaker: &ApiCircuitBreaker,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    strategy
        .execute(|| circuit_breaker.call(&operation))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryStrategyType;
    use crate::types::RetryOn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn quick(max_retries: usize) -> RetryStrategy {
        RetryStrategy::new(RetryConfig {
            strategy: RetryStrategyType::FixedDelay,
            max_retries,
            initial_delay: Duration::from_millis(10),
            max_delay: None,
            jitter: false,
            ..RetryConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_transient_failures() {
        let counter = Arc::new(AtomicUsize::new(0));

        let result = quick(3)
            .execute(|| {
                let counter = Arc::clone(&counter);
                async move {
                    let count = counter.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err(Error::network("api", "connection reset"))
                    } else {
                        Ok("success")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_budget() {
        let counter = Arc::new(AtomicUsize::new(0));

        let result: Result<()> = quick(2)
            .execute(|| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(Error::http(503, "Service Unavailable"))
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Http { status: 503, .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_not_retried() {
        let counter = Arc::new(AtomicUsize::new(0));

        let result: Result<()> = quick(5)
            .execute(|| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(Error::validation("formula", "unbalanced parenthesis"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_sees_each_retry() {
        let mut seen = Vec::new();

        let result: Result<()> = quick(2)
            .execute_with_observer(
                || async { Err(Error::operation("request timed out")) },
                |error, attempt, delay| seen.push((error.to_string(), attempt, delay)),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(
            seen,
            vec![
                ("request timed out".to_string(), 0, Duration::from_millis(10)),
                ("request timed out".to_string(), 1, Duration::from_millis(10)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_follow_schedule() {
        let strategy = RetryStrategy::new(RetryConfig {
            strategy: RetryStrategyType::ExponentialBackoff,
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: None,
            backoff_multiplier: 2.0,
            jitter: false,
            ..RetryConfig::default()
        });

        let started = tokio::time::Instant::now();
        let _: Result<()> = strategy
            .execute(|| async { Err(Error::network("api", "down")) })
            .await;

        // 100 + 200 + 400
        assert!(started.elapsed() >= Duration::from_millis(700));
        assert!(started.elapsed() < Duration::from_millis(800));
    }

    #[test]
    fn test_should_retry_respects_predicate() {
        let strategy = RetryStrategy::new(RetryConfig {
            max_retries: 2,
            retry_on: RetryOn::custom(|e| matches!(e, Error::Unauthorized { .. })),
            ..RetryConfig::default()
        });

        let unauthorized = Error::unauthorized("token expired");
        assert!(strategy.should_retry(&unauthorized, 0));
        assert!(strategy.should_retry(&unauthorized, 1));
        assert!(!strategy.should_retry(&unauthorized, 2));
        assert!(!strategy.should_retry(&Error::network("api", "down"), 0));

        let all = RetryStrategy::new(RetryConfig {
            retry_on: RetryOn::All,
            ..RetryConfig::default()
        });
        assert!(all.should_retry(&Error::validation("x", "y"), 0));
    }
}
