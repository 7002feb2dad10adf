//! Retry followed by fallback.

use crate::config::RetryConfig;
use crate::fallback::{FallbackContext, FallbackStrategy};
use crate::retry::RetryStrategy;
use excelmind_core::Result;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Retries an operation, then asks the fallback registry when retries are exhausted
#[derive(Debug)]
pub struct ResilienceStrategy<T> {
    retry: RetryStrategy,
    fallback: Option<Arc<FallbackStrategy<T>>>,
}

impl<T: Send + 'static> ResilienceStrategy<T> {
    pub fn new(retry: RetryStrategy, fallback: Option<Arc<FallbackStrategy<T>>>) -> Self {
        Self { retry, fallback }
    }

    /// Build from a retry configuration, e.g. one read from settings
    pub fn with_config(config: RetryConfig, fallback: Option<Arc<FallbackStrategy<T>>>) -> Self {
        Self::new(RetryStrategy::new(config), fallback)
    }

    /// Exponential backoff preset with an optional fallback registry
    pub fn with_defaults(fallback: Option<Arc<FallbackStrategy<T>>>) -> Self {
        Self::with_config(RetryConfig::exponential_backoff(), fallback)
    }

    pub fn retry_strategy(&self) -> &RetryStrategy {
        &self.retry
    }

    pub fn fallback_strategy(&self) -> Option<&Arc<FallbackStrategy<T>>> {
        self.fallback.as_ref()
    }

    /// Run `operation` under retry, then fallback
    pub async fn execute<F, Fut>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_with_input(operation_name, None, operation)
            .await
    }

    /// Same as [`ResilienceStrategy::execute`], handing `input` to the fallback
    pub async fn execute_with_input<F, Fut>(
        &self,
        operation_name: &str,
        input: Option<serde_json::Value>,
        operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let error = match self.retry.execute(operation).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let Some(fallback) = &self.fallback else {
            return Err(error);
        };
        if !fallback.can_fallback(operation_name) {
            return Err(error);
        }

        info!(operation = operation_name, error = %error, "Retries exhausted, trying fallback");
        let context = FallbackContext {
            operation: operation_name.to_string(),
            error,
            original_input: input,
        };
        fallback.get_fallback(context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryStrategyType;
    use crate::fallback::producers::default_value;
    use excelmind_core::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn retry(max_retries: usize) -> RetryStrategy {
        RetryStrategy::new(RetryConfig {
            strategy: RetryStrategyType::Immediate,
            max_retries,
            jitter: false,
            ..RetryConfig::default()
        })
    }

    #[tokio::test]
    async fn test_success_skips_fallback() {
        let strategy = ResilienceStrategy::new(retry(2), None);
        let value = strategy
            .execute("analyze", || async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_fallback_after_retries() {
        let fallbacks = Arc::new(FallbackStrategy::new());
        fallbacks.register("analyze", default_value(0));
        let strategy = ResilienceStrategy::new(retry(2), Some(Arc::clone(&fallbacks)));

        let attempts = AtomicUsize::new(0);
        let value = strategy
            .execute("analyze", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::network("api", "down")) }
            })
            .await
            .unwrap();

        assert_eq!(value, 0);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unregistered_operation_returns_primary_error() {
        let fallbacks = Arc::new(FallbackStrategy::<i32>::new());
        let strategy = ResilienceStrategy::new(retry(0), Some(fallbacks));

        let result = strategy
            .execute("analyze", || async { Err(Error::validation("cell", "empty")) })
            .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_fallback_receives_input() {
        let fallbacks = Arc::new(FallbackStrategy::new());
        fallbacks.register("echo", || async { Ok("fallback".to_string()) });
        let strategy = ResilienceStrategy::new(retry(0), Some(fallbacks));

        let result = strategy
            .execute_with_input(
                "echo",
                Some(serde_json::json!({ "range": "A1:B2" })),
                || async { Err(Error::timeout("echo", Duration::from_secs(30))) },
            )
            .await;
        assert_eq!(result.unwrap(), "fallback");
    }

    #[test]
    fn test_defaults_use_exponential_backoff() {
        let strategy = ResilienceStrategy::<()>::with_defaults(None);
        let config = strategy.retry_strategy().config();
        assert_eq!(config.strategy, RetryStrategyType::ExponentialBackoff);
        assert_eq!(config.max_retries, 3);
        assert!(strategy.fallback_strategy().is_none());
    }
}
