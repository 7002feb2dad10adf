//! Resilience patterns for ExcelMind's remote calls
//!
//! - [`config`] - Retry presets and circuit breaker configuration
//! - [`types`] - `RetryOn`, circuit states and snapshots
//! - [`retry`] - [`RetryStrategy`] and retry through a circuit breaker
//! - [`fallback`] - Per-operation fallback producers
//! - [`strategy`] - [`ResilienceStrategy`], retry followed by fallback
//! - [`circuit`] - Failure-rate circuit breaker for the AI API
//!
//! ## Examples
//!
//! ### Basic Retry
//!
//! ```rust,no_run
//! use excelmind_resilience::{RetryConfig, RetryStrategy};
//!
//! # async fn example() -> excelmind_core::Result<String> {
//! let strategy = RetryStrategy::new(RetryConfig::exponential_backoff());
//! strategy.execute(|| async {
//!     // Your operation here
//!     Ok("success".to_string())
//! }).await
//! # }
//! ```
//!
//! ### Retry then Fallback
//!
//! ```rust,no_run
//! use excelmind_resilience::{producers, FallbackStrategy, ResilienceStrategy};
//! use std::sync::Arc;
//!
//! # async fn example() -> excelmind_core::Result<Vec<String>> {
//! let fallbacks = Arc::new(FallbackStrategy::new());
//! fallbacks.register("suggest_formulas", producers::empty());
//!
//! let strategy = ResilienceStrategy::with_defaults(Some(fallbacks));
//! strategy.execute("suggest_formulas", || async {
//!     Ok(vec!["=SUM(A1:A10)".to_string()])
//! }).await
//! # }
//! ```

pub mod circuit;
pub mod config;
pub mod fallback;
pub mod retry;
pub mod strategy;
pub mod types;

pub use circuit::ApiCircuitBreaker;
pub use config::{
    is_transient_message, CircuitBreakerConfig, RetryConfig, RetryStrategyType,
    TRANSIENT_INDICATORS,
};
pub use fallback::{producers, FallbackContext, FallbackStrategy};
pub use retry::{retry_with_circuit_breaker, RetryStrategy};
pub use strategy::ResilienceStrategy;
pub use types::{CircuitSnapshot, CircuitState, CircuitStatistics, RetryOn};
