//! Failure-rate circuit breaker for the AI API
//!
//! - [`metrics`] - Sliding window of recent call outcomes
//! - [`transitions`] - State transition logic
//! - [`state`] - The [`ApiCircuitBreaker`] itself
//!
//! ```rust,no_run
//! use excelmind_resilience::{ApiCircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> excelmind_core::Result<String> {
//! let cb = ApiCircuitBreaker::new(CircuitBreakerConfig::default());
//!
//! let result = cb.call(|| async {
//!     // Your operation here
//!     Ok("success".to_string())
//! }).await;
//! result
//! # }
//! ```

pub mod metrics;
pub mod state;
pub mod transitions;

pub use metrics::{CallRecord, CallWindow};
pub use state::ApiCircuitBreaker;
