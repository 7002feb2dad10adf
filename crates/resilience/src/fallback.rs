//! Per-operation fallback producers.
//!
//! A [`FallbackStrategy`] maps operation names to producers of substitute
//! results. When the primary path fails, [`FallbackStrategy::get_fallback`]
//! runs the registered producer. The producer only runs when its condition
//! (if any) accepts the primary error. If the producer itself fails, the
//! caller sees the primary error, not the fallback's.

use excelmind_core::{Error, Result};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

type Producer<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;
type Condition = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

struct FallbackEntry<T> {
    producer: Producer<T>,
    condition: Option<Condition>,
}

/// What failed, handed to [`FallbackStrategy::get_fallback`]
#[derive(Debug)]
pub struct FallbackContext {
    pub operation: String,
    pub error: Error,
    pub original_input: Option<serde_json::Value>,
}

impl FallbackContext {
    pub fn new(operation: impl Into<String>, error: Error) -> Self {
        Self {
            operation: operation.into(),
            error,
            original_input: None,
        }
    }

    #[must_use]
    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.original_input = Some(input);
        self
    }
}

/// Registry of fallback producers keyed by operation name
pub struct FallbackStrategy<T> {
    entries: RwLock<HashMap<String, FallbackEntry<T>>>,
}

impl<T> Default for FallbackStrategy<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> std::fmt::Debug for FallbackStrategy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read();
        let mut operations: Vec<&String> = entries.keys().collect();
        operations.sort();
        f.debug_struct("FallbackStrategy")
            .field("operations", &operations)
            .finish()
    }
}

impl<T: Send + 'static> FallbackStrategy<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a producer for `operation`, replacing any previous one
    pub fn register<F, Fut>(&self, operation: impl Into<String>, producer: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.insert(operation.into(), Self::boxed(producer), None);
    }

    /// Register a producer that only runs when `condition` accepts the error
    pub fn register_when<F, Fut, C>(&self, operation: impl Into<String>, producer: F, condition: C)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        C: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.insert(
            operation.into(),
            Self::boxed(producer),
            Some(Arc::new(condition)),
        );
    }

    fn boxed<F, Fut>(producer: F) -> Producer<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Arc::new(move || producer().boxed())
    }

    fn insert(&self, operation: String, producer: Producer<T>, condition: Option<Condition>) {
        debug!(operation = %operation, conditional = condition.is_some(), "Registering fallback");
        self.entries
            .write()
            .insert(operation, FallbackEntry { producer, condition });
    }

    pub fn unregister(&self, operation: &str) -> bool {
        self.entries.write().remove(operation).is_some()
    }

    pub fn can_fallback(&self, operation: &str) -> bool {
        self.entries.read().contains_key(operation)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Produce a substitute result for a failed operation
    pub async fn get_fallback(&self, context: FallbackContext) -> Result<T> {
        let entry = {
            let entries = self.entries.read();
            entries
                .get(&context.operation)
                .map(|entry| (Arc::clone(&entry.producer), entry.condition.clone()))
        };

        let Some((producer, condition)) = entry else {
            return Err(Error::no_fallback(context.operation));
        };

        if let Some(condition) = condition {
            if !condition(&context.error) {
                debug!(
                    operation = %context.operation,
                    error = %context.error,
                    "Fallback condition rejected error"
                );
                return Err(context.error);
            }
        }

        match producer().await {
            Ok(value) => {
                info!(
                    operation = %context.operation,
                    error = %context.error,
                    "Serving fallback result"
                );
                Ok(value)
            }
            Err(fallback_error) => {
                warn!(
                    operation = %context.operation,
                    error = %context.error,
                    fallback_error = %fallback_error,
                    "Fallback failed"
                );
                Err(context.error)
            }
        }
    }
}

/// Ready-made producers for [`FallbackStrategy::register`]
pub mod producers {
    use excelmind_core::{Error, Result};
    use futures::future::{ready, Ready};

    /// Always yield a clone of `value`
    pub fn default_value<T>(value: T) -> impl Fn() -> Ready<Result<T>> + Send + Sync + 'static
    where
        T: Clone + Send + Sync + 'static,
    {
        move || ready(Ok(value.clone()))
    }

    /// Yield `T::default()`, e.g. an empty list
    pub fn empty<T>() -> impl Fn() -> Ready<Result<T>> + Send + Sync + 'static
    where
        T: Default + Send + 'static,
    {
        || ready(Ok(T::default()))
    }

    /// Fail with a user-facing message
    pub fn simplified_error<T>(
        message: impl Into<String>,
    ) -> impl Fn() -> Ready<Result<T>> + Send + Sync + 'static
    where
        T: Send + 'static,
    {
        let message = message.into();
        move || ready(Err(Error::operation(message.clone())))
    }
}
