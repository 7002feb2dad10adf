//! Core error type definitions

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for resilience-layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for resilience-layer operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network-related errors
    Network { endpoint: String, message: String },

    /// Operation timeout errors
    Timeout { operation: String, duration: Duration },

    /// Upstream rate limiting
    RateLimited { service: String, message: String },

    /// Non-success HTTP status from an upstream service
    Http { status: u16, message: String },

    /// Opaque application failure carrying only a message
    Operation { message: String },

    /// Input validation errors
    Validation { field: String, message: String },

    /// Authentication/authorization failures
    Unauthorized { message: String },

    /// No fallback producer registered for an operation
    NoFallback { operation: String },

    /// Circuit breaker rejected the call
    CircuitOpen { service: String },

    /// Configuration errors
    Configuration { message: String },

    /// JSON serialization/deserialization errors
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// File system operations
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },
}
