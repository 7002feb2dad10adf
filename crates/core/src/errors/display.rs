//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Network { endpoint, message } => {
                write!(f, "network error for '{endpoint}': {message}")
            }
            Error::Timeout {
                operation,
                duration,
            } => {
                write!(f, "operation '{operation}' timed out after {duration:?}")
            }
            Error::RateLimited { service, message } => {
                write!(f, "rate limit exceeded for '{service}': {message}")
            }
            Error::Http { status, message } => {
                write!(f, "HTTP {status}: {message}")
            }
            Error::Operation { message } => f.write_str(message),
            Error::Validation { field, message } => {
                write!(f, "validation error for '{field}': {message}")
            }
            Error::Unauthorized { message } => {
                write!(f, "unauthorized: {message}")
            }
            Error::NoFallback { operation } => {
                write!(f, "no fallback registered for operation '{operation}'")
            }
            Error::CircuitOpen { service } => {
                write!(f, "circuit breaker for '{service}' is open - service unavailable")
            }
            Error::Configuration { message } => {
                write!(f, "configuration error: {message}")
            }
            Error::Json { message, .. } => {
                write!(f, "JSON error: {message}")
            }
            Error::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "file system {} operation failed for '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
        }
    }
}
