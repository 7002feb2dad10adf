//! Conversions from library errors
//!
//! Prefer the builders in `builders.rs` when the path or operation is known;
//! these only exist so `?` works on bare I/O and JSON calls.

use super::types::Error;
use std::path::PathBuf;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: format!("io ({:?})", source.kind()),
            source,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::Json {
            message: format!("invalid JSON at line {} column {}", source.line(), source.column()),
            source,
        }
    }
}
