//! Error types for the resilience layer

mod builders;
mod conversions;
mod display;
mod types;

pub use types::{Error, Result};
