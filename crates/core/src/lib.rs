//! Core domain types, errors, and constants for the ExcelMind resilience layer.
//!
//! ## Key Components
//!
//! - **`errors`**: The workspace `Error` enum and `Result` alias. Every
//!   failure the retry, fallback and degradation crates surface is one of
//!   these variants.
//! - **`types`**: Execution modes, severity levels, resource metrics,
//!   memory snapshots and notification payloads.
//! - **`events`**: Degradation event records and the synchronous
//!   `ListenerSet` used for subscriber fan-out.
//! - **`config`**: Serde helpers shared by every configuration struct.
//! - **`constants`**: Default thresholds and sizes.

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result},
    events::{
        DegradationEvent, DegradationEventKind, DegradationHistory, EventPayload, ListenerSet,
        Subscription,
    },
    types::*,
};
