//! Event records and the listener bus used for notification fan-out
//!
//! Publishers own a [`ListenerSet`] per payload type and call `emit`;
//! subscribers register plain closures and get a [`Subscription`] back.

pub mod listeners;
pub mod types;

pub use listeners::{ListenerSet, Subscription};
pub use types::{DegradationEvent, DegradationEventKind, DegradationHistory, EventPayload};
