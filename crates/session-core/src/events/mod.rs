//! Session Event System
//!
//! Lifecycle broadcasts for the monitors, built on `tokio::sync::broadcast`.
//! Holds no session data.

mod broadcaster;
mod types;

pub use broadcaster::{BroadcasterConfig, EventBroadcaster, EventStream};
pub use types::{SessionActivePayload, SessionEvent};
