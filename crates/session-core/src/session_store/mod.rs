//! Session lifecycle state machine
//!
//! Per id: `Active → Terminated` (absorbing). Unknown ids behave as
//! terminated for fast-path rejection but stay distinguishable through
//! [`SessionStore::lookup`].

mod state;
mod store;

pub use state::{SessionTerminated, StoreStats, TerminationReason, TimeoutHook};
pub use store::SessionStore;
