//! Kiosk coordinator
//!
//! Wires the session store to the event broadcaster: session creation is
//! announced before the caller sees the session, and every termination the
//! store reports is turned into exactly one return to idle.

mod coordinator;

pub use coordinator::{CoordinatorConfig, KioskCoordinator};
