//! # Lookbook Session-Core
//!
//! The kiosk's session lifecycle: a visitor's photo is paired with random
//! outfit artwork, announced to the monitors, and purged again after an
//! explicit completion or a hard 90 second timeout.
//!
//! ## Components
//!
//! ```text
//! ┌──────────────────┐  Terminated   ┌───────────────────┐  return_to_idle  ┌──────────────────┐
//! │   SessionStore   │──────────────▶│  KioskCoordinator │─────────────────▶│ EventBroadcaster │──▶ subscribers
//! └────────┬─────────┘  (channel)    └───────────────────┘                  └──────────────────┘
//!          │ select_outfits
//!          ▼
//! ┌──────────────────┐
//! │  OutfitCatalog   │
//! └──────────────────┘
//! ```
//!
//! - [`OutfitCatalog`]: read-only pool of outfit asset filenames per gender and slot.
//! - [`SessionStore`]: owns the `Active → Terminated` state machine. Every
//!   terminal trigger (timer, explicit completion, lazy expiry on read, sweep)
//!   goes through one check-and-set transition, so the first one wins and the
//!   rest are no-ops.
//! - [`EventBroadcaster`]: transport-agnostic pub/sub relay plus the idle
//!   heartbeat ticker.
//! - [`KioskCoordinator`]: glue that turns the store's lifecycle events into
//!   broadcasts, and runs the periodic sweep.

pub mod catalog;
pub mod coordinator;
pub mod errors;
pub mod events;
pub mod session_store;
pub mod types;

pub use catalog::OutfitCatalog;
pub use coordinator::{CoordinatorConfig, KioskCoordinator};
pub use errors::{Result, SessionError};
pub use events::{BroadcasterConfig, EventBroadcaster, SessionActivePayload, SessionEvent};
pub use session_store::{SessionStore, SessionTerminated, StoreStats, TerminationReason};
pub use types::{
    Gender, OutfitSelection, Session, SessionId, SessionLookup, Slot, SESSION_TTL, SESSION_TTL_MS,
};
