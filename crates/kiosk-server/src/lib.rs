//! # Lookbook Kiosk Server
//!
//! HTTP front end for the kiosk session lifecycle:
//!
//! - `POST /session` creates a session from a photo and gender
//! - `POST /session/{id}/email` and `POST /session/{id}/skip` complete it
//! - `GET /events` (SSE) and `GET /ws` (WebSocket) push lifecycle events to
//!   monitors
//! - `GET /outfits`, `GET /health` and static assets under `/public`
//!
//! The lifecycle itself lives in `lookbook-session-core`; this crate maps
//! its outcomes onto status codes and hosts the imaging and mail seams.

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod mail;
pub mod media;
pub mod state;

pub use api::create_router;
pub use config::KioskConfig;
pub use error::{ApiError, ApiResult};
pub use mail::{PickupDirMailer, SnapshotMailer};
pub use media::{EncodedImage, ImageFormat, ImagePipeline, PassthroughPipeline, SnapshotLayout};
pub use state::AppState;
