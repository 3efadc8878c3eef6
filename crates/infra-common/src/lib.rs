//! # Lookbook Infra-Common
//!
//! Shared plumbing for the lookbook kiosk crates:
//!
//! - [`errors`]: the common [`Error`] type and context helpers
//! - [`logging`]: `tracing` subscriber setup
//! - [`config`]: layered configuration loading (defaults, file, environment)

pub mod config;
pub mod errors;
pub mod logging;

pub use config::load_layered;
pub use errors::{Error, ErrorContext, ErrorExt, Result};
pub use logging::{log_welcome, setup_logging, LoggingConfig};
