/*!
Error Handling

This module provides the standardized error type shared by the kiosk crates.
It includes:

- Common error types
- Error context utilities
*/

pub mod types;
mod context;

pub use types::{Error, Result};
pub use context::{ErrorContext, ErrorExt};
