//! Error Types for Session Core
//!
//! The state machine itself never fails for "already terminated"; it reports
//! a `bool` or a [`SessionLookup`](crate::SessionLookup). These errors cover
//! validation and the lookup outcomes a transport maps to status codes.

use thiserror::Error;

/// Main result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid gender '{0}': must be male, female, or neutral")]
    InvalidGender(String),

    #[error("Invalid outfit slot '{0}'")]
    InvalidSlot(String),

    #[error("Photo payload is empty")]
    EmptyPhoto,

    /// The id never existed
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The id existed but has already expired or been used
    #[error("Session expired or already used: {0}")]
    SessionGone(String),

    #[error("Failed to load outfit catalog from {path}: {source}")]
    CatalogLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    pub fn session_not_found(session_id: &str) -> Self {
        SessionError::SessionNotFound(session_id.to_string())
    }

    pub fn session_gone(session_id: &str) -> Self {
        SessionError::SessionGone(session_id.to_string())
    }

    pub fn internal(msg: &str) -> Self {
        SessionError::Internal(msg.to_string())
    }

    /// Validation failures are rejected before any state is touched
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidGender(_) | SessionError::InvalidSlot(_) | SessionError::EmptyPhoto
        )
    }
}
