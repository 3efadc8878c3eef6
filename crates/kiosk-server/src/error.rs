//! HTTP error mapping

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lookbook_session_core::SessionError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors a handler can answer with
///
/// Downstream and internal failures are logged in full and answered with a
/// generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Gone(String),

    /// Image composition or mail delivery failed; the session stays active
    #[error("Downstream failure: {0}")]
    Downstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Gone(_) => StatusCode::GONE,
            Self::Downstream(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Downstream(_) => "Failed to process snapshot".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": self.public_message(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::EmptyPhoto => ApiError::BadRequest("Photo is required".into()),
            e @ (SessionError::InvalidGender(_) | SessionError::InvalidSlot(_)) => {
                ApiError::BadRequest(e.to_string())
            }
            SessionError::SessionNotFound(_) => ApiError::NotFound("Session not found".into()),
            SessionError::SessionGone(_) => ApiError::Gone("Session expired or already used".into()),
            e @ (SessionError::CatalogLoad { .. } | SessionError::Internal(_)) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

/// Imaging and mail seams report through the shared error type
impl From<lookbook_infra_common::Error> for ApiError {
    fn from(err: lookbook_infra_common::Error) -> Self {
        match err {
            lookbook_infra_common::Error::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::Downstream(other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Malformed upload: {}", err.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}
