//! API key middleware

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Open routes: the health check and both push channels (browsers cannot
/// attach headers to EventSource or WebSocket handshakes)
const EXEMPT_PATHS: &[&str] = &["/health", "/events", "/ws"];

/// Key check state, built once per router
#[derive(Clone)]
pub struct ApiKeyGuard {
    expected: Arc<str>,
    static_mount: Arc<str>,
}

impl ApiKeyGuard {
    pub fn new(expected: &str, static_mount: &str) -> Self {
        Self {
            expected: Arc::from(expected),
            static_mount: Arc::from(static_mount),
        }
    }

    /// Whether `path` is reachable without a key
    pub fn is_exempt(&self, path: &str) -> bool {
        is_exempt_path(path, &self.static_mount)
    }
}

/// Open routes plus everything under the static asset mount
pub fn is_exempt_path(path: &str, static_mount: &str) -> bool {
    EXEMPT_PATHS.contains(&path)
        || path
            .strip_prefix(static_mount)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Reject API requests whose `x-api-key` does not match
pub async fn require_api_key(State(guard): State<ApiKeyGuard>, request: Request, next: Next) -> Response {
    if guard.is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if keys_match(key, &guard.expected) => next.run(request).await,
        _ => {
            warn!("Rejected {} {}: invalid or missing API key", request.method(), request.uri().path());
            ApiError::Unauthorized.into_response()
        }
    }
}

/// Comparison time does not depend on where the keys differ
fn keys_match(provided: &str, expected: &str) -> bool {
    bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exempt_paths() {
        let guard = ApiKeyGuard::new("secret", "/public");
        assert!(guard.is_exempt("/health"));
        assert!(guard.is_exempt("/events"));
        assert!(guard.is_exempt("/ws"));
        assert!(guard.is_exempt("/public/outfits/male_top_1.png"));

        assert!(!guard.is_exempt("/session"));
        assert!(!guard.is_exempt("/session/abc/email"));
        assert!(!guard.is_exempt("/outfits"));
        assert!(!guard.is_exempt("/api/health"));
        assert!(!guard.is_exempt("/publicity"));
        assert!(!guard.is_exempt("/index.html"));
    }

    #[test]
    fn test_exemption_follows_mount() {
        assert!(is_exempt_path("/assets/logo.png", "/assets"));
        assert!(!is_exempt_path("/public/logo.png", "/assets"));
    }

    #[test]
    fn test_keys_match() {
        assert!(keys_match("secret", "secret"));
        assert!(!keys_match("secreT", "secret"));
        assert!(!keys_match("secret-longer", "secret"));
        assert!(!keys_match("", "secret"));
    }
}
