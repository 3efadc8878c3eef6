//! REST, SSE and WebSocket routes

mod auth;
mod events;
mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::KioskConfig;
use crate::state::AppState;

pub use auth::{is_exempt_path, ApiKeyGuard};
pub use handlers::{CreateSessionResponse, EmailRequest, HealthResponse, OkResponse, OutfitsResponse};

/// Build the full router
///
/// The API-key layer is only installed when a key is configured.
pub fn create_router(state: AppState, config: &KioskConfig) -> Router {
    let mut router = Router::new()
        .route("/events", get(events::sse_handler))
        .route("/ws", get(events::ws_handler))
        .route("/session", post(handlers::create_session))
        .route("/session/{id}/email", post(handlers::send_email))
        .route("/session/{id}/skip", post(handlers::skip_session))
        .route("/outfits", get(handlers::get_outfits))
        .route("/health", get(handlers::health))
        .nest_service(&config.assets.mount, ServeDir::new(&config.assets.public_dir))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .with_state(state);

    if let Some(key) = config.server.api_key.as_deref() {
        router = router.layer(middleware::from_fn_with_state(
            ApiKeyGuard::new(key, &config.assets.mount),
            auth::require_api_key,
        ));
    }
    if config.server.cors {
        router = router.layer(CorsLayer::permissive());
    }
    router.layer(TraceLayer::new_for_http())
}
