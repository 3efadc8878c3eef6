//! Session and catalog endpoints

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use lookbook_session_core::{Gender, OutfitSelection, SessionId, SESSION_TTL_MS};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::mail::validate_address;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
    pub ttl_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitsResponse {
    pub files: BTreeMap<String, Vec<String>>,
    pub random_outfits: OutfitSelection,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub active_sessions: usize,
    pub connected_clients: usize,
}

/// `POST /session`: multipart `photo` file plus `gender` text field
pub async fn create_session(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<CreateSessionResponse>)> {
    let mut photo: Option<Bytes> = None;
    let mut gender: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("photo") => photo = Some(field.bytes().await?),
            Some("gender") => gender = Some(field.text().await?),
            _ => {}
        }
    }

    let photo = photo
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Photo is required".into()))?;
    let gender: Gender = gender.unwrap_or_default().trim().parse()?;

    // Preview first so a failure leaves no session behind
    let preview = state.pipeline.preview(&photo).await?;
    let session = state.coordinator.begin_session(gender, photo, preview.data_url())?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
            ttl_ms: SESSION_TTL_MS,
        }),
    ))
}

/// `POST /session/{id}/email`: compose the snapshot, mail it, then complete
pub async fn send_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<EmailRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OkResponse>)> {
    let Json(request) = body?;
    let email = request
        .email
        .filter(|email| email.contains('@'))
        .ok_or_else(|| ApiError::BadRequest("Valid email is required".into()))?;
    validate_address(&email)?;

    let session_id = SessionId::from(id);
    let session = state.store().lookup(&session_id).into_result(&session_id)?;

    let snapshot = state
        .pipeline
        .compose(&session.user_photo, &session.selected_outfits, &state.layout)
        .await?;
    state.mailer.send(&email, snapshot, &session_id).await?;
    drop(session);

    if state.coordinator.finish_session(&session_id) {
        info!("Snapshot for session {} sent", session_id);
    } else {
        warn!("Session {} ended while its snapshot was being sent", session_id);
    }
    Ok((StatusCode::ACCEPTED, Json(OkResponse { ok: true })))
}

/// `POST /session/{id}/skip`: complete without email
pub async fn skip_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<OkResponse>)> {
    let session_id = SessionId::from(id);
    state.store().lookup(&session_id).into_result(&session_id)?;

    if !state.coordinator.finish_session(&session_id) {
        return Err(ApiError::Gone("Session expired or already used".into()));
    }
    info!("Session {} skipped", session_id);
    Ok((StatusCode::ACCEPTED, Json(OkResponse { ok: true })))
}

/// `GET /outfits`: full listing plus one coherent idle set
pub async fn get_outfits(State(state): State<AppState>) -> Json<OutfitsResponse> {
    let catalog = state.store().catalog();
    Json(OutfitsResponse {
        files: catalog.list_all(),
        random_outfits: catalog.pick_idle_set(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        active_sessions: state.store().active_count(),
        connected_clients: state.clients.len(),
    })
}
