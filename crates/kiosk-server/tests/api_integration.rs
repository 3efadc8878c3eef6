//! Router-level tests for the kiosk HTTP surface
//!
//! These tests verify:
//! - Session creation, validation and the session-active broadcast
//! - 404 versus 410 for unknown and terminated sessions
//! - Email delivery completes the session only on success
//! - Catalog, health, static files and API-key enforcement

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use lookbook_infra_common::Error;
use lookbook_kiosk_server::{
    create_router, AppState, EncodedImage, ImageFormat, KioskConfig, PassthroughPipeline, SnapshotMailer,
};
use lookbook_session_core::{
    CoordinatorConfig, EventBroadcaster, KioskCoordinator, OutfitCatalog, SessionEvent, SessionId, SessionStore,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "lookbook-test-boundary";
const PHOTO: &[u8] = b"\xff\xd8\xff\xe0visitor-photo";

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(String, SessionId, ImageFormat)>>,
    fail: bool,
}

#[async_trait]
impl SnapshotMailer for RecordingMailer {
    async fn send(
        &self,
        address: &str,
        image: EncodedImage,
        session_id: &SessionId,
    ) -> lookbook_infra_common::Result<()> {
        if self.fail {
            return Err(Error::ExternalService("relay unavailable".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((address.to_string(), session_id.clone(), image.format));
        Ok(())
    }
}

struct Harness {
    app: Router,
    state: AppState,
    mailer: Arc<RecordingMailer>,
    _public: TempDir,
}

fn harness_with(api_key: Option<&str>, mailer: RecordingMailer) -> Harness {
    let public = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(public.path().join("outfits")).unwrap();
    std::fs::write(public.path().join("outfits/male_top_1.png"), b"png").unwrap();

    let mut config = KioskConfig::default();
    config.server.api_key = api_key.map(str::to_string);
    config.assets.public_dir = public.path().to_path_buf();

    let catalog = Arc::new(OutfitCatalog::from_files(["male_top_1.png", "female_head_4.png"]));
    let coordinator = Arc::new(KioskCoordinator::new(
        SessionStore::new(catalog),
        Arc::new(EventBroadcaster::default()),
        CoordinatorConfig::default(),
    ));
    coordinator.start().unwrap();

    let mailer = Arc::new(mailer);
    let state = AppState::new(coordinator, Arc::new(PassthroughPipeline), mailer.clone());
    let app = create_router(state.clone(), &config);
    Harness {
        app,
        state,
        mailer,
        _public: public,
    }
}

fn harness() -> Harness {
    harness_with(None, RecordingMailer::default())
}

fn multipart_body(gender: Option<&str>, photo: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(gender) = gender {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"gender\"\r\n\r\n{gender}\r\n").as_bytes(),
        );
    }
    if let Some(photo) = photo {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"photo.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(photo);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn create_request(gender: Option<&str>, photo: Option<&[u8]>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/session")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(gender, photo)))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_session(h: &Harness, gender: &str) -> String {
    let (status, body) = send(&h.app, create_request(Some(gender), Some(PHOTO))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["sessionId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_session_announces_to_monitors() {
    let h = harness();
    let mut rx = h.state.broadcaster().subscribe_raw();

    let (status, body) = send(&h.app, create_request(Some("female"), Some(PHOTO))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ttlMs"], 90_000);
    let session_id = body["sessionId"].as_str().unwrap();

    match rx.recv().await.unwrap() {
        SessionEvent::SessionActive(payload) => {
            assert_eq!(payload.session_id.as_str(), session_id);
            assert_eq!(payload.outfits.head, "female_head_4.png");
            assert_eq!(payload.outfits.iter().count(), 6);
            assert!(payload.user_photo_token.starts_with("data:image/jpeg;base64,"));
        }
        other => panic!("expected session-active, got {:?}", other),
    }
    assert_eq!(h.state.store().active_count(), 1);
}

#[tokio::test]
async fn test_create_session_validation() {
    let h = harness();

    let (status, body) = send(&h.app, create_request(Some("robot"), Some(PHOTO))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");

    let (status, _) = send(&h.app, create_request(Some("male"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&h.app, create_request(Some("male"), Some(b""))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&h.app, create_request(None, Some(PHOTO))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&h.app, create_request(Some("male"), Some(b"plain text"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");

    assert_eq!(h.state.store().stats().total_created, 0);
}

#[tokio::test]
async fn test_preview_token_matches_upload_format() {
    let h = harness();
    let mut rx = h.state.broadcaster().subscribe_raw();

    let png = b"\x89PNG\r\n\x1a\nvisitor-photo";
    let (status, _) = send(&h.app, create_request(Some("neutral"), Some(png))).await;
    assert_eq!(status, StatusCode::CREATED);

    match rx.recv().await.unwrap() {
        SessionEvent::SessionActive(payload) => {
            assert!(payload.user_photo_token.starts_with("data:image/png;base64,"));
        }
        other => panic!("expected session-active, got {:?}", other),
    }
}

#[tokio::test]
async fn test_skip_then_gone() {
    let h = harness();
    let id = create_session(&h, "neutral").await;

    let (status, body) = send(&h.app, post_empty(&format!("/session/{id}/skip"))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({"ok": true}));

    let (status, _) = send(&h.app, post_empty(&format!("/session/{id}/skip"))).await;
    assert_eq!(status, StatusCode::GONE);

    let (status, _) = send(&h.app, post_empty("/session/session_unknown/skip")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_email_sends_and_completes() {
    let h = harness();
    let id = create_session(&h, "male").await;
    let uri = format!("/session/{id}/email");

    let (status, _) = send(&h.app, post_json(&uri, json!({"email": "not-an-address"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&h.app, post_json(&uri, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&h.app, post_json(&uri, json!({"email": "visitor@example.com"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({"ok": true}));

    {
        let sent = h.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "visitor@example.com");
        assert_eq!(sent[0].1.as_str(), id);
        assert_eq!(sent[0].2, ImageFormat::Jpeg);
    }

    let (status, _) = send(&h.app, post_json(&uri, json!({"email": "visitor@example.com"}))).await;
    assert_eq!(status, StatusCode::GONE);

    let (status, _) = send(
        &h.app,
        post_json("/session/session_unknown/email", json!({"email": "visitor@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(h.mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_email_failure_keeps_session_active() {
    let h = harness_with(
        None,
        RecordingMailer {
            fail: true,
            ..Default::default()
        },
    );
    let id = create_session(&h, "female").await;

    let (status, body) = send(
        &h.app,
        post_json(&format!("/session/{id}/email"), json!({"email": "visitor@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["message"].as_str().unwrap().contains("relay"));

    assert!(h.state.store().get(&SessionId::from(id.as_str())).is_some());
    let (status, _) = send(&h.app, post_empty(&format!("/session/{id}/skip"))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_outfits_listing() {
    let h = harness();
    let (status, body) = send(&h.app, get("/outfits")).await;
    assert_eq!(status, StatusCode::OK);

    let files = body["files"].as_object().unwrap();
    assert_eq!(files.len(), 18);
    assert_eq!(files["male_top"], json!(["male_top_1.png"]));
    assert_eq!(files["neutral_shoes"], json!([]));
    assert_eq!(body["randomOutfits"].as_object().unwrap().len(), 6);
}

#[tokio::test]
async fn test_health_reports_counts() {
    let h = harness();
    create_session(&h, "male").await;

    let (status, body) = send(&h.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["activeSessions"], 1);
    assert_eq!(body["connectedClients"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_static_assets_served() {
    let h = harness();
    let response = h.app.clone().oneshot(get("/public/outfits/male_top_1.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"png");
}

#[tokio::test]
async fn test_api_key_enforced_on_api_routes() {
    let h = harness_with(Some("kiosk-secret"), RecordingMailer::default());

    let (status, body) = send(&h.app, create_request(Some("male"), Some(PHOTO))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or missing API key");

    let mut request = create_request(Some("male"), Some(PHOTO));
    request.headers_mut().insert("x-api-key", "wrong".parse().unwrap());
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = create_request(Some("male"), Some(PHOTO));
    request.headers_mut().insert("x-api-key", "kiosk-secret".parse().unwrap());
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&h.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let response = h.app.clone().oneshot(get("/public/outfits/male_top_1.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_sse_starts_with_connected_frame() {
    let h = harness();
    let response = h.app.clone().oneshot(get("/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let data = frame.into_data().unwrap();
    let text = std::str::from_utf8(&data).unwrap();
    assert!(text.contains(r#"data: {"type":"connected"}"#), "{text}");

    h.state.broadcaster().publish(SessionEvent::Timeout);
    let frame = body.frame().await.unwrap().unwrap();
    let data = frame.into_data().unwrap();
    let text = std::str::from_utf8(&data).unwrap();
    assert!(text.contains(r#"data: {"type":"timeout"}"#), "{text}");
}
