//! Push channels for monitors
//!
//! Both channels subscribe at connect time and only see events published
//! afterwards.

use std::convert::Infallible;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Response;
use chrono::Utc;
use futures::stream::{self, SplitSink, Stream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::debug;

use crate::state::AppState;

/// `GET /events`: Server-Sent Events
pub async fn sse_handler(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let updates = state.broadcaster().subscribe().filter_map(|event| async move {
        match Event::default().json_data(&event) {
            Ok(frame) => Some(Ok::<_, Infallible>(frame)),
            Err(e) => {
                debug!("Dropping unserializable {} event: {}", event.kind(), e);
                None
            }
        }
    });
    let connected = Event::default().data(r#"{"type":"connected"}"#);
    debug!("SSE subscriber attached");

    Sse::new(stream::once(async move { Ok::<_, Infallible>(connected) }).chain(updates)).keep_alive(KeepAlive::default())
}

/// `GET /ws`: WebSocket fan-out with keepalives
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    event: &'a str,
    payload: T,
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_id = state.clients.register();
    let mut events = state.broadcaster().subscribe();
    let (mut sender, mut receiver) = socket.split();

    let connected = json!({
        "type": "connected",
        "timestamp": Utc::now().timestamp_millis(),
        "clientId": client_id,
    });

    if send_envelope(&mut sender, "session-event", &connected).await.is_ok() {
        let period = state.ws_keepalive;
        let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                event = events.next() => {
                    let Some(event) = event else { break };
                    if send_envelope(&mut sender, "session-event", &event).await.is_err() {
                        break;
                    }
                }
                _ = keepalive.tick() => {
                    let payload = json!({
                        "type": "keepalive",
                        "timestamp": Utc::now().timestamp_millis(),
                    });
                    if send_envelope(&mut sender, "keepalive", &payload).await.is_err() {
                        break;
                    }
                }
                incoming = receiver.next() => match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Monitors are receive-only
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    state.clients.unregister(&client_id);
}

async fn send_envelope<T: Serialize>(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &str,
    payload: &T,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(&Envelope { event, payload }).map_err(axum::Error::new)?;
    sender.send(Message::Text(text.into())).await
}
