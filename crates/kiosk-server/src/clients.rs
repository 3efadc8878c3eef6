//! Connected push clients

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

/// WebSocket clients currently attached, for health reporting
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: DashMap<String, DateTime<Utc>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new client and return its id
    pub fn register(&self) -> String {
        let client_id = Uuid::new_v4().to_string();
        self.clients.insert(client_id.clone(), Utc::now());
        info!("WebSocket client connected: {} ({} total)", client_id, self.len());
        client_id
    }

    pub fn unregister(&self, client_id: &str) {
        if let Some((_, connected_at)) = self.clients.remove(client_id) {
            let seconds = (Utc::now() - connected_at).num_seconds();
            info!(
                "WebSocket client disconnected: {} after {}s ({} total)",
                client_id,
                seconds,
                self.len()
            );
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
