use serde::{Deserialize, Serialize};

use crate::types::{Gender, OutfitSelection, SessionId};

/// Events published to every monitor
///
/// Wire shape: `{"type":"idle"}`, `{"type":"timeout"}` and
/// `{"type":"session","data":{...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SessionEvent {
    /// Idle heartbeat; monitors show the attract loop
    Idle,
    /// A visitor's session became active
    #[serde(rename = "session")]
    SessionActive(SessionActivePayload),
    /// The active session expired without completion
    Timeout,
}

impl SessionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Idle => "idle",
            SessionEvent::SessionActive(_) => "session",
            SessionEvent::Timeout => "timeout",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionEvent::Idle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionActivePayload {
    pub session_id: SessionId,
    pub gender: Gender,
    pub outfits: OutfitSelection,
    /// `data:` URL of a web-sized preview of the visitor's photo
    pub user_photo_token: String,
}
