//! Core types for session-core

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, SessionError};

/// Fixed, non-renewable session time-to-live in milliseconds
pub const SESSION_TTL_MS: u64 = 90_000;

/// Fixed, non-renewable session time-to-live
pub const SESSION_TTL: Duration = Duration::from_millis(SESSION_TTL_MS);

/// Opaque session token, never reused
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(format!("session_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Outfit pool a session draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "neutral" => Ok(Gender::Neutral),
            other => Err(SessionError::InvalidGender(other.to_string())),
        }
    }
}

/// Body region an outfit asset fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Head,
    Top,
    Bottom,
    Shoes,
    Left,
    Right,
}

impl Slot {
    pub const ALL: [Slot; 6] = [Slot::Head, Slot::Top, Slot::Bottom, Slot::Shoes, Slot::Left, Slot::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Head => "head",
            Slot::Top => "top",
            Slot::Bottom => "bottom",
            Slot::Shoes => "shoes",
            Slot::Left => "left",
            Slot::Right => "right",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        Slot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| SessionError::InvalidSlot(s.to_string()))
    }
}

/// One asset filename per slot, fixed at session creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutfitSelection {
    pub head: String,
    pub top: String,
    pub bottom: String,
    pub shoes: String,
    pub left: String,
    pub right: String,
}

impl OutfitSelection {
    /// Build a selection by asking `pick` for every slot
    pub fn from_fn(mut pick: impl FnMut(Slot) -> String) -> Self {
        Self {
            head: pick(Slot::Head),
            top: pick(Slot::Top),
            bottom: pick(Slot::Bottom),
            shoes: pick(Slot::Shoes),
            left: pick(Slot::Left),
            right: pick(Slot::Right),
        }
    }

    pub fn get(&self, slot: Slot) -> &str {
        match slot {
            Slot::Head => &self.head,
            Slot::Top => &self.top,
            Slot::Bottom => &self.bottom,
            Slot::Shoes => &self.shoes,
            Slot::Left => &self.left,
            Slot::Right => &self.right,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &str)> {
        Slot::ALL.into_iter().map(move |slot| (slot, self.get(slot)))
    }
}

/// One kiosk visit
///
/// The photo is reference counted; the registry's copy is dropped on the
/// terminal transition.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub gender: Gender,
    pub user_photo: Bytes,
    pub selected_outfits: OutfitSelection,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn ttl_ms(&self) -> i64 {
        (self.expires_at - self.created_at).num_milliseconds()
    }
}

/// Outcome of looking up a session id
///
/// Keeps "never existed" apart from "existed but terminated" for transports
/// that expose both.
#[derive(Debug, Clone)]
pub enum SessionLookup {
    Active(Session),
    Gone,
    NotFound,
}

impl SessionLookup {
    pub fn into_result(self, session_id: &SessionId) -> Result<Session> {
        match self {
            SessionLookup::Active(session) => Ok(session),
            SessionLookup::Gone => Err(SessionError::session_gone(session_id.as_str())),
            SessionLookup::NotFound => Err(SessionError::session_not_found(session_id.as_str())),
        }
    }
}
