use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::types::{Session, SessionId};

/// Callback invoked once when a session ends by expiry
pub type TimeoutHook = Box<dyn FnOnce(SessionId) + Send + 'static>;

/// Which trigger performed the terminal transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Explicit completion (email sent or skipped)
    Completed,
    /// The per-session timer fired
    TimedOut,
    /// A read found the session past its expiry
    ExpiredOnRead,
    /// The periodic sweep found the session past its expiry
    Swept,
}

impl TerminationReason {
    /// Every trigger except explicit completion is an expiry
    pub fn is_expiry(&self) -> bool {
        !matches!(self, TerminationReason::Completed)
    }
}

/// Domain event emitted exactly once per terminated session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTerminated {
    pub session_id: SessionId,
    pub reason: TerminationReason,
    pub at: DateTime<Utc>,
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_created: u64,
    pub total_completed: u64,
    pub total_expired: u64,
}

pub(crate) struct ActiveEntry {
    pub session: Session,
    pub deadline: Instant,
    pub timer: Option<JoinHandle<()>>,
    pub on_timeout: Option<TimeoutHook>,
}

impl ActiveEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Everything guarded by the store's single lock
#[derive(Default)]
pub(crate) struct Registry {
    pub active: HashMap<SessionId, ActiveEntry>,
    /// Ids that left `Active`; remembered to reject stale references
    pub terminated: HashSet<SessionId>,
    pub stats: StoreStats,
}

impl Registry {
    /// The check-and-set half of every terminal transition
    pub fn detach(&mut self, session_id: &SessionId, reason: TerminationReason) -> Option<ActiveEntry> {
        let entry = self.active.remove(session_id)?;
        self.terminated.insert(session_id.clone());
        if reason.is_expiry() {
            self.stats.total_expired += 1;
        } else {
            self.stats.total_completed += 1;
        }
        Some(entry)
    }
}
