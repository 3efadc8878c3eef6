use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::Bytes;
use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::state::{ActiveEntry, Registry, SessionTerminated, StoreStats, TerminationReason, TimeoutHook};
use crate::catalog::OutfitCatalog;
use crate::errors::{Result, SessionError};
use crate::types::{Gender, Session, SessionId, SessionLookup, SESSION_TTL};

/// Owner of the session registry and its lifecycle state machine
///
/// All four terminal triggers (timer, explicit completion, lazy expiry on
/// read, sweep) go through [`Registry::detach`] under one lock, so exactly
/// one of them performs the transition for a given id. Terminations are
/// reported on an internal channel (see [`SessionStore::take_lifecycle_events`])
/// rather than by touching the broadcaster directly.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    registry: Mutex<Registry>,
    catalog: Arc<OutfitCatalog>,
    ttl: Duration,
    lifecycle_tx: mpsc::UnboundedSender<SessionTerminated>,
    lifecycle_rx: Mutex<Option<mpsc::UnboundedReceiver<SessionTerminated>>>,
}

impl SessionStore {
    /// Create a store with the fixed 90 second TTL
    pub fn new(catalog: Arc<OutfitCatalog>) -> Self {
        Self::with_ttl(catalog, SESSION_TTL)
    }

    /// Create a store with a custom TTL. Only meant for test harnesses that
    /// need a shortened timer.
    pub fn with_ttl(catalog: Arc<OutfitCatalog>, ttl: Duration) -> Self {
        let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(StoreInner {
                registry: Mutex::new(Registry::default()),
                catalog,
                ttl,
                lifecycle_tx,
                lifecycle_rx: Mutex::new(Some(lifecycle_rx)),
            }),
        }
    }

    pub fn catalog(&self) -> &Arc<OutfitCatalog> {
        &self.inner.catalog
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Take the receiving end of the termination channel. There is a single
    /// consumer; later calls return `None`.
    pub fn take_lifecycle_events(&self) -> Option<mpsc::UnboundedReceiver<SessionTerminated>> {
        self.inner.lifecycle_rx.lock().take()
    }

    /// Create a session and arm its one-shot expiry timer.
    ///
    /// `on_timeout` runs exactly once if the session ends by expiry (timer,
    /// lazy read or sweep) and is dropped uncalled on explicit completion.
    /// Must be called from within a Tokio runtime.
    pub fn create<F>(&self, gender: Gender, photo: Bytes, on_timeout: F) -> Result<Session>
    where
        F: FnOnce(SessionId) + Send + 'static,
    {
        if photo.is_empty() {
            return Err(SessionError::EmptyPhoto);
        }

        let selected_outfits = self.inner.catalog.select_outfits(gender);
        let ttl_ms = i64::try_from(self.inner.ttl.as_millis())
            .map_err(|_| SessionError::internal("session TTL out of range"))?;
        let created_at = Utc::now();
        let session = Session {
            id: SessionId::new(),
            gender,
            user_photo: photo,
            selected_outfits,
            created_at,
            expires_at: created_at + TimeDelta::milliseconds(ttl_ms),
        };
        let deadline = Instant::now() + self.inner.ttl;

        let mut registry = self.inner.registry.lock();
        if registry.active.contains_key(&session.id) || registry.terminated.contains(&session.id) {
            return Err(SessionError::internal("session id collision"));
        }

        let timer = spawn_expiry_timer(Arc::downgrade(&self.inner), session.id.clone(), deadline);
        registry.active.insert(
            session.id.clone(),
            ActiveEntry {
                session: session.clone(),
                deadline,
                timer: Some(timer),
                on_timeout: Some(Box::new(on_timeout) as TimeoutHook),
            },
        );
        registry.stats.total_created += 1;
        drop(registry);

        info!(
            "Session {} created ({}), expires at {}",
            session.id,
            gender,
            session.expires_at.to_rfc3339()
        );
        Ok(session)
    }

    /// The session if it is still active; expired sessions are terminated
    /// inline and reported absent
    pub fn get(&self, session_id: &SessionId) -> Option<Session> {
        match self.lookup(session_id) {
            SessionLookup::Active(session) => Some(session),
            SessionLookup::Gone | SessionLookup::NotFound => None,
        }
    }

    /// Like [`get`](Self::get) but keeps "never existed" apart from
    /// "already terminated"
    pub fn lookup(&self, session_id: &SessionId) -> SessionLookup {
        let mut registry = self.inner.registry.lock();
        if registry.terminated.contains(session_id) {
            return SessionLookup::Gone;
        }
        match registry.active.get(session_id) {
            None => return SessionLookup::NotFound,
            Some(entry) if !entry.is_expired(Instant::now()) => {
                return SessionLookup::Active(entry.session.clone());
            }
            Some(_) => {}
        }

        let detached = registry.detach(session_id, TerminationReason::ExpiredOnRead);
        drop(registry);
        if let Some(entry) = detached {
            self.inner.finish(entry, TerminationReason::ExpiredOnRead);
        }
        SessionLookup::Gone
    }

    /// True for terminated and for unknown ids
    pub fn is_terminated(&self, session_id: &SessionId) -> bool {
        !matches!(self.lookup(session_id), SessionLookup::Active(_))
    }

    /// Explicit completion. Returns whether this call performed the
    /// transition; `false` means the session was already terminal, unknown,
    /// or past its expiry (in which case it is expired instead).
    pub fn complete(&self, session_id: &SessionId) -> bool {
        let mut registry = self.inner.registry.lock();
        let reason = match registry.active.get(session_id) {
            None => {
                debug!("Completion of {} ignored: not active", session_id);
                return false;
            }
            Some(entry) if entry.is_expired(Instant::now()) => TerminationReason::ExpiredOnRead,
            Some(_) => TerminationReason::Completed,
        };

        let detached = registry.detach(session_id, reason);
        drop(registry);
        match detached {
            Some(entry) => {
                self.inner.finish(entry, reason);
                reason == TerminationReason::Completed
            }
            None => false,
        }
    }

    /// Sessions currently active and not past their expiry
    pub fn active_count(&self) -> usize {
        let now = Instant::now();
        self.inner
            .registry
            .lock()
            .active
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Force the terminal transition of every active session past its
    /// expiry. Returns how many were terminated by this pass.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let detached: Vec<ActiveEntry> = {
            let mut registry = self.inner.registry.lock();
            let expired: Vec<SessionId> = registry
                .active
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(id, _)| id.clone())
                .collect();
            expired
                .iter()
                .filter_map(|id| registry.detach(id, TerminationReason::Swept))
                .collect()
        };

        let count = detached.len();
        for entry in detached {
            self.inner.finish(entry, TerminationReason::Swept);
        }
        if count > 0 {
            info!("Swept {} expired sessions", count);
        }
        count
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.registry.lock().stats
    }

    /// Drop every active session and cancel its timer without emitting
    /// lifecycle events. Used at process teardown.
    pub fn shutdown(&self) {
        let drained: Vec<ActiveEntry> = {
            let mut registry = self.inner.registry.lock();
            let ids: Vec<SessionId> = registry.active.keys().cloned().collect();
            registry.terminated.extend(ids);
            registry.active.drain().map(|(_, entry)| entry).collect()
        };
        for entry in &drained {
            if let Some(timer) = &entry.timer {
                timer.abort();
            }
        }
        if !drained.is_empty() {
            info!("Session store shut down, discarded {} active sessions", drained.len());
        }
    }
}

impl StoreInner {
    /// Side effects of a transition that already won the check-and-set:
    /// cancel the timer, purge the data, report the termination.
    fn finish(&self, mut entry: ActiveEntry, reason: TerminationReason) {
        if let Some(timer) = entry.timer.take() {
            if reason != TerminationReason::TimedOut {
                timer.abort();
            }
        }
        let hook = if reason.is_expiry() { entry.on_timeout.take() } else { None };
        let session_id = entry.session.id.clone();
        drop(entry);

        match reason {
            TerminationReason::Completed => info!("Session {} marked as used and cleaned up", session_id),
            _ => info!("Session {} expired ({:?})", session_id, reason),
        }

        let event = SessionTerminated {
            session_id: session_id.clone(),
            reason,
            at: Utc::now(),
        };
        if self.lifecycle_tx.send(event).is_err() {
            debug!("No lifecycle listener for termination of {}", session_id);
        }

        if let Some(hook) = hook {
            hook(session_id);
        }
    }

    fn expire_by_timer(&self, session_id: &SessionId) {
        let detached = self.registry.lock().detach(session_id, TerminationReason::TimedOut);
        match detached {
            Some(entry) => self.finish(entry, TerminationReason::TimedOut),
            None => debug!("Timer for {} fired after termination", session_id),
        }
    }
}

fn spawn_expiry_timer(
    store: Weak<StoreInner>,
    session_id: SessionId,
    deadline: Instant,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep_until(deadline).await;
        match store.upgrade() {
            Some(inner) => inner.expire_by_timer(&session_id),
            None => warn!("Timer for {} fired after the store was dropped", session_id),
        }
    })
}
