use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::errors::{Result, SessionError};
use crate::events::{EventBroadcaster, SessionActivePayload};
use crate::session_store::{SessionStore, SessionTerminated};
use crate::types::{Gender, Session, SessionId};

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How often the sweep pass looks for sessions whose timer was missed
    pub sweep_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(10),
        }
    }
}

/// Owner of the background tasks that tie the store to the broadcaster
pub struct KioskCoordinator {
    store: SessionStore,
    broadcaster: Arc<EventBroadcaster>,
    config: CoordinatorConfig,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl KioskCoordinator {
    pub fn new(store: SessionStore, broadcaster: Arc<EventBroadcaster>, config: CoordinatorConfig) -> Self {
        Self {
            store,
            broadcaster,
            config,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    /// Enter idle mode and spawn the lifecycle listener and the sweep loop.
    ///
    /// The store has a single lifecycle consumer, so a second call fails.
    pub fn start(&self) -> Result<()> {
        let events = self
            .store
            .take_lifecycle_events()
            .ok_or_else(|| SessionError::internal("coordinator already started"))?;

        self.broadcaster.start_idle();

        let listener = tokio::spawn(run_lifecycle_listener(events, self.broadcaster.clone()));
        let sweeper = tokio::spawn(run_sweep_loop(self.store.clone(), self.config.sweep_interval));

        let mut tasks = self.tasks.lock();
        tasks.push(listener);
        tasks.push(sweeper);
        drop(tasks);

        info!(
            "KioskCoordinator started (sweep every {:?})",
            self.config.sweep_interval
        );
        Ok(())
    }

    /// Abort background tasks and silence the idle ticker
    pub fn stop(&self) {
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in &tasks {
            task.abort();
        }
        self.broadcaster.stop_idle();
        if !tasks.is_empty() {
            info!("KioskCoordinator stopped");
        }
    }

    /// Create a session and announce it to monitors before returning it
    pub fn begin_session(&self, gender: Gender, photo: Bytes, preview_token: String) -> Result<Session> {
        let session = self.store.create(gender, photo, |session_id| {
            warn!("Session {} timed out", session_id);
        })?;

        self.broadcaster.announce_session(SessionActivePayload {
            session_id: session.id.clone(),
            gender: session.gender,
            outfits: session.selected_outfits.clone(),
            user_photo_token: preview_token,
        });
        Ok(session)
    }

    /// Explicit completion; the return to idle follows from the listener
    pub fn finish_session(&self, session_id: &SessionId) -> bool {
        self.store.complete(session_id)
    }
}

impl Drop for KioskCoordinator {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

async fn run_lifecycle_listener(
    mut events: mpsc::UnboundedReceiver<SessionTerminated>,
    broadcaster: Arc<EventBroadcaster>,
) {
    while let Some(event) = events.recv().await {
        debug!(
            "Session {} terminated ({:?}) at {}",
            event.session_id,
            event.reason,
            event.at.to_rfc3339()
        );
        broadcaster.return_to_idle(&event.session_id, event.reason);
    }
    debug!("Lifecycle channel closed");
}

async fn run_sweep_loop(store: SessionStore, period: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        store.sweep();
    }
}
