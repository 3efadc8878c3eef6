use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use super::types::{SessionActivePayload, SessionEvent};
use crate::session_store::TerminationReason;
use crate::types::SessionId;

/// Live event feed for one subscriber; only events published after
/// subscribing are delivered
pub type EventStream = Pin<Box<dyn Stream<Item = SessionEvent> + Send>>;

#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Per-subscriber buffer before slow subscribers start lagging
    pub capacity: usize,
    /// Period of the idle heartbeat
    pub idle_period: Duration,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            idle_period: Duration::from_secs(10),
        }
    }
}

/// Pub/sub relay plus the idle heartbeat policy
///
/// In idle mode an `idle` event goes out immediately and then once per
/// period. At most one ticker runs: every start or stop bumps a generation
/// counter under the same lock the ticker checks before emitting, so a
/// superseded ticker can never emit after its replacement or after a
/// session announcement.
///
/// The broadcaster also remembers the last announced session. A return to
/// idle for any other session is stale (a newer visitor is already on
/// screen) and is dropped.
pub struct EventBroadcaster {
    shared: Arc<Shared>,
    idle_period: Duration,
}

struct Shared {
    sender: broadcast::Sender<SessionEvent>,
    idle: Mutex<IdleState>,
}

#[derive(Default)]
struct IdleState {
    generation: u64,
    ticker: Option<JoinHandle<()>>,
    announced: Option<SessionId>,
}

impl IdleState {
    fn cancel(&mut self) {
        self.generation += 1;
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Shared {
    fn send(&self, event: SessionEvent) -> usize {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!("Broadcast {} event to {} subscribers", kind, receivers);
                receivers
            }
            Err(broadcast::error::SendError(_)) => {
                // No receivers are currently listening, which is fine
                debug!("No subscribers listening for {} event", kind);
                0
            }
        }
    }

    /// Emit a periodic idle event if `generation` is still the live ticker
    fn tick(&self, generation: u64) -> bool {
        let idle = self.idle.lock();
        if idle.generation != generation {
            return false;
        }
        self.send(SessionEvent::Idle);
        true
    }
}

impl EventBroadcaster {
    pub fn new(config: BroadcasterConfig) -> Self {
        let (sender, _) = broadcast::channel(config.capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                sender,
                idle: Mutex::new(IdleState::default()),
            }),
            idle_period: config.idle_period,
        }
    }

    /// Fan an event out to all current subscribers; returns how many got it
    pub fn publish(&self, event: SessionEvent) -> usize {
        self.shared.send(event)
    }

    /// Subscribe to future events. Lagging subscribers skip what they
    /// missed and keep going.
    pub fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.shared.sender.subscribe())
            .filter_map(|item| async move {
                match item {
                    Ok(event) => Some(event),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!("Event subscriber lagged, skipped {} events", skipped);
                        None
                    }
                }
            })
            .boxed()
    }

    /// Raw receiver for callers that want to handle lag themselves
    pub fn subscribe_raw(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.sender.receiver_count()
    }

    pub fn is_idle(&self) -> bool {
        self.shared.idle.lock().ticker.is_some()
    }

    /// Enter idle mode, replacing any running ticker
    pub fn start_idle(&self) {
        let mut idle = self.shared.idle.lock();
        idle.announced = None;
        self.restart_idle(&mut idle, None);
    }

    /// Leave idle mode without announcing anything
    pub fn stop_idle(&self) {
        self.shared.idle.lock().cancel();
    }

    /// Suspend the idle ticker and announce a newly active session
    pub fn announce_session(&self, payload: SessionActivePayload) {
        let mut idle = self.shared.idle.lock();
        idle.cancel();
        idle.announced = Some(payload.session_id.clone());
        info!("Session {} active, idle mode suspended", payload.session_id);
        self.shared.send(SessionEvent::SessionActive(payload));
    }

    /// The single signal that follows a terminal transition: `timeout` when
    /// the session expired, then idle mode restarts (which emits `idle`).
    ///
    /// Returns `false` without emitting anything when a different session
    /// has been announced since `session_id`.
    pub fn return_to_idle(&self, session_id: &SessionId, reason: TerminationReason) -> bool {
        let mut idle = self.shared.idle.lock();
        if let Some(current) = idle.announced.as_ref().filter(|current| *current != session_id) {
            debug!(
                "Ignoring return to idle for {}, session {} is on screen",
                session_id, current
            );
            return false;
        }
        idle.announced = None;
        let prelude = reason.is_expiry().then_some(SessionEvent::Timeout);
        self.restart_idle(&mut idle, prelude);
        true
    }

    fn restart_idle(&self, idle: &mut IdleState, prelude: Option<SessionEvent>) {
        idle.cancel();
        let generation = idle.generation;

        if let Some(event) = prelude {
            self.shared.send(event);
        }
        self.shared.send(SessionEvent::Idle);

        idle.ticker = Some(spawn_idle_ticker(
            Arc::downgrade(&self.shared),
            generation,
            self.idle_period,
        ));
        debug!("Idle mode started (generation {})", generation);
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(BroadcasterConfig::default())
    }
}

impl Drop for EventBroadcaster {
    fn drop(&mut self) {
        self.stop_idle();
    }
}

fn spawn_idle_ticker(shared: Weak<Shared>, generation: u64, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let Some(shared) = shared.upgrade() else {
                break;
            };
            if !shared.tick(generation) {
                break;
            }
        }
    })
}
