//! Shared handler state

use std::sync::Arc;
use std::time::Duration;

use lookbook_session_core::{EventBroadcaster, KioskCoordinator, OutfitCatalog, SessionStore};

use crate::clients::ClientRegistry;
use crate::config::KioskConfig;
use crate::mail::{PickupDirMailer, SnapshotMailer};
use crate::media::{ImagePipeline, PassthroughPipeline, SnapshotLayout};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<KioskCoordinator>,
    pub pipeline: Arc<dyn ImagePipeline>,
    pub mailer: Arc<dyn SnapshotMailer>,
    pub clients: Arc<ClientRegistry>,
    pub layout: SnapshotLayout,
    pub ws_keepalive: Duration,
}

impl AppState {
    /// Wire the session core and the default seams from configuration.
    ///
    /// The coordinator is returned unstarted.
    pub fn from_config(config: &KioskConfig) -> Self {
        let catalog = Arc::new(OutfitCatalog::load_from_dir(&config.assets.outfits_dir));
        let store = SessionStore::new(catalog);
        let broadcaster = Arc::new(EventBroadcaster::new(config.broadcaster()));
        let coordinator = Arc::new(KioskCoordinator::new(store, broadcaster, config.coordinator()));

        Self::new(
            coordinator,
            Arc::new(PassthroughPipeline),
            Arc::new(PickupDirMailer::new(&config.mail)),
        )
        .with_ws_keepalive(config.ws_keepalive())
    }

    pub fn new(
        coordinator: Arc<KioskCoordinator>,
        pipeline: Arc<dyn ImagePipeline>,
        mailer: Arc<dyn SnapshotMailer>,
    ) -> Self {
        Self {
            coordinator,
            pipeline,
            mailer,
            clients: Arc::new(ClientRegistry::new()),
            layout: SnapshotLayout::default(),
            ws_keepalive: Duration::from_secs(15),
        }
    }

    pub fn with_ws_keepalive(mut self, period: Duration) -> Self {
        self.ws_keepalive = period;
        self
    }

    pub fn store(&self) -> &SessionStore {
        self.coordinator.store()
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        self.coordinator.broadcaster()
    }
}
