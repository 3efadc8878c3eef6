//! Kiosk server configuration
//!
//! Every section has working defaults; a TOML file and `LOOKBOOK_*`
//! environment variables (e.g. `LOOKBOOK_SERVER__API_KEY`) override them.
//! The session TTL is deliberately absent: it is fixed at 90 seconds.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lookbook_infra_common::{load_layered, Error, LoggingConfig, Result};
use lookbook_session_core::{BroadcasterConfig, CoordinatorConfig};
use serde::Deserialize;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "LOOKBOOK";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub server: ServerConfig,
    pub sessions: SessionsConfig,
    pub events: EventsConfig,
    pub assets: AssetsConfig,
    pub mail: MailConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Required in `x-api-key` on API routes when set
    pub api_key: Option<String>,
    pub cors: bool,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3001)),
            api_key: None,
            cors: true,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self { sweep_interval_secs: 10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub idle_period_secs: u64,
    pub channel_capacity: usize,
    pub ws_keepalive_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            idle_period_secs: 10,
            channel_capacity: 1000,
            ws_keepalive_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory enumerated for outfit artwork
    pub outfits_dir: PathBuf,
    /// Directory served as static files
    pub public_dir: PathBuf,
    /// URL prefix the public directory is mounted under
    pub mount: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            outfits_dir: PathBuf::from("public/outfits"),
            public_dir: PathBuf::from("public"),
            mount: "/public".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from: String,
    pub subject: String,
    /// Outgoing messages are dropped here for the relay MTA
    pub pickup_dir: PathBuf,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "noreply@lookbook.local".to_string(),
            subject: "Your look is here.".to_string(),
            pickup_dir: PathBuf::from("mail/outbox"),
        }
    }
}

impl KioskConfig {
    /// Defaults, then the optional file, then the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config: KioskConfig = load_layered(file, ENV_PREFIX)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.events.idle_period_secs == 0 {
            return Err(Error::Config("events.idle_period_secs must be positive".into()));
        }
        if self.events.ws_keepalive_secs == 0 {
            return Err(Error::Config("events.ws_keepalive_secs must be positive".into()));
        }
        if self.sessions.sweep_interval_secs == 0 {
            return Err(Error::Config("sessions.sweep_interval_secs must be positive".into()));
        }
        if !self.assets.mount.starts_with('/') || self.assets.mount.len() < 2 || self.assets.mount.ends_with('/') {
            return Err(Error::Config(format!(
                "assets.mount must look like '/public', got '{}'",
                self.assets.mount
            )));
        }
        Ok(())
    }

    /// An empty API key means no key
    fn normalize(&mut self) {
        if self.server.api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            self.server.api_key = None;
        }
    }

    pub fn broadcaster(&self) -> BroadcasterConfig {
        BroadcasterConfig {
            capacity: self.events.channel_capacity,
            idle_period: Duration::from_secs(self.events.idle_period_secs),
        }
    }

    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            sweep_interval: Duration::from_secs(self.sessions.sweep_interval_secs),
        }
    }

    pub fn ws_keepalive(&self) -> Duration {
        Duration::from_secs(self.events.ws_keepalive_secs)
    }
}
