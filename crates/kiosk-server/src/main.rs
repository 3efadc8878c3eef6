use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lookbook_infra_common::{log_welcome, setup_logging};
use lookbook_kiosk_server::{create_router, AppState, KioskConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Lookbook kiosk backend
#[derive(Parser, Debug)]
#[command(name = "lookbook-kiosk", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides server.bind
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn apply(&self, config: &mut KioskConfig) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.json = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = KioskConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);
    config.logging.app_name = "lookbook-kiosk".to_string();

    setup_logging(&config.logging)?;
    log_welcome("lookbook-kiosk", env!("CARGO_PKG_VERSION"));

    if config.server.api_key.is_none() {
        warn!("No API key configured; session endpoints are open");
    }

    let state = AppState::from_config(&config);
    let coordinator = state.coordinator.clone();
    coordinator.start()?;

    let app = create_router(state, &config);
    let listener = TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!("Kiosk backend listening on http://{}", listener.local_addr()?);
    info!(
        "Static assets served from {} at {}",
        config.assets.public_dir.display(),
        config.assets.mount
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    coordinator.stop();
    coordinator.store().shutdown();
    info!("Kiosk backend stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
