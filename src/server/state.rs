//! Server state and configuration.

use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::batch::BatchOrchestrator;
use crate::config::FlyerConfig;
use crate::error::Result;
use crate::flyer::FlyerCompositor;
use crate::session::{Session, Snapshot};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Template, logo directory, timeout and layout.
    pub flyer: FlyerConfig,
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    /// Built once at startup (font file read here).
    pub compositor: FlyerCompositor,
    /// The single browser session this server drives.
    pub session: RwLock<Session>,
    /// Unix timestamp of server boot for cache busting.
    pub boot_time: u64,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let compositor = config.flyer.compositor()?;
        let boot_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(Self {
            config,
            compositor,
            session: RwLock::new(Session::new()),
            boot_time,
        })
    }

    /// Orchestrator bound to a snapshot of the current session.
    pub fn orchestrator(&self, snapshot: &Snapshot) -> BatchOrchestrator {
        self.config
            .flyer
            .orchestrator(self.compositor.clone(), snapshot.assets.clone())
    }
}
