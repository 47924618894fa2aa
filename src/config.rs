//! # Configuration
//!
//! Where the template and bundled logos live, how long an asset load may
//! take, and where each layer goes. Everything has a default, so a config
//! file only needs the keys it changes:
//!
//! ```toml
//! template = "public/template.png"
//! logo_dir = "public/logos"
//! load_timeout_ms = 5000
//! # font = "fonts/Arial.ttf"
//!
//! [layout.phone]
//! x = 300
//! baseline = 398
//! size = 30.0
//! color = [255, 255, 255]
//!
//! [layout.qr]
//! x = 280
//! y = 460
//! width = 250
//! height = 250
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::assets::AssetRegistry;
use crate::assets::AssetResolver;
use crate::batch::BatchOrchestrator;
use crate::error::{FlyerError, Result};
use crate::flyer::{FlyerCompositor, FlyerFont, FlyerLayout};

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyerConfig {
    /// Background template; its size is every page's size.
    pub template: PathBuf,
    /// Directory of bundled default logos.
    pub logo_dir: PathBuf,
    /// Upper bound on any single asset load.
    pub load_timeout_ms: u64,
    /// Optional TTF/OTF font for the phone line (Spleen bitmap otherwise).
    pub font: Option<PathBuf>,
    pub layout: FlyerLayout,
}

impl Default for FlyerConfig {
    fn default() -> Self {
        Self {
            template: PathBuf::from("public/template.png"),
            logo_dir: PathBuf::from("public/logos"),
            load_timeout_ms: 5000,
            font: None,
            layout: FlyerLayout::default(),
        }
    }
}

impl FlyerConfig {
    /// Read a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FlyerError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
            .map_err(|e| FlyerError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| FlyerError::Config(e.to_string()))
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Build the compositor, loading the font file if one is configured.
    pub fn compositor(&self) -> Result<FlyerCompositor> {
        let font = match &self.font {
            Some(path) => FlyerFont::from_file(path)?,
            None => FlyerFont::Spleen,
        };
        Ok(FlyerCompositor::new(
            self.template.clone(),
            self.layout.clone(),
            font,
        ))
    }

    /// A resolver over `registry` using this config's logo dir and timeout.
    pub fn resolver(&self, registry: Arc<AssetRegistry>) -> AssetResolver {
        AssetResolver::new(registry, self.logo_dir.clone()).with_timeout(self.load_timeout())
    }

    /// Orchestrator for one snapshot of uploaded images.
    pub fn orchestrator(
        &self,
        compositor: FlyerCompositor,
        registry: Arc<AssetRegistry>,
    ) -> BatchOrchestrator {
        BatchOrchestrator::new(compositor, self.resolver(registry))
    }
}
