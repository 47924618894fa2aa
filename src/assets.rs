//! # Asset Registry and Resolver
//!
//! Uploaded images live in an [`AssetRegistry`] keyed by their original
//! filename. Uploads merge into the registry; a later upload with the same
//! filename replaces the earlier one.
//!
//! The [`AssetResolver`] maps a logo identifier to an [`AssetLocation`]
//! (uploaded image first, bundled `<logo_dir>/<identifier>` second) and
//! loads locations into decoded images. Resolution never fails; loading
//! returns [`FlyerError::AssetUnavailable`] when the bytes are missing,
//! undecodable, or slower than the configured timeout.

use async_trait::async_trait;
use image::DynamicImage;
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{FlyerError, Result};

/// Session-scoped store of uploaded images, keyed by exact filename.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    images: HashMap<String, Arc<[u8]>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one image. Returns true if an image with this name was replaced.
    pub fn insert(&mut self, filename: impl Into<String>, bytes: Vec<u8>) -> bool {
        self.images
            .insert(filename.into(), Arc::from(bytes))
            .is_some()
    }

    /// Merge another registry into this one (union, `other` wins on collision).
    pub fn merge(&mut self, other: AssetRegistry) {
        self.images.extend(other.images);
    }

    pub fn get(&self, filename: &str) -> Option<Arc<[u8]>> {
        self.images.get(filename).cloned()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.images.contains_key(filename)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Registered filenames, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.images.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Where a logo identifier points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    /// An uploaded image in the registry.
    Uploaded(String),
    /// A bundled default asset on disk.
    Bundled(PathBuf),
    /// The identifier cannot name a bundled asset (empty, absolute, or
    /// escaping the logo directory). Loading it always fails.
    Invalid { identifier: String, reason: &'static str },
}

impl fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetLocation::Uploaded(name) => write!(f, "upload:{}", name),
            AssetLocation::Bundled(path) => write!(f, "{}", path.display()),
            AssetLocation::Invalid { identifier, .. } => write!(f, "logo '{}'", identifier),
        }
    }
}

/// Byte source for assets that live outside the registry.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Reads bundled assets from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

#[async_trait]
impl AssetStore for FsStore {
    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

/// Default bound on a single asset load.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves and loads images against an immutable registry snapshot.
#[derive(Clone)]
pub struct AssetResolver {
    registry: Arc<AssetRegistry>,
    logo_dir: PathBuf,
    store: Arc<dyn AssetStore>,
    timeout: Duration,
}

impl AssetResolver {
    /// Create a resolver reading bundled logos from `logo_dir` on disk.
    pub fn new(registry: Arc<AssetRegistry>, logo_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            logo_dir: logo_dir.into(),
            store: Arc::new(FsStore),
            timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }

    /// Replace the byte source used for bundled assets and the template.
    pub fn with_store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.store = store;
        self
    }

    /// Set the per-load timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Map a logo identifier to its location. Never fails.
    pub fn resolve(&self, identifier: &str) -> AssetLocation {
        if self.registry.contains(identifier) {
            return AssetLocation::Uploaded(identifier.to_string());
        }

        if identifier.is_empty() {
            return AssetLocation::Invalid {
                identifier: String::new(),
                reason: "empty logo identifier",
            };
        }

        let relative = Path::new(identifier);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return AssetLocation::Invalid {
                identifier: identifier.to_string(),
                reason: "identifier escapes the logo directory",
            };
        }

        AssetLocation::Bundled(self.logo_dir.join(relative))
    }

    /// Load and decode an image location.
    ///
    /// Fetching and decoding together are bounded by the load timeout;
    /// decoding runs on the blocking pool.
    pub async fn load(&self, location: &AssetLocation) -> Result<DynamicImage> {
        tracing::debug!("Loading asset {}", location);
        let name = location.to_string();
        match tokio::time::timeout(self.timeout, self.fetch_and_decode(location, &name)).await {
            Ok(result) => result,
            Err(_) => Err(FlyerError::asset(
                name,
                format!("load timed out after {} ms", self.timeout.as_millis()),
            )),
        }
    }

    /// Resolve then load a logo identifier.
    pub async fn load_logo(&self, identifier: &str) -> Result<DynamicImage> {
        let location = self.resolve(identifier);
        self.load(&location).await
    }

    /// Load an image from the asset store, bounded by the timeout.
    pub async fn load_path(&self, path: &Path) -> Result<DynamicImage> {
        self.load(&AssetLocation::Bundled(path.to_path_buf())).await
    }

    async fn fetch_and_decode(&self, location: &AssetLocation, name: &str) -> Result<DynamicImage> {
        let bytes: Arc<[u8]> = match location {
            AssetLocation::Uploaded(filename) => self
                .registry
                .get(filename)
                .ok_or_else(|| FlyerError::asset(name, "not in registry"))?,
            AssetLocation::Bundled(path) => Arc::from(
                self.store
                    .read(path)
                    .await
                    .map_err(|e| FlyerError::asset(name, e))?,
            ),
            AssetLocation::Invalid { reason, .. } => return Err(FlyerError::asset(name, reason)),
        };
        decode(name.to_string(), bytes).await
    }
}

async fn decode(name: String, bytes: Arc<[u8]>) -> Result<DynamicImage> {
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes)
            .map_err(|e| FlyerError::asset(name, format!("decode failed: {}", e)))
    })
    .await
    .map_err(|e| FlyerError::Image(format!("decode task failed: {}", e)))?
}
