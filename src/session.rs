//! # Session State
//!
//! The session owns the current record set, the uploaded image registry and
//! the "flyers generated" flag, expressed as a small state machine:
//!
//! ```text
//!            upload table (non-empty)            generate
//!   NoData ─────────────────────────▶ DataLoaded ─────────▶ FlyersGenerated
//!     ▲                                   ▲                        │
//!     └──── upload table (empty) ─────────┴── upload table ────────┘
//! ```
//!
//! Image uploads never change the state. Renders work on a [`Snapshot`] so
//! later uploads cannot affect a render that is already running.

use serde::Serialize;
use std::sync::Arc;

use crate::assets::AssetRegistry;
use crate::error::{FlyerError, Result};
use crate::record::{Record, TableLoad};

/// Where the session is in the upload → generate → export flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    NoData,
    DataLoaded,
    FlyersGenerated,
}

/// User actions, exposed only when valid for the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    UploadTable,
    UploadImages,
    GenerateFlyers,
    PreviewFlyers,
    ExportOne,
    ExportAll,
}

impl SessionState {
    pub fn available_actions(self) -> &'static [Action] {
        match self {
            SessionState::NoData => &[Action::UploadTable, Action::UploadImages],
            SessionState::DataLoaded => &[
                Action::UploadTable,
                Action::UploadImages,
                Action::GenerateFlyers,
            ],
            SessionState::FlyersGenerated => &[
                Action::UploadTable,
                Action::UploadImages,
                Action::PreviewFlyers,
                Action::ExportOne,
                Action::ExportAll,
            ],
        }
    }

    pub fn allows(self, action: Action) -> bool {
        self.available_actions().contains(&action)
    }
}

/// Immutable view of the session used by a render.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub records: Arc<[Record]>,
    pub assets: Arc<AssetRegistry>,
}

/// One user's working set.
#[derive(Debug, Clone)]
pub struct Session {
    records: Arc<[Record]>,
    assets: Arc<AssetRegistry>,
    state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            records: Arc::from(Vec::new()),
            assets: Arc::new(AssetRegistry::new()),
            state: SessionState::NoData,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    pub fn available_actions(&self) -> &'static [Action] {
        self.state.available_actions()
    }

    /// Replace the record set. Always clears the generated flag.
    pub fn load_table(&mut self, load: TableLoad) {
        self.records = Arc::from(load.records);
        self.state = if self.records.is_empty() {
            SessionState::NoData
        } else {
            SessionState::DataLoaded
        };
        tracing::info!("Loaded {} record(s), state {:?}", self.records.len(), self.state);
    }

    /// Merge uploaded images into the registry.
    ///
    /// Copy-on-write: snapshots taken earlier keep the registry they saw.
    pub fn add_images(&mut self, images: AssetRegistry) {
        let added = images.len();
        Arc::make_mut(&mut self.assets).merge(images);
        tracing::info!("Registered {} image(s), {} total", added, self.assets.len());
    }

    /// Mark flyers as generated for the current record set.
    pub fn generate(&mut self) -> Result<()> {
        self.require(Action::GenerateFlyers)?;
        self.state = SessionState::FlyersGenerated;
        Ok(())
    }

    /// Fail with `InvalidState` unless `action` is valid now.
    pub fn require(&self, action: Action) -> Result<()> {
        if self.state.allows(action) {
            Ok(())
        } else {
            Err(FlyerError::InvalidState(format!(
                "{:?} is not available in state {:?}",
                action, self.state
            )))
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            records: Arc::clone(&self.records),
            assets: Arc::clone(&self.assets),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSource;

    fn table(csv: &str) -> TableLoad {
        RecordSource::parse(csv.as_bytes()).unwrap()
    }

    fn registry(entries: &[(&str, u8)]) -> AssetRegistry {
        let mut r = AssetRegistry::new();
        for (name, byte) in entries {
            r.insert(*name, vec![*byte]);
        }
        r
    }

    #[test]
    fn test_initial_state() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::NoData);
        assert!(session.require(Action::GenerateFlyers).is_err());
        assert!(session.require(Action::UploadImages).is_ok());
    }

    #[test]
    fn test_upload_resets_generated_flag() {
        let mut session = Session::new();
        session.load_table(table("logo,phone\na.png,1\n"));
        session.generate().unwrap();
        assert_eq!(session.state(), SessionState::FlyersGenerated);

        session.load_table(table("logo,phone\nb.png,2\nc.png,3\n"));
        assert_eq!(session.state(), SessionState::DataLoaded);
        assert_eq!(session.records().len(), 2);
        assert!(session.require(Action::ExportAll).is_err());
    }

    #[test]
    fn test_empty_table_returns_to_no_data() {
        let mut session = Session::new();
        session.load_table(table("logo,phone\na.png,1\n"));
        session.generate().unwrap();

        session.load_table(table("logo,phone\n"));
        assert_eq!(session.state(), SessionState::NoData);
        assert!(session.generate().is_err());
    }

    #[test]
    fn test_generate_twice_is_rejected() {
        let mut session = Session::new();
        session.load_table(table("logo\na.png\n"));
        session.generate().unwrap();
        assert!(matches!(session.generate(), Err(FlyerError::InvalidState(_))));
    }

    #[test]
    fn test_image_uploads_are_additive() {
        let mut session = Session::new();
        session.add_images(registry(&[("a.png", 1), ("shared.png", 1)]));
        session.add_images(registry(&[("b.png", 2), ("shared.png", 2)]));

        assert_eq!(session.assets().names(), vec!["a.png", "b.png", "shared.png"]);
        assert_eq!(&*session.assets().get("shared.png").unwrap(), &[2u8][..]);
    }

    #[test]
    fn test_image_upload_keeps_state() {
        let mut session = Session::new();
        session.load_table(table("logo\na.png\n"));
        session.generate().unwrap();
        session.add_images(registry(&[("a.png", 1)]));
        assert_eq!(session.state(), SessionState::FlyersGenerated);
    }

    #[test]
    fn test_snapshot_isolated_from_later_uploads() {
        let mut session = Session::new();
        session.add_images(registry(&[("a.png", 1)]));
        session.load_table(table("logo\na.png\n"));
        let snapshot = session.snapshot();

        session.add_images(registry(&[("b.png", 2)]));
        session.load_table(table("logo\nx.png\ny.png\n"));

        assert_eq!(snapshot.assets.names(), vec!["a.png"]);
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].logo(), "a.png");
    }

    #[test]
    fn test_actions_per_state() {
        assert!(!SessionState::NoData.allows(Action::ExportOne));
        assert!(SessionState::DataLoaded.allows(Action::GenerateFlyers));
        assert!(!SessionState::DataLoaded.allows(Action::ExportAll));
        assert!(SessionState::FlyersGenerated.allows(Action::ExportAll));
        assert!(!SessionState::FlyersGenerated.allows(Action::GenerateFlyers));
        assert!(!SessionState::DataLoaded.allows(Action::PreviewFlyers));
        assert!(SessionState::FlyersGenerated.allows(Action::PreviewFlyers));
    }
}
