//! # flyerpress - Batch Flyer Generator
//!
//! flyerpress turns a CSV of customer records into one PDF flyer per row.
//! Each flyer is a fixed template image with the record's phone number
//! drawn on it, a QR code of an `sms:` link carrying the record's message,
//! and the record's logo placed twice.
//!
//! - **Records**: CSV parsing with unreadable rows reported, not fatal
//! - **Assets**: uploaded images by filename, bundled logos by path, every
//!   load bounded by a timeout
//! - **Compositing**: template, phone text, QR code, header and footer logos
//! - **Export**: single-page PDFs sized to the template, delivered to a
//!   directory, a zip archive or memory
//! - **Server**: a small web UI driving the same pipeline
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use flyerpress::{
//!     assets::AssetRegistry,
//!     config::FlyerConfig,
//!     export::DirectorySink,
//!     record::RecordSource,
//! };
//!
//! # async fn example() -> Result<(), flyerpress::FlyerError> {
//! let config = FlyerConfig::default();
//! let table = RecordSource::parse(std::fs::File::open("customers.csv")?)?;
//!
//! let mut images = AssetRegistry::new();
//! images.insert("acme.png", std::fs::read("acme.png")?);
//!
//! let orchestrator = config.orchestrator(config.compositor()?, Arc::new(images));
//! let mut sink = DirectorySink::create("out")?;
//! let report = orchestrator.export_all(&table.records, &mut sink).await;
//! println!("{} exported, {} failed", report.exported(), report.failed());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`record`] | CSV table parsing |
//! | [`assets`] | Image registry and logo resolution |
//! | [`flyer`] | Flyer compositing (layout, text, QR) |
//! | [`export`] | PDF encoding, filenames and sinks |
//! | [`batch`] | Preview, export-one and export-all |
//! | [`session`] | Upload/generate/export state machine |
//! | [`config`] | TOML configuration |
//! | [`server`] | HTTP server and embedded frontend |
//! | [`error`] | Error types |

pub mod assets;
pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod flyer;
pub mod logging;
pub mod record;
pub mod server;
pub mod session;

pub use assets::{AssetRegistry, AssetResolver};
pub use batch::{BatchOrchestrator, BatchReport};
pub use config::FlyerConfig;
pub use error::FlyerError;
pub use flyer::FlyerCompositor;
pub use record::{Record, RecordSource};
pub use session::{Session, SessionState};
