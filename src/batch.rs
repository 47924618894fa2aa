//! # Batch Orchestrator
//!
//! Sequences the compositor and the exporter across a record set.
//!
//! - **Preview then export one**: [`BatchOrchestrator::preview_all`] renders
//!   every record for display; [`BatchOrchestrator::export_one`] renders the
//!   chosen record again from scratch and exports it.
//!   [`BatchOrchestrator::save_previews`] writes those previews out as PNGs.
//! - **Export all**: [`BatchOrchestrator::export_all`] renders and exports
//!   each record in input order, one at a time, so at most one raster is in
//!   memory. A failed record is reported and the batch moves on.

use image::RgbaImage;
use serde::Serialize;

use crate::assets::AssetResolver;
use crate::error::{FlyerError, Result};
use crate::export::{self, DocumentSink, UniqueNames};
use crate::flyer::FlyerCompositor;
use crate::record::Record;

/// A rendered preview for one record.
#[derive(Debug)]
pub struct FlyerPreview {
    /// 0-based record index.
    pub index: usize,
    pub filename: String,
    pub flyer: Result<RgbaImage>,
}

/// What happened to one record during export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportOutcome {
    Exported { bytes: usize },
    Failed { error: String },
}

/// Per-record export status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordStatus {
    /// 0-based record index.
    pub index: usize,
    pub filename: String,
    #[serde(flatten)]
    pub outcome: ExportOutcome,
}

impl RecordStatus {
    pub fn is_exported(&self) -> bool {
        matches!(self.outcome, ExportOutcome::Exported { .. })
    }
}

/// Result of an export-all run, one status per record in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub statuses: Vec<RecordStatus>,
}

impl BatchReport {
    pub fn exported(&self) -> usize {
        self.statuses.iter().filter(|s| s.is_exported()).count()
    }

    pub fn failed(&self) -> usize {
        self.statuses.len() - self.exported()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Drives composition and export for a record set.
#[derive(Clone)]
pub struct BatchOrchestrator {
    compositor: FlyerCompositor,
    resolver: AssetResolver,
}

impl BatchOrchestrator {
    pub fn new(compositor: FlyerCompositor, resolver: AssetResolver) -> Self {
        Self {
            compositor,
            resolver,
        }
    }

    pub fn compositor(&self) -> &FlyerCompositor {
        &self.compositor
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    /// Render one record (never cached).
    pub async fn render(&self, record: &Record) -> Result<RgbaImage> {
        self.compositor.compose(record, &self.resolver).await
    }

    /// Render a record and encode it as a PDF.
    pub async fn render_pdf(&self, record: &Record) -> Result<Vec<u8>> {
        let flyer = self.render(record).await?;
        tokio::task::spawn_blocking(move || export::encode_pdf(&flyer))
            .await
            .map_err(|e| FlyerError::Pdf(format!("encode task failed: {}", e)))?
    }

    /// Render every record for on-screen preview.
    pub async fn preview_all(&self, records: &[Record]) -> Vec<FlyerPreview> {
        let mut previews = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let flyer = self.render(record).await;
            if let Err(e) = &flyer {
                tracing::warn!("Preview {} failed: {}", index + 1, e);
            }
            previews.push(FlyerPreview {
                index,
                filename: export::flyer_filename(record, index + 1),
                flyer,
            });
        }
        previews
    }

    /// Render every record with [`preview_all`](Self::preview_all) and deliver
    /// each preview as `<name>.png`. Failed renders are reported, not raised.
    pub async fn save_previews(
        &self,
        records: &[Record],
        sink: &mut dyn DocumentSink,
    ) -> BatchReport {
        let mut names = UniqueNames::default();
        let mut report = BatchReport::default();

        for preview in self.preview_all(records).await {
            let stem = preview
                .filename
                .strip_suffix(".pdf")
                .unwrap_or(&preview.filename);
            let filename = names.claim(&format!("{}.png", stem));
            let delivered = match preview.flyer {
                Ok(flyer) => deliver_png(flyer, &filename, sink).await,
                Err(e) => Err(e),
            };
            let outcome = match delivered {
                Ok(bytes) => ExportOutcome::Exported { bytes },
                Err(e) => ExportOutcome::Failed {
                    error: e.to_string(),
                },
            };
            report.statuses.push(RecordStatus {
                index: preview.index,
                filename,
                outcome,
            });
        }

        tracing::info!(
            "Previews finished: {} written, {} failed",
            report.exported(),
            report.failed()
        );
        report
    }

    /// Regenerate and export the record at `index` (0-based).
    ///
    /// Returns the filename the document was delivered under.
    pub async fn export_one(
        &self,
        records: &[Record],
        index: usize,
        sink: &mut dyn DocumentSink,
    ) -> Result<String> {
        let record = records
            .get(index)
            .ok_or_else(|| FlyerError::no_record(index + 1, records.len()))?;
        let filename = export::flyer_filename(record, index + 1);
        let pdf = self.render_pdf(record).await?;
        sink.deliver(&filename, &pdf)?;
        tracing::info!("Exported {} ({} bytes)", filename, pdf.len());
        Ok(filename)
    }

    /// Export every record in order, continuing past failures.
    pub async fn export_all(&self, records: &[Record], sink: &mut dyn DocumentSink) -> BatchReport {
        tracing::info!("Exporting {} flyer(s)", records.len());
        let mut names = UniqueNames::default();
        let mut report = BatchReport::default();

        for (index, record) in records.iter().enumerate() {
            let filename = names.claim(&export::flyer_filename(record, index + 1));
            let outcome = match self.export_record(record, &filename, sink).await {
                Ok(bytes) => {
                    tracing::info!("[{}/{}] {} ({} bytes)", index + 1, records.len(), filename, bytes);
                    ExportOutcome::Exported { bytes }
                }
                Err(e) => {
                    tracing::warn!("[{}/{}] {} failed: {}", index + 1, records.len(), filename, e);
                    ExportOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.statuses.push(RecordStatus {
                index,
                filename,
                outcome,
            });
        }

        tracing::info!(
            "Batch finished: {} exported, {} failed",
            report.exported(),
            report.failed()
        );
        report
    }

    async fn export_record(
        &self,
        record: &Record,
        filename: &str,
        sink: &mut dyn DocumentSink,
    ) -> Result<usize> {
        let pdf = self.render_pdf(record).await?;
        sink.deliver(filename, &pdf)?;
        Ok(pdf.len())
    }
}

async fn deliver_png(flyer: RgbaImage, filename: &str, sink: &mut dyn DocumentSink) -> Result<usize> {
    let png = tokio::task::spawn_blocking(move || export::encode_png(&flyer))
        .await
        .map_err(|e| FlyerError::Image(format!("encode task failed: {}", e)))??;
    sink.deliver(filename, &png)?;
    Ok(png.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetRegistry;
    use crate::export::MemorySink;
    use crate::flyer::{FlyerFont, FlyerLayout};
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;
    use std::sync::Arc;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::from_pixel(width, height, Rgba([0, 128, 0, 255]))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn orchestrator(dir: &tempfile::TempDir) -> BatchOrchestrator {
        let template = dir.path().join("template.png");
        std::fs::write(&template, png(600, 800)).unwrap();
        let mut registry = AssetRegistry::new();
        registry.insert("acme.png", png(10, 10));

        BatchOrchestrator::new(
            FlyerCompositor::new(template, FlyerLayout::default(), FlyerFont::Spleen),
            AssetResolver::new(Arc::new(registry), dir.path().join("logos")),
        )
    }

    fn record(customer: &str, logo: &str) -> Record {
        Record::from_pairs([
            ("customer", customer),
            ("phone", "5551234567"),
            ("message", "Hi!"),
            ("logo", logo),
        ])
    }

    #[tokio::test]
    async fn test_export_all_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let batch = orchestrator(&dir);
        let records = vec![
            record("Acme", "acme.png"),
            record("Broken", "missing.png"),
            record("", "acme.png"),
        ];

        let mut sink = MemorySink::default();
        let report = batch.export_all(&records, &mut sink).await;

        assert_eq!(report.statuses.len(), 3);
        assert_eq!(report.exported(), 2);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert!(matches!(report.statuses[1].outcome, ExportOutcome::Failed { .. }));

        let names: Vec<&str> = sink.documents.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Acme.pdf", "Flyer_3.pdf"]);
    }

    #[tokio::test]
    async fn test_export_all_dedupes_names() {
        let dir = tempfile::tempdir().unwrap();
        let batch = orchestrator(&dir);
        let records = vec![record("Acme", "acme.png"), record("Acme", "acme.png")];

        let mut sink = MemorySink::default();
        let report = batch.export_all(&records, &mut sink).await;

        assert_eq!(report.statuses[0].filename, "Acme.pdf");
        assert_eq!(report.statuses[1].filename, "Acme (2).pdf");
    }

    #[tokio::test]
    async fn test_export_one_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let batch = orchestrator(&dir);
        let mut sink = MemorySink::default();

        let err = batch
            .export_one(&[record("Acme", "acme.png")], 5, &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, FlyerError::NotFound(_)));
        assert!(sink.documents.is_empty());
    }

    #[tokio::test]
    async fn test_preview_all_reports_each_record() {
        let dir = tempfile::tempdir().unwrap();
        let batch = orchestrator(&dir);
        let records = vec![record("Acme", "acme.png"), record("", "missing.png")];

        let previews = batch.preview_all(&records).await;

        assert_eq!(previews.len(), 2);
        assert!(previews[0].flyer.is_ok());
        assert_eq!(previews[1].filename, "Flyer_2.pdf");
        assert!(previews[1].flyer.as_ref().unwrap_err().is_asset_unavailable());
    }

    #[tokio::test]
    async fn test_save_previews_writes_png_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let batch = orchestrator(&dir);
        let records = vec![
            record("Acme", "acme.png"),
            record("", "missing.png"),
            record("Acme", "acme.png"),
        ];

        let mut sink = MemorySink::default();
        let report = batch.save_previews(&records, &mut sink).await;

        let names: Vec<&str> = report.statuses.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, vec!["Acme.png", "Flyer_2.png", "Acme (2).png"]);
        assert_eq!(report.exported(), 2);
        assert!(matches!(report.statuses[1].outcome, ExportOutcome::Failed { .. }));

        let (name, bytes) = &sink.documents[0];
        assert_eq!(name, "Acme.png");
        let decoded = image::load_from_memory(bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (600, 800));
    }

    #[test]
    fn test_report_serializes_flat_status() {
        let status = RecordStatus {
            index: 0,
            filename: "Acme.pdf".to_string(),
            outcome: ExportOutcome::Exported { bytes: 42 },
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"index": 0, "filename": "Acme.pdf", "status": "exported", "bytes": 42})
        );
    }
}
