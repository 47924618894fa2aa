//! Flyer generation, preview and export handlers.
//!
//! Every flyer is composed fresh from the current snapshot; nothing is
//! cached between requests. The session lock is only held long enough to
//! check the action and take the snapshot.

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::FlyerError;
use crate::export::{self, DocumentSink, MemorySink, ZipSink};
use crate::session::{Action, Snapshot};

use super::super::state::AppState;
use super::ApiError;
use super::session::SessionResponse;

/// Name of the batch report written into the export archive.
pub const REPORT_FILENAME: &str = "report.json";

/// Name of the archive returned by export-all.
pub const ARCHIVE_FILENAME: &str = "flyers.zip";

async fn snapshot_for(state: &AppState, action: Action) -> Result<Snapshot, ApiError> {
    let session = state.session.read().await;
    session.require(action)?;
    Ok(session.snapshot())
}

/// POST /api/flyers/generate - Mark flyers as generated for the loaded records.
pub async fn generate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let mut session = state.session.write().await;
    session.generate()?;
    tracing::info!("Generated {} flyer(s)", session.records().len());
    Ok(Json(SessionResponse::from_session(&session)))
}

/// GET /api/flyers/:index/preview - Compose one flyer and return it as PNG.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Response, ApiError> {
    let snapshot = snapshot_for(&state, Action::PreviewFlyers).await?;
    let record = snapshot
        .records
        .get(index)
        .ok_or_else(|| FlyerError::no_record(index + 1, snapshot.records.len()))?;

    let flyer = state.orchestrator(&snapshot).render(record).await?;
    let png = tokio::task::spawn_blocking(move || export::encode_png(&flyer))
        .await
        .map_err(|e| FlyerError::Image(format!("encode task failed: {}", e)))??;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    )
        .into_response())
}

/// GET /api/flyers/:index/pdf - Regenerate one flyer and download it as PDF.
pub async fn pdf(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Response, ApiError> {
    let snapshot = snapshot_for(&state, Action::ExportOne).await?;
    let mut sink = MemorySink::default();
    state
        .orchestrator(&snapshot)
        .export_one(&snapshot.records, index, &mut sink)
        .await?;

    let (filename, bytes) = sink
        .documents
        .pop()
        .ok_or_else(|| FlyerError::Sink("no document was produced".into()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, super::attachment(&filename)),
        ],
        bytes,
    )
        .into_response())
}

/// POST /api/flyers/export - Export every flyer into one zip archive.
///
/// Records that fail are listed in `report.json` inside the archive; the
/// rest of the batch is still exported.
pub async fn export_all(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let snapshot = snapshot_for(&state, Action::ExportAll).await?;
    let mut sink = ZipSink::new();
    let report = state
        .orchestrator(&snapshot)
        .export_all(&snapshot.records, &mut sink)
        .await;

    let report_json = serde_json::to_vec_pretty(&report)
        .map_err(|e| FlyerError::Sink(format!("report encoding failed: {}", e)))?;
    sink.deliver(REPORT_FILENAME, &report_json)?;
    let archive = sink.finish()?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                super::attachment(ARCHIVE_FILENAME),
            ),
        ],
        archive,
    )
        .into_response())
}
