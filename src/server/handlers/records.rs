//! CSV upload handler.

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::Serialize;
use std::sync::Arc;

use crate::record::{RecordSource, SkippedRow};
use crate::session::SessionState;

use super::super::state::AppState;
use super::ApiError;

/// Response from the table upload endpoint.
#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub headers: Vec<String>,
    pub records: usize,
    /// Rows dropped as unreadable, reported as warnings.
    pub skipped: Vec<SkippedRow>,
    /// Header notices such as renamed duplicate columns.
    pub warnings: Vec<String>,
    pub state: SessionState,
}

/// POST /api/records - Upload a CSV table (multipart field `file`).
///
/// Replaces the whole record set and clears any generated flyers.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<TableResponse>, ApiError> {
    let mut table: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read table: {}", e)))?;
            table = Some(bytes.to_vec());
            break;
        }
    }

    let table = table.ok_or_else(|| ApiError::bad_request("No file field found"))?;
    let load = RecordSource::parse(table.as_slice())?;

    let headers = load.headers.clone();
    let skipped = load.skipped.clone();
    let warnings = load.warnings.clone();

    let mut session = state.session.write().await;
    session.load_table(load);

    Ok(Json(TableResponse {
        headers,
        records: session.records().len(),
        skipped,
        warnings,
        state: session.state(),
    }))
}
