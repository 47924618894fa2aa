//! Image upload handler.

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::Serialize;
use std::sync::Arc;

use crate::assets::AssetRegistry;

use super::super::state::AppState;
use super::ApiError;

/// Response from the image upload endpoint.
#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    /// Filenames received in this upload.
    pub added: Vec<String>,
    /// Size of the registry after merging.
    pub total: usize,
}

/// POST /api/images - Upload images (multipart field `images`, repeatable).
///
/// Images are keyed by their original filename and merged into the session
/// registry; a re-upload with the same name replaces the older image.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ImagesResponse>, ApiError> {
    let mut batch = AssetRegistry::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("images") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read {}: {}", filename, e)))?;
        batch.insert(filename, bytes.to_vec());
    }

    let added = batch.names();

    let mut session = state.session.write().await;
    session.add_images(batch);

    Ok(Json(ImagesResponse {
        added,
        total: session.assets().len(),
    }))
}
