//! Embedded web UI: `index.html` plus everything under `assets/`.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use include_dir::{Dir, include_dir};
use std::sync::Arc;

use super::state::AppState;

static UI: Dir = include_dir!("$CARGO_MANIFEST_DIR/frontend/dist");

/// Assets never change within one server run.
const ASSET_CACHE: &str = "public, max-age=31536000";

/// Append `?v=<boot>` to the page's script and stylesheet references.
fn versioned(page: &str, boot_time: u64) -> String {
    let version = format!("?v={}", boot_time);
    page.replace(".js\"", &format!(".js{}\"", version))
        .replace(".css\"", &format!(".css{}\"", version))
}

/// GET / - the flyer page.
pub async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(page) = UI.get_file("index.html") else {
        return (StatusCode::NOT_FOUND, "UI not bundled").into_response();
    };
    let page = String::from_utf8_lossy(page.contents());
    Html(versioned(&page, state.boot_time)).into_response()
}

/// GET /assets/*path - scripts and styles for the page.
pub async fn asset_handler(Path(path): Path<String>) -> Response {
    let name = path.split('?').next().unwrap_or_default();
    match UI.get_file(format!("assets/{}", name)) {
        Some(file) => {
            let mime = mime_guess::from_path(name).first_or_octet_stream();
            (
                [
                    (header::CONTENT_TYPE, mime.to_string()),
                    (header::CACHE_CONTROL, ASSET_CACHE.to_string()),
                ],
                file.contents(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, format!("No asset {}", name)).into_response(),
    }
}
