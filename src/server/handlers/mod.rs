//! HTTP handlers for the server.

pub mod flyers;
pub mod images;
pub mod records;
pub mod session;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::FlyerError;

/// JSON error body: `{"success": false, "error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<FlyerError> for ApiError {
    fn from(e: FlyerError) -> Self {
        let status = match &e {
            FlyerError::InvalidState(_) => StatusCode::CONFLICT,
            FlyerError::NotFound(_) => StatusCode::NOT_FOUND,
            FlyerError::AssetUnavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FlyerError::Csv(_) | FlyerError::Qr(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({"success": false, "error": self.message})),
        )
            .into_response()
    }
}

/// `Content-Disposition` value for a download, with an ASCII fallback name
/// and the exact UTF-8 name in `filename*`.
pub fn attachment(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .map(|c| if c == '"' { '_' } else { c })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        crate::flyer::qr::encode_uri_component(filename)
    )
}
