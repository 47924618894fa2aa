//! # HTTP Server for Flyer Generation
//!
//! Serves the single-page frontend and a small JSON/multipart API that
//! drives one [`Session`](crate::session::Session): upload a table, upload
//! images, generate, then preview or download flyers.
//!
//! ## Usage
//!
//! ```bash
//! flyerpress serve --listen 0.0.0.0:8080
//! ```
//!
//! Then open http://localhost:8080 in a browser.

mod handlers;
mod state;
mod static_files;

pub use state::{AppState, ServerConfig};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::FlyerError;

/// Upload limit for CSV and image bodies.
const UPLOAD_LIMIT: usize = 50 * 1024 * 1024;

/// Build the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Frontend
        .route("/", get(static_files::index_handler))
        .route("/assets/*path", get(static_files::asset_handler))
        // Session
        .route("/api/session", get(handlers::session::show))
        // Uploads
        .route(
            "/api/records",
            post(handlers::records::upload).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route(
            "/api/images",
            post(handlers::images::upload).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        // Flyers
        .route("/api/flyers/generate", post(handlers::flyers::generate))
        .route("/api/flyers/:index/preview", get(handlers::flyers::preview))
        .route("/api/flyers/:index/pdf", get(handlers::flyers::pdf))
        .route("/api/flyers/export", post(handlers::flyers::export_all))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use flyerpress::config::FlyerConfig;
/// use flyerpress::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), flyerpress::error::FlyerError> {
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:8080".to_string(),
///     flyer: FlyerConfig::default(),
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), FlyerError> {
    let app_state = Arc::new(AppState::new(config.clone())?);
    let app = router(app_state);

    tracing::info!("flyerpress HTTP server starting");
    tracing::info!("Template: {}", config.flyer.template.display());
    tracing::info!("Bundled logos: {}", config.flyer.logo_dir.display());
    tracing::info!("Open http://{}/ in your browser", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", config.listen_addr, e),
            )
        })?;

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlyerConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use image::{ImageFormat, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Read};
    use tower::ServiceExt;

    const BOUNDARY: &str = "flyerpress-test-boundary";

    fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn test_state(dir: &std::path::Path) -> Arc<AppState> {
        let template = dir.join("template.png");
        std::fs::write(&template, png_bytes(320, 400, [20, 40, 120, 255])).unwrap();
        let flyer = FlyerConfig {
            template,
            logo_dir: dir.to_path_buf(),
            ..FlyerConfig::default()
        };
        Arc::new(
            AppState::new(ServerConfig {
                listen_addr: "127.0.0.1:0".to_string(),
                flyer,
            })
            .unwrap(),
        )
    }

    fn multipart(uri: &str, parts: &[(&str, &str, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, filename, bytes) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    name, filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn send_json(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let (status, body) = send(state, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_fresh_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let (status, json) = send_json(&state, get("/api/session")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["state"], "no_data");
        assert_eq!(
            json["actions"],
            serde_json::json!(["upload_table", "upload_images"])
        );
        assert_eq!(json["records"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_generate_without_data_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let (status, json) = send_json(&state, post("/api/flyers/generate")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["success"], false);

        let (status, _) = send(&state, get("/api/flyers/0/pdf")).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let (status, _) = send(&state, multipart("/api/records", &[("other", "x.csv", b"a")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_full_flow() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let csv = b"customer,phone,message,logo\nAcme,5551234567,Hi!,acme.png\n,5550000000,Yo,acme.png\n";
        let (status, json) = send_json(&state, multipart("/api/records", &[("file", "data.csv", csv)])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["records"], 2);
        assert_eq!(json["state"], "data_loaded");

        let logo = png_bytes(10, 4, [255, 0, 0, 255]);
        let (status, json) = send_json(
            &state,
            multipart("/api/images", &[("images", "acme.png", &logo)]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["added"], serde_json::json!(["acme.png"]));
        assert_eq!(json["total"], 1);

        // Preview is not available before generating
        let (status, _) = send(&state, get("/api/flyers/0/preview")).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = send_json(&state, post("/api/flyers/generate")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["state"], "flyers_generated");
        assert_eq!(json["records"][0]["filename"], "Acme.pdf");
        assert_eq!(json["records"][1]["filename"], "Flyer_2.pdf");

        let (status, png) = send(&state, get("/api/flyers/0/preview")).await;
        assert_eq!(status, StatusCode::OK);
        let preview = image::load_from_memory(&png).unwrap();
        assert_eq!((preview.width(), preview.height()), (320, 400));

        let response = router(state.clone())
            .oneshot(get("/api/flyers/0/pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("filename=\"Acme.pdf\""));
        let pdf = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(pdf.starts_with(b"%PDF-"));

        let (status, json) = send_json(&state, get("/api/flyers/7/pdf")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("position 8"));

        let (status, _) = send(&state, get("/api/flyers/2/preview")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, archive) = send(&state, post("/api/flyers/export")).await;
        assert_eq!(status, StatusCode::OK);
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["Acme.pdf", "Flyer_2.pdf", "report.json"]);

        let mut report = String::new();
        zip.by_name("report.json")
            .unwrap()
            .read_to_string(&mut report)
            .unwrap();
        let report: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(report["statuses"][0]["status"], "exported");
        assert_eq!(report["statuses"][1]["status"], "exported");
    }

    #[tokio::test]
    async fn test_new_table_resets_generated() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let csv = b"phone,message,logo\n1,a,x.png\n";

        send(&state, multipart("/api/records", &[("file", "a.csv", csv)])).await;
        let (status, _) = send(&state, post("/api/flyers/generate")).await;
        assert_eq!(status, StatusCode::OK);

        let (_, json) = send_json(&state, multipart("/api/records", &[("file", "b.csv", csv)])).await;
        assert_eq!(json["state"], "data_loaded");

        let (status, _) = send(&state, post("/api/flyers/export")).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_duplicate_headers_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let csv = b"phone,message,logo,phone\n1,a,x.png,2\n";

        let (status, json) =
            send_json(&state, multipart("/api/records", &[("file", "a.csv", csv)])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["headers"][3], "phone_1");
        assert_eq!(json["warnings"].as_array().unwrap().len(), 1);
        assert!(json["warnings"][0].as_str().unwrap().contains("phone_1"));
    }

    #[tokio::test]
    async fn test_missing_logo_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let csv = b"customer,phone,message,logo\nNope,1,a,missing.png\n";

        send(&state, multipart("/api/records", &[("file", "a.csv", csv)])).await;
        send(&state, post("/api/flyers/generate")).await;

        let (status, json) = send_json(&state, get("/api/flyers/0/pdf")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].as_str().unwrap().contains("missing.png"));

        let (status, archive) = send(&state, post("/api/flyers/export")).await;
        assert_eq!(status, StatusCode::OK);
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut report = String::new();
        zip.by_name("report.json")
            .unwrap()
            .read_to_string(&mut report)
            .unwrap();
        let report: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(report["statuses"][0]["status"], "failed");
        assert_eq!(report["statuses"][0]["filename"], "Nope.pdf");
    }
}
