//! csvlite server library logic.

pub mod api_convert;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    response::Html,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// The upload page, embedded at compile time so the binary is self-contained.
const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Slack on top of the configured upload cap for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Directory where generated database files are written.
    pub output_dir: String,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Handler for `GET /`. Serves the embedded upload page.
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/convert", post(api_convert::convert_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
