//! Conversion API: multipart CSV upload in, data-URI download link out.

use crate::AppState;
use axum::{
    extract::{Extension, Multipart},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use csvlite_core::{
    convert_csv, derive_db_filename, is_csv_filename, ConvertError, CSV_EXT, DEFAULT_TABLE_NAME,
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "conversion request failed");
        } else {
            tracing::warn!(error = %message, "conversion request rejected");
        }

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Handler for `POST /api/convert`.
///
/// Accepts a multipart form with one CSV file field, converts it into a
/// single-table SQLite database under the configured output directory, and
/// returns the generated file as a base64 data URI the page can hand to the
/// browser as a download link.
pub async fn convert_handler(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    // Extract the file field from multipart
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart error: {}", e)))?
        .ok_or_else(|| ApiError::BadRequest("no file provided".to_string()))?;

    let upload_name = field
        .file_name()
        .ok_or_else(|| ApiError::BadRequest("file field has no filename".to_string()))?
        .to_string();

    if !is_csv_filename(&upload_name) {
        return Err(ApiError::BadRequest(format!(
            "expected a {} file, got '{}'",
            CSV_EXT, upload_name
        )));
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {}", e)))?;

    if data.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
    }
    if data.len() > state.max_upload_bytes {
        return Err(ApiError::BadRequest(format!(
            "file too large: {} bytes (max {})",
            data.len(),
            state.max_upload_bytes
        )));
    }

    let conversion_id = Uuid::new_v4().to_string();
    let db_filename = derive_db_filename(&upload_name);
    let db_path = PathBuf::from(&state.output_dir).join(&db_filename);

    tokio::fs::create_dir_all(&state.output_dir)
        .await
        .map_err(|e| {
            ApiError::InternalServerError(format!("failed to create output dir: {}", e))
        })?;

    // rusqlite is synchronous; run the whole pipeline off the async runtime.
    let blocking_path = db_path.clone();
    let report = tokio::task::spawn_blocking(move || {
        convert_csv(&data, &blocking_path, DEFAULT_TABLE_NAME).map_err(|e| match e {
            ConvertError::Dataset(_) | ConvertError::Infer(_) => {
                ApiError::BadRequest(e.to_string())
            }
            ConvertError::Load(_) => ApiError::InternalServerError(e.to_string()),
        })
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))??;

    let db_bytes = tokio::fs::read(&db_path).await.map_err(|e| {
        ApiError::InternalServerError(format!("failed to read generated database: {}", e))
    })?;

    use base64::Engine;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&db_bytes);
    let data_uri = format!("data:application/octet-stream;base64,{}", encoded);

    tracing::info!(
        conversion_id = %conversion_id,
        upload = %upload_name,
        db_file = %db_filename,
        table = %report.table,
        columns = report.columns.len(),
        rows = report.rows,
        size_bytes = db_bytes.len(),
        "csv converted to sqlite"
    );

    Ok(Json(serde_json::json!({
        "filename": db_filename,
        "table": report.table,
        "columns": report.columns,
        "rows": report.rows,
        "size_bytes": db_bytes.len(),
        "data_uri": data_uri,
    }))
    .into_response())
}
