//! Media upload and serving endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::{success, ApiResult};
use crate::AppState;

/// POST /api/media/{filename} - Store an uploaded file and return its URL.
pub async fn upload_media(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    body: Bytes,
) -> ApiResult<String> {
    let url = state.media.store(&filename, &body, |pct| {
        tracing::debug!("Upload {}: {}%", filename, pct);
    })?;
    success(url)
}

/// GET /media/{filename} - Serve a stored file.
pub async fn serve_media(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    match state.media.read(&filename) {
        Ok(Some(bytes)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type(&filename))],
            bytes,
        )
            .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => err.into_response(),
    }
}

fn content_type(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(str::to_ascii_lowercase) {
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
