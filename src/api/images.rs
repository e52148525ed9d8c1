//! Editor image cache endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::media::ImageCache;
use crate::AppState;

/// Request body for parking an editor image.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterImageRequest {
    pub file_name: String,
    pub data_url: String,
}

/// A parked image: its short id and the markdown reference to paste.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredImage {
    pub id: String,
    pub markdown: String,
}

/// Request body for dropping images no longer referenced by any tour.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupImagesRequest {
    pub used_ids: Vec<String>,
}

/// POST /api/images - Park a data URL under a short id.
pub async fn register_image(
    State(state): State<AppState>,
    Json(request): Json<RegisterImageRequest>,
) -> ApiResult<RegisteredImage> {
    if request.data_url.trim().is_empty() {
        return Err(AppError::Validation {
            message: "Missing required fields: dataUrl".to_string(),
            fields: vec!["dataUrl".to_string()],
        });
    }

    let mut images = state.images.write().await;
    let id = images.insert(&request.data_url);
    let markdown = ImageCache::markdown_ref(&id, &request.file_name);
    success(RegisteredImage { id, markdown })
}

/// GET /api/images/{id} - Resolve a short id back to its data URL.
pub async fn get_image(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<String> {
    match state.images.read().await.get(&id) {
        Some(url) => success(url.to_string()),
        None => Err(AppError::NotFound(format!("Image {} not found", id))),
    }
}

/// POST /api/images/cleanup - Drop every image not in the used set.
pub async fn cleanup_images(
    State(state): State<AppState>,
    Json(request): Json<CleanupImagesRequest>,
) -> ApiResult<()> {
    state.images.write().await.cleanup_unused(&request.used_ids);
    success(())
}
