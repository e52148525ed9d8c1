//! Import/export and bulk maintenance endpoints.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::AppState;

/// GET /api/tours/export - Download the full record list as pretty JSON.
pub async fn export_tours(State(state): State<AppState>) -> Response {
    let body = state.store.export_as_text().await;
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"tours-backup.json\"",
            ),
        ],
        body,
    )
        .into_response()
}

/// POST /api/tours/import - Replace the store with an exported payload.
///
/// Rejects anything that is not a JSON array without touching the store.
pub async fn import_tours(State(state): State<AppState>, body: String) -> ApiResult<usize> {
    if !state.store.import_from_text(&body).await {
        return Err(AppError::BadRequest("Invalid import payload".to_string()));
    }

    state.catalog.refresh().await;
    success(state.catalog.tours().await.len())
}

/// DELETE /api/tours - Remove every record. Irreversible.
pub async fn clear_tours(State(state): State<AppState>) -> ApiResult<()> {
    state.store.clear_all().await;
    state.catalog.refresh().await;
    success(())
}

/// POST /api/tours/refresh - Reload the catalog snapshot from the store.
pub async fn refresh_catalog(State(state): State<AppState>) -> ApiResult<usize> {
    state.catalog.refresh().await;
    success(state.catalog.tours().await.len())
}
