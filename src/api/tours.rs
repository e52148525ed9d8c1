//! Tour API endpoints.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use super::{success, ApiResult};
use crate::admin;
use crate::catalog::CatalogEvent;
use crate::errors::AppError;
use crate::itinerary::{self, RenderedBlock};
use crate::models::{Region, TourDetailView, TourForm, TourRecord};
use crate::AppState;

/// GET /api/tours - List all tours from the catalog snapshot.
pub async fn list_tours(State(state): State<AppState>) -> ApiResult<Vec<TourRecord>> {
    success(state.catalog.tours().await)
}

/// GET /api/tours/{id} - Get a single tour.
pub async fn get_tour(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TourRecord> {
    match state.store.get_by_id(&id).await {
        Some(tour) => success(tour),
        None => Err(AppError::NotFound(format!("Tour {} not found", id))),
    }
}

/// GET /api/tours/{id}/form - Form values for editing an existing tour.
pub async fn get_tour_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TourForm> {
    match state.store.get_by_id(&id).await {
        Some(tour) => success(admin::edit_form(&tour)),
        None => Err(AppError::NotFound(format!("Tour {} not found", id))),
    }
}

/// POST /api/tours - Create a new tour from form input.
pub async fn create_tour(
    State(state): State<AppState>,
    Json(form): Json<TourForm>,
) -> ApiResult<TourRecord> {
    let record = admin::build_record(&form, None)?;
    state.catalog.add(record.clone()).await;
    success(record)
}

/// PUT /api/tours/{id} - Update a tour from form input.
pub async fn update_tour(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<TourForm>,
) -> ApiResult<TourRecord> {
    let existing = state
        .store
        .get_by_id(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Tour {} not found", id)))?;

    let record = admin::build_record(&form, Some(&existing))?;
    state.catalog.update(record.clone()).await;
    success(record)
}

/// DELETE /api/tours/{id} - Delete a tour. Idempotent.
pub async fn delete_tour(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.catalog.remove(&id).await;
    success(())
}

/// GET /api/slug/{slug} - Public detail page payload.
pub async fn get_tour_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<TourDetailView> {
    // Snapshot first; fall through to the store for records created since
    // the last refresh of this catalog instance.
    let tour = match state.catalog.get_by_slug(&slug).await {
        Some(tour) => Some(tour),
        None => state.store.get_by_slug(&slug).await,
    };

    match tour {
        Some(tour) => success(TourDetailView::new(tour)),
        None => Err(AppError::NotFound(format!("Tour {} not found", slug))),
    }
}

/// GET /api/slug/{slug}/rendered - Itinerary display blocks for the detail page.
pub async fn get_rendered_itinerary(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Vec<RenderedBlock>> {
    let tour = match state.catalog.get_by_slug(&slug).await {
        Some(tour) => Some(tour),
        None => state.store.get_by_slug(&slug).await,
    }
    .ok_or_else(|| AppError::NotFound(format!("Tour {} not found", slug)))?;

    let text = tour
        .itinerary_text
        .clone()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| itinerary::encode(&tour.itinerary));

    let expanded = state.images.read().await.expand_refs(&text);
    success(itinerary::render(&expanded))
}

/// Region key/label pair for building the catalog menu.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionInfo {
    pub key: String,
    pub label: String,
}

/// GET /api/regions - The four catalog partitions.
pub async fn list_regions() -> ApiResult<Vec<RegionInfo>> {
    success(
        Region::ALL
            .iter()
            .map(|region| RegionInfo {
                key: region.as_str().to_string(),
                label: region.display_name().to_string(),
            })
            .collect(),
    )
}

/// GET /api/regions/{region}/tours - Region-filtered catalog view.
pub async fn list_tours_by_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> ApiResult<Vec<TourRecord>> {
    let region = Region::from_str(&region).ok_or_else(|| AppError::Validation {
        message: format!("Unknown region: {}", region),
        fields: vec!["region".to_string()],
    })?;

    // Snapshot first, store as the fall-through, as with slug lookup.
    let tours = state.catalog.by_region(region).await;
    let tours = if tours.is_empty() {
        state.store.list_by_region(region).await
    } else {
        tours
    };
    success(tours)
}

/// GET /api/tours/events - SSE stream of catalog change notifications.
///
/// Independent views subscribe here and reload on each event, the same way
/// a second open admin tab would.
pub async fn tour_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.catalog.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(CatalogEvent::Changed) => {
            Some(Ok(Event::default().event("tourChanged").data("changed")))
        }
        Err(_) => None, // Lagged; the client reloads on the next event
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    )
}
