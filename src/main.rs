//! Viet Travel Tour Backend
//!
//! REST backend for the tour catalog and its admin panel, with SQLite
//! document persistence and a local file-backed fallback store.

mod admin;
mod api;
mod catalog;
mod config;
mod errors;
mod itinerary;
mod media;
mod models;
mod store;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog::Catalog;
use config::Config;
use media::{ImageCache, MediaStore};
use store::{init_database, LocalBucket, LocalStore, RemoteStore, TourBackend, TourStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TourStore>,
    pub catalog: Arc<Catalog>,
    pub media: Arc<MediaStore>,
    pub images: Arc<RwLock<ImageCache>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Viet Travel Tour Backend");
    tracing::info!("Local data dir: {:?}", config.data_dir);
    tracing::info!("Media dir: {:?}", config.media_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Remote backend, when configured; startup failures degrade to local-only
    let remote: Option<Arc<dyn TourBackend>> = match &config.db_path {
        Some(db_path) => match init_database(db_path).await {
            Ok(pool) => {
                tracing::info!("Database path: {:?}", db_path);
                Some(Arc::new(RemoteStore::new(pool)))
            }
            Err(err) => {
                tracing::warn!("Database unavailable, using local store only: {}", err);
                None
            }
        },
        None => {
            tracing::warn!("No database configured (TOUR_DB_PATH). Using local store only.");
            None
        }
    };

    let local = Arc::new(LocalStore::new(LocalBucket::new(&config.data_dir)));
    let store = Arc::new(TourStore::new(remote, local));

    // Load the catalog snapshot
    let catalog = Arc::new(Catalog::new(store.clone()));
    catalog.refresh().await;
    tracing::info!(
        "Catalog {:?} with {} tours",
        catalog.state().await,
        catalog.tours().await.len()
    );

    // Editor image cache
    let mut images = ImageCache::new(LocalBucket::new(&config.data_dir));
    images.load();

    let state = AppState {
        store,
        catalog,
        media: Arc::new(MediaStore::new(&config.media_dir)),
        images: Arc::new(RwLock::new(images)),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Tours
        .route("/tours", get(api::list_tours))
        .route("/tours", post(api::create_tour))
        .route("/tours", delete(api::clear_tours))
        .route("/tours/export", get(api::export_tours))
        .route("/tours/import", post(api::import_tours))
        .route("/tours/refresh", post(api::refresh_catalog))
        .route("/tours/events", get(api::tour_events))
        .route("/tours/{id}", get(api::get_tour))
        .route("/tours/{id}", put(api::update_tour))
        .route("/tours/{id}", delete(api::delete_tour))
        .route("/tours/{id}/form", get(api::get_tour_form))
        // Public catalog views
        .route("/slug/{slug}", get(api::get_tour_by_slug))
        .route("/slug/{slug}/rendered", get(api::get_rendered_itinerary))
        .route("/regions", get(api::list_regions))
        .route("/regions/{region}/tours", get(api::list_tours_by_region))
        // Editor images
        .route("/images", post(api::register_image))
        .route("/images/cleanup", post(api::cleanup_images))
        .route("/images/{id}", get(api::get_image))
        // Media uploads
        .route("/media/{filename}", post(api::upload_media));

    // Health check and media serving live outside /api
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/media/{filename}", get(api::serve_media));

    Router::new()
        .nest("/api", api_routes)
        .merge(public_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
