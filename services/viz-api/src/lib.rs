//! Snapshot visualization API service library.
//!
//! This module exposes the internal modules for testing purposes.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod pipeline;
pub mod playback;
pub mod registry;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// Build the HTTP router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Datasets
        .route("/api/datasets", get(handlers::list_datasets_handler))
        .route("/api/load_dataset", post(handlers::load_dataset_handler))
        .route("/api/set_data_dir", post(handlers::set_data_dir_handler))
        .route("/api/fields", get(handlers::list_fields_handler))
        .route("/api/particle_types", get(handlers::particle_types_handler))
        // Rendering
        .route("/api/slice", get(handlers::render_handler))
        .route("/api/export/current_frame", get(handlers::export_handler))
        // Playback
        .route(
            "/api/playback",
            get(handlers::playback_status_handler).post(handlers::set_playback_handler),
        )
        // Cache
        .route("/api/cache/stats", get(handlers::cache_stats_handler))
        .route("/api/cache/clear", post(handlers::cache_clear_handler))
        // Service
        .route("/api/server_info", get(handlers::server_info_handler))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
