//! Render cache diagnostics and management handlers.

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use render_cache::RenderCache;
use serde::Serialize;
use tracing::{info, instrument};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub name: &'static str,
    pub capacity: usize,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub evictions: u64,
    pub invalidated: u64,
    pub failures: u64,
    pub hit_rate_percent: f64,
}

impl CacheStatsResponse {
    async fn from_cache(cache: &RenderCache) -> Self {
        let stats = cache.stats();
        Self {
            name: cache.name(),
            capacity: cache.capacity(),
            entries: cache.len().await,
            hits: stats.hits(),
            misses: stats.misses(),
            coalesced: stats.coalesced(),
            evictions: stats.evictions(),
            invalidated: stats.invalidated(),
            failures: stats.failures(),
            hit_rate_percent: stats.hit_rate(),
        }
    }
}

/// GET /api/cache/stats - statistics of both render caches
#[instrument(skip(state))]
pub async fn cache_stats_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<serde_json::Value> {
    let interactive = CacheStatsResponse::from_cache(state.pipeline.interactive_cache()).await;
    let export = CacheStatsResponse::from_cache(state.pipeline.export_cache()).await;
    Json(serde_json::json!({
        "interactive": interactive,
        "export": export,
    }))
}

/// POST /api/cache/clear - drop every stored render
#[instrument(skip(state))]
pub async fn cache_clear_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    info!("Clearing render caches");
    state.pipeline.clear_caches().await;
    (StatusCode::OK, "Render caches cleared")
}
