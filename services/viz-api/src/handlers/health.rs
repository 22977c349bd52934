//! Health, service info and Prometheus metrics handlers.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::metrics::MetricsSnapshot;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Basic health check
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize)]
pub struct ServerInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub data_dir: std::path::PathBuf,
    pub current_dataset: Option<String>,
    pub resident_datasets: Vec<String>,
    pub drawer: &'static str,
    pub metrics: MetricsSnapshot,
}

/// GET /api/server_info - service version, configuration and counters
pub async fn server_info_handler(Extension(state): Extension<Arc<AppState>>) -> Json<ServerInfo> {
    let registry = state.pipeline.registry();
    Json(ServerInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        data_dir: registry.data_dir().await,
        current_dataset: registry.current().await.map(|h| h.name().to_string()),
        resident_datasets: registry
            .resident()
            .await
            .iter()
            .map(|h| h.name().to_string())
            .collect(),
        drawer: if state.config.render_command.is_some() {
            "command"
        } else {
            "preview"
        },
        metrics: state.metrics.snapshot().await,
    })
}

/// GET /metrics - Prometheus metrics endpoint
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    state.pipeline.publish_cache_stats();
    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics recorder not installed").into_response(),
    }
}
