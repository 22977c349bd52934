//! Playback control handlers.

use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde::Deserialize;
use tracing::instrument;
use viz_protocol::RawRenderRequest;

use super::common::ApiResult;
use crate::playback::PlaybackStatus;
use crate::state::AppState;

fn default_fps() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub struct PlaybackRequest {
    pub playing: bool,
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// View rendered for every frame; same keys as `/api/slice`.
    #[serde(default)]
    pub params: RawRenderRequest,
}

/// POST /api/playback - start, restart or stop playback
#[instrument(skip(state, request), fields(playing = request.playing, fps = request.fps))]
pub async fn set_playback_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<PlaybackRequest>,
) -> ApiResult<Json<PlaybackStatus>> {
    let status = state
        .playback
        .set_playback(request.playing, request.fps, request.params)
        .await?;
    Ok(Json(status))
}

/// GET /api/playback - playback status
pub async fn playback_status_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<PlaybackStatus> {
    Json(state.playback.status().await)
}
