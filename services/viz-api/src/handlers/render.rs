//! Render and export handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::instrument;
use viz_protocol::RawRenderRequest;

use super::common::ApiResult;
use crate::pipeline::RenderOutcome;
use crate::state::AppState;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const X_RENDER_KEY: HeaderName = HeaderName::from_static("x-render-key");

fn raw_request(query: &HashMap<String, String>) -> RawRenderRequest {
    RawRenderRequest::from_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

fn image_headers(outcome: &RenderOutcome) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&outcome.artifact.content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(X_CACHE, HeaderValue::from_static(outcome.cache.as_str()));
    if let Ok(value) = HeaderValue::from_str(&outcome.key.to_string()) {
        headers.insert(X_RENDER_KEY, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers
}

/// GET /api/slice - render the requested view of the current dataset
#[instrument(skip(state, query))]
pub async fn render_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let outcome = state.pipeline.render(&raw_request(&query)).await?;
    let headers = image_headers(&outcome);
    Ok((StatusCode::OK, headers, outcome.artifact.data).into_response())
}

/// GET /api/export/current_frame - high-resolution download of the view
#[instrument(skip(state, query))]
pub async fn export_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let outcome = state.pipeline.export_high_res(&raw_request(&query)).await?;
    let mut headers = image_headers(&outcome);

    let file_name = outcome.file_name().replace(['"', '\\'], "_");
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok((StatusCode::OK, headers, outcome.artifact.data).into_response())
}
