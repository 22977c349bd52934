//! Dataset listing, loading and field catalog handlers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use viz_common::SnapshotInfo;

use super::common::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DatasetsQuery {
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DatasetsResponse {
    pub data_dir: PathBuf,
    pub datasets: Vec<String>,
    pub current: Option<String>,
}

/// GET /api/datasets - snapshot directories in the data directory
#[instrument(skip(state))]
pub async fn list_datasets_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<DatasetsQuery>,
) -> ApiResult<Json<DatasetsResponse>> {
    let registry = state.pipeline.registry();
    let prefix = query.prefix.as_deref().filter(|p| !p.is_empty());
    let datasets = registry.scan(prefix).await?;
    Ok(Json(DatasetsResponse {
        data_dir: registry.data_dir().await,
        datasets,
        current: registry.current().await.map(|h| h.name().to_string()),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoadQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub name: String,
    pub id: u64,
    pub info: SnapshotInfo,
    pub field_count: usize,
    pub particle_types: Vec<String>,
}

/// POST /api/load_dataset?filename= - load a snapshot and make it current
#[instrument(skip(state))]
pub async fn load_dataset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<LoadQuery>,
) -> ApiResult<Json<LoadResponse>> {
    let name = query
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing 'filename' parameter".to_string()))?;

    let handle = state.pipeline.load_dataset(name.trim()).await?;
    Ok(Json(LoadResponse {
        name: handle.name().to_string(),
        id: handle.id().0,
        info: handle.info().clone(),
        field_count: handle.catalog().len(),
        particle_types: handle.catalog().particle_types().to_vec(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct DataDirRequest {
    pub path: PathBuf,
}

/// POST /api/set_data_dir - switch the data directory
#[instrument(skip(state))]
pub async fn set_data_dir_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<DataDirRequest>,
) -> ApiResult<Json<DatasetsResponse>> {
    state.pipeline.set_data_dir(&request.path).await?;
    let datasets = state.pipeline.registry().scan(None).await?;
    Ok(Json(DatasetsResponse {
        data_dir: request.path,
        datasets,
        current: None,
    }))
}

/// GET /api/fields - `[namespace, name]` pairs of the current dataset
#[instrument(skip(state))]
pub async fn list_fields_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<Json<Vec<[String; 2]>>> {
    let fields = state.pipeline.list_fields().await?;
    Ok(Json(
        fields
            .into_iter()
            .map(|f| [f.namespace, f.name])
            .collect(),
    ))
}

#[derive(Debug, Serialize)]
pub struct ParticleTypesResponse {
    pub particle_types: Vec<String>,
    /// Types present in the current dataset, when one is loaded.
    pub available: Option<Vec<String>>,
    pub default_size: u32,
    pub default_color: String,
}

/// GET /api/particle_types - particle types offered by the UI
pub async fn particle_types_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<ParticleTypesResponse> {
    let resolver = state.pipeline.resolver().config();
    let available = state
        .pipeline
        .registry()
        .current()
        .await
        .map(|h| h.catalog().particle_types().to_vec());
    Json(ParticleTypesResponse {
        particle_types: state.config.particle_types.clone(),
        available,
        default_size: resolver.default_particle_size,
        default_color: resolver.default_particle_color.clone(),
    })
}
