//! Render pipeline: resolve, key, look up, draw on miss.
//!
//! Two caches sit behind the pipeline. Interactive renders use the larger
//! one. High-resolution exports first peek the interactive cache without
//! touching its recency, then go through a small export cache of their own,
//! so large export artifacts never push interactive entries out.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use render_cache::{CacheKey, CacheStatus, RenderCache};
use tracing::{debug, info, warn};
use viz_common::{
    Artifact, DatasetHandle, DatasetId, Drawer, FieldKey, PlotParameters, RenderError,
    RenderResult,
};
use viz_protocol::{ParameterResolver, RawRenderRequest, RenderPurpose};

use crate::metrics::MetricsCollector;
use crate::registry::{Activation, DatasetRegistry};

/// A served render.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub artifact: Artifact,
    pub cache: CacheStatus,
    pub key: CacheKey,
    pub params: PlotParameters,
    pub dataset: Arc<DatasetHandle>,
}

impl RenderOutcome {
    /// Suggested download name for this render.
    pub fn file_name(&self) -> String {
        self.params.export_file_name(self.dataset.name())
    }
}

/// Composition root of the render path.
pub struct RenderPipeline {
    registry: Arc<DatasetRegistry>,
    resolver: ParameterResolver,
    drawer: Arc<dyn Drawer>,
    interactive: RenderCache,
    export: RenderCache,
    metrics: Arc<MetricsCollector>,
}

impl RenderPipeline {
    pub fn new(
        registry: Arc<DatasetRegistry>,
        resolver: ParameterResolver,
        drawer: Arc<dyn Drawer>,
        cache_capacity: usize,
        export_cache_capacity: usize,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            registry,
            resolver,
            drawer,
            interactive: RenderCache::new("interactive", cache_capacity),
            export: RenderCache::new("export", export_cache_capacity),
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<DatasetRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &ParameterResolver {
        &self.resolver
    }

    pub fn interactive_cache(&self) -> &RenderCache {
        &self.interactive
    }

    pub fn export_cache(&self) -> &RenderCache {
        &self.export
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    async fn current(&self) -> RenderResult<Arc<DatasetHandle>> {
        self.registry.current().await.ok_or(RenderError::NoDataset)
    }

    /// Render against the current dataset.
    pub async fn render(&self, raw: &RawRenderRequest) -> RenderResult<RenderOutcome> {
        let handle = match self.current().await {
            Ok(handle) => handle,
            Err(e) => {
                self.metrics.record_render_error();
                return Err(e);
            }
        };
        self.render_for(handle, raw).await
    }

    /// Render against an explicit dataset handle.
    pub async fn render_for(
        &self,
        handle: Arc<DatasetHandle>,
        raw: &RawRenderRequest,
    ) -> RenderResult<RenderOutcome> {
        let start = Instant::now();
        let result = self.lookup(&self.interactive, handle, raw, RenderPurpose::Interactive).await;
        self.finish(result, start, false).await
    }

    /// High-resolution export of the current view.
    pub async fn export_high_res(&self, raw: &RawRenderRequest) -> RenderResult<RenderOutcome> {
        let start = Instant::now();
        let handle = match self.current().await {
            Ok(handle) => handle,
            Err(e) => {
                self.metrics.record_render_error();
                return Err(e);
            }
        };

        let params = match self.resolver.resolve(raw, handle.catalog(), RenderPurpose::Export) {
            Ok(params) => params,
            Err(e) => return self.finish(Err(e.into()), start, true).await,
        };
        let key = CacheKey::build(handle.identity(), &params);

        if let Some(artifact) = self.interactive.peek(&key).await {
            debug!(key = %key, "Export served from interactive cache");
            let outcome = RenderOutcome {
                artifact,
                cache: CacheStatus::Hit,
                key,
                params,
                dataset: handle,
            };
            return self.finish(Ok(outcome), start, true).await;
        }

        let result = self.produce(&self.export, handle, params, key).await;
        self.finish(result, start, true).await
    }

    async fn lookup(
        &self,
        cache: &RenderCache,
        handle: Arc<DatasetHandle>,
        raw: &RawRenderRequest,
        purpose: RenderPurpose,
    ) -> RenderResult<RenderOutcome> {
        let params = self.resolver.resolve(raw, handle.catalog(), purpose)?;
        let key = CacheKey::build(handle.identity(), &params);
        self.produce(cache, handle, params, key).await
    }

    async fn produce(
        &self,
        cache: &RenderCache,
        handle: Arc<DatasetHandle>,
        params: PlotParameters,
        key: CacheKey,
    ) -> RenderResult<RenderOutcome> {
        let drawer = Arc::clone(&self.drawer);
        let metrics = Arc::clone(&self.metrics);
        let draw_handle = Arc::clone(&handle);
        let draw_params = params.clone();

        let lookup = cache
            .get_or_compute(key, move || async move {
                let start = Instant::now();
                let result = drawer.draw(&draw_handle, &draw_params).await;
                metrics
                    .record_draw(start.elapsed().as_micros() as u64, result.is_ok())
                    .await;
                if let Err(e) = &result {
                    warn!(
                        dataset = %draw_handle.name(),
                        field = %draw_params.field,
                        error = %e,
                        "Draw failed"
                    );
                }
                result.map_err(RenderError::from)
            })
            .await?;

        Ok(RenderOutcome {
            artifact: lookup.artifact,
            cache: lookup.status,
            key,
            params,
            dataset: handle,
        })
    }

    async fn finish(
        &self,
        result: RenderResult<RenderOutcome>,
        start: Instant,
        export: bool,
    ) -> RenderResult<RenderOutcome> {
        match &result {
            Ok(outcome) => {
                self.metrics
                    .record_render(start.elapsed().as_micros() as u64, outcome.cache, export)
                    .await;
                debug!(
                    dataset = %outcome.dataset.name(),
                    key = %outcome.key,
                    kind = outcome.params.kind.code(),
                    cache = outcome.cache.as_str(),
                    export,
                    "Render served"
                );
            }
            Err(_) => self.metrics.record_render_error(),
        }
        result
    }

    /// Load `name` fresh and make it current.
    pub async fn load_dataset(&self, name: &str) -> RenderResult<Arc<DatasetHandle>> {
        let start = Instant::now();
        let result = self.registry.load(name).await;
        self.after_activation(result, start).await
    }

    /// Make `name` current, reusing a resident handle when possible.
    pub async fn activate(&self, name: &str) -> RenderResult<Arc<DatasetHandle>> {
        let start = Instant::now();
        let result = self.registry.activate(name).await;
        self.after_activation(result, start).await
    }

    async fn after_activation(
        &self,
        result: Result<Activation, viz_common::LoadError>,
        start: Instant,
    ) -> RenderResult<Arc<DatasetHandle>> {
        let elapsed = start.elapsed().as_micros() as u64;
        match result {
            Ok(activation) => {
                if activation.loaded {
                    self.metrics.record_dataset_load(elapsed, true).await;
                }
                self.invalidate(&activation.superseded).await;
                Ok(activation.handle)
            }
            Err(e) => {
                self.metrics.record_dataset_load(elapsed, false).await;
                Err(e.into())
            }
        }
    }

    /// Switch the data directory, dropping everything rendered from the old one.
    pub async fn set_data_dir(&self, dir: &Path) -> RenderResult<()> {
        let retired = self.registry.set_data_dir(dir).await?;
        self.invalidate(&retired).await;
        Ok(())
    }

    /// Drop cached renders of superseded datasets from both caches.
    pub async fn invalidate(&self, datasets: &[DatasetId]) -> usize {
        let mut removed = 0;
        for id in datasets {
            removed += self.interactive.invalidate_dataset(*id).await;
            removed += self.export.invalidate_dataset(*id).await;
        }
        if !datasets.is_empty() {
            info!(datasets = datasets.len(), removed, "Invalidated superseded datasets");
        }
        removed
    }

    /// Fields of the current dataset, in catalog order.
    pub async fn list_fields(&self) -> RenderResult<Vec<FieldKey>> {
        Ok(self.current().await?.catalog().fields().to_vec())
    }

    /// Publish both caches' statistics to the metrics recorder.
    pub fn publish_cache_stats(&self) {
        for cache in [&self.interactive, &self.export] {
            self.metrics
                .record_cache_stats(cache.name(), cache.stats(), cache.capacity());
        }
    }

    pub async fn clear_caches(&self) {
        self.interactive.clear().await;
        self.export.clear().await;
    }
}
