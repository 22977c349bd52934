//! Application state and shared resources.

use std::sync::Arc;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use plotfile::PlotfileLoader;
use renderer::{CommandDrawer, PreviewDrawer};
use tracing::info;
use viz_common::{Drawer, SnapshotLoader};
use viz_protocol::ParameterResolver;

use crate::config::ServiceConfig;
use crate::metrics::MetricsCollector;
use crate::pipeline::RenderPipeline;
use crate::playback::PlaybackController;
use crate::registry::DatasetRegistry;

/// Shared application state.
pub struct AppState {
    pub config: ServiceConfig,
    pub pipeline: Arc<RenderPipeline>,
    pub playback: PlaybackController,
    pub metrics: Arc<MetricsCollector>,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the state with the plotfile loader and the configured drawer.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let loader: Arc<dyn SnapshotLoader> = Arc::new(PlotfileLoader::new());
        let drawer: Arc<dyn Drawer> = match &config.render_command {
            Some(program) => {
                info!(program = %program.display(), "Using external draw command");
                Arc::new(CommandDrawer::new(
                    program.clone(),
                    config.render_args.clone(),
                    config.render_timeout(),
                ))
            }
            None => {
                info!("No draw command configured; using built-in preview drawer");
                Arc::new(PreviewDrawer::new(config.preview_max_pixels))
            }
        };
        config.validate()?;
        Ok(Self::with_collaborators(config, loader, drawer))
    }

    /// Build the state around explicit collaborators.
    pub fn with_collaborators(
        config: ServiceConfig,
        loader: Arc<dyn SnapshotLoader>,
        drawer: Arc<dyn Drawer>,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::new());
        let registry = Arc::new(DatasetRegistry::new(
            loader,
            config.data_dir.clone(),
            config.dataset_prefix.clone(),
            config.resident_datasets,
        ));
        let pipeline = Arc::new(RenderPipeline::new(
            registry,
            ParameterResolver::new(config.resolver.clone()),
            drawer,
            config.cache_capacity,
            config.export_cache_capacity,
            Arc::clone(&metrics),
        ));
        let playback = PlaybackController::new(Arc::clone(&pipeline), config.max_playback_fps);

        Self {
            config,
            pipeline,
            playback,
            metrics,
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}
