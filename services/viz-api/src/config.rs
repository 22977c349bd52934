//! Service configuration.
//!
//! Values come from built-in defaults, then an optional YAML file, then
//! `VIZ_*` environment variables (a `.env` file is loaded first by the
//! binary).

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use viz_protocol::ResolverConfig;

/// Particle types the UI offers before a dataset is inspected.
pub const DEFAULT_PARTICLE_TYPES: &[&str] = &[
    "Rad_particles",
    "CIC_particles",
    "CICRad_particles",
    "StochasticStellarPop_particles",
    "Sink_particles",
];

/// Full service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory scanned for snapshots.
    pub data_dir: PathBuf,
    /// Snapshot directory name prefix.
    pub dataset_prefix: String,
    /// Interactive render cache capacity (entries).
    pub cache_capacity: usize,
    /// Export render cache capacity (entries).
    pub export_cache_capacity: usize,
    /// Loaded snapshots kept resident at once.
    pub resident_datasets: usize,
    pub particle_types: Vec<String>,
    pub max_playback_fps: f64,
    /// External plotting program; the built-in preview drawer is used when
    /// unset.
    pub render_command: Option<PathBuf>,
    pub render_args: Vec<String>,
    pub render_timeout_secs: u64,
    /// Largest raster the preview drawer will produce.
    pub preview_max_pixels: u64,
    pub resolver: ResolverConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            dataset_prefix: "plt".to_string(),
            cache_capacity: 32,
            export_cache_capacity: 4,
            resident_datasets: 1,
            particle_types: DEFAULT_PARTICLE_TYPES.iter().map(|s| s.to_string()).collect(),
            max_playback_fps: 30.0,
            render_command: None,
            render_args: Vec::new(),
            render_timeout_secs: 120,
            preview_max_pixels: 4096 * 4096,
            resolver: ResolverConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Defaults, overlaid with `path` (if any), overlaid with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `VIZ_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = env::var("VIZ_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = env::var("VIZ_DATASET_PREFIX") {
            self.dataset_prefix = prefix;
        }
        if let Some(n) = parse_env("VIZ_CACHE_CAPACITY")? {
            self.cache_capacity = n;
        }
        if let Some(n) = parse_env("VIZ_EXPORT_CACHE_CAPACITY")? {
            self.export_cache_capacity = n;
        }
        if let Some(n) = parse_env("VIZ_RESIDENT_DATASETS")? {
            self.resident_datasets = n;
        }
        if let Some(fps) = parse_env("VIZ_MAX_PLAYBACK_FPS")? {
            self.max_playback_fps = fps;
        }
        if let Ok(command) = env::var("VIZ_RENDER_COMMAND") {
            self.render_command = if command.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(command))
            };
        }
        if let Ok(args) = env::var("VIZ_RENDER_ARGS") {
            self.render_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(secs) = parse_env("VIZ_RENDER_TIMEOUT_SECS")? {
            self.render_timeout_secs = secs;
        }
        if let Ok(namespace) = env::var("VIZ_PRIMARY_NAMESPACE") {
            self.resolver.primary_namespace = namespace;
        }
        if let Some(dpi) = parse_env("VIZ_EXPORT_DPI")? {
            self.resolver.export_dpi = dpi;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.cache_capacity > 0, "cache_capacity must be at least 1");
        anyhow::ensure!(
            self.export_cache_capacity > 0,
            "export_cache_capacity must be at least 1"
        );
        anyhow::ensure!(self.resident_datasets > 0, "resident_datasets must be at least 1");
        anyhow::ensure!(
            self.max_playback_fps.is_finite() && self.max_playback_fps > 0.0,
            "max_playback_fps must be positive"
        );
        anyhow::ensure!(self.render_timeout_secs > 0, "render_timeout_secs must be positive");
        Ok(())
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid value for {}: '{}'", name, value)),
        Err(_) => Ok(None),
    }
}
