//! HTTP request handlers.
//!
//! - `datasets`: dataset listing, loading, data directory and field catalog
//! - `render`: interactive renders and high-resolution export
//! - `playback`: playback control
//! - `cache`: render cache diagnostics
//! - `health`: liveness, service info and Prometheus metrics
//! - `common`: error body and status mapping

pub mod cache;
pub mod common;
pub mod datasets;
pub mod health;
pub mod playback;
pub mod render;

pub use cache::{cache_clear_handler, cache_stats_handler};
pub use common::{ApiError, ApiResult};
pub use datasets::{
    list_datasets_handler, list_fields_handler, load_dataset_handler, particle_types_handler,
    set_data_dir_handler,
};
pub use health::{health_handler, metrics_handler, server_info_handler};
pub use playback::{playback_status_handler, set_playback_handler};
pub use render::{export_handler, render_handler};
