//! Snapshot visualization API server.
//!
//! Serves on-demand renders of simulation snapshots behind a render cache.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use viz_api::config::ServiceConfig;
use viz_api::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "viz-api")]
#[command(about = "Render server for simulation snapshots")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8000", env = "VIZ_LISTEN_ADDR")]
    listen: String,

    /// Log level (used when RUST_LOG is unset)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "VIZ_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// YAML configuration file
    #[arg(short, long, env = "VIZ_CONFIG")]
    config: Option<PathBuf>,

    /// Snapshot directory (overrides the configuration file)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build().context("Failed to create Tokio runtime")?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let mut config = ServiceConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    info!(
        data_dir = %config.data_dir.display(),
        cache_capacity = config.cache_capacity,
        export_cache_capacity = config.export_cache_capacity,
        resident_datasets = config.resident_datasets,
        "Starting visualization API server"
    );

    let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics exporter initialized");

    let state = Arc::new(AppState::new(config)?.with_prometheus(prometheus));
    let app = viz_api::build_router(state);

    let addr: SocketAddr = args.listen.parse().context("Invalid listen address")?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
