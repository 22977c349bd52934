//! Snapshot loader backed by plotfile headers.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};
use viz_common::{LoadError, ModificationSignature, Snapshot, SnapshotLoader};
use walkdir::WalkDir;

use crate::catalog::{build_catalog, find_particle_types};
use crate::error::{PlotfileError, PlotfileResult};
use crate::header::PlotfileHeader;

/// Loads QUOKKA plotfile directories.
///
/// Header parsing is blocking file I/O and runs on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct PlotfileLoader;

impl PlotfileLoader {
    pub fn new() -> Self {
        Self
    }

    /// Blocking load of the plotfile at `path`.
    pub fn load_blocking(path: &Path) -> PlotfileResult<Snapshot> {
        let start = Instant::now();
        let header = PlotfileHeader::read(path)?;
        let signature = ModificationSignature::from_metadata(&path.join("Header").metadata()?);
        let particle_types = find_particle_types(path)?;
        let catalog = build_catalog(&header.variables, particle_types);

        info!(
            path = %path.display(),
            fields = catalog.len(),
            particle_types = catalog.particle_types().len(),
            time = header.time,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded plotfile header"
        );

        Ok(Snapshot {
            path: path.to_path_buf(),
            signature,
            info: header.info(),
            catalog,
        })
    }
}

#[async_trait]
impl SnapshotLoader for PlotfileLoader {
    async fn load(&self, path: &Path) -> Result<Snapshot, LoadError> {
        let owned: PathBuf = path.to_path_buf();
        let result = tokio::task::spawn_blocking(move || Self::load_blocking(&owned))
            .await
            .map_err(|e| LoadError::Io {
                path: path.to_path_buf(),
                message: format!("load task failed: {}", e),
            })?;
        result.map_err(|e| e.into_load_error(path))
    }
}

/// Plotfile directories directly under `dir` whose names start with
/// `prefix`, sorted by name.
pub fn list_plotfiles(dir: &Path, prefix: &str) -> PlotfileResult<Vec<String>> {
    if !dir.is_dir() {
        return Err(PlotfileError::NotAPlotfile(dir.to_path_buf()));
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            PlotfileError::IoError(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed")
            }))
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) {
            names.push(name);
        }
    }
    names.sort();
    debug!(dir = %dir.display(), prefix, count = names.len(), "Scanned for plotfiles");
    Ok(names)
}
