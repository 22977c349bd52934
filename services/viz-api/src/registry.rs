//! Dataset registry: the current snapshot and the resident set.
//!
//! Handles are replaced, never mutated. Swapping the current handle happens
//! under a write lock, so a reader sees either the old handle or the new one.
//! Every operation that pushes a handle out of the resident set returns the
//! superseded ids; the caller owns invalidating caches for them.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use plotfile::list_plotfiles;
use tokio::sync::RwLock;
use tracing::{info, warn};
use viz_common::{DatasetHandle, DatasetId, LoadError, SnapshotLoader};

/// Result of making a dataset current.
#[derive(Debug, Clone)]
pub struct Activation {
    pub handle: Arc<DatasetHandle>,
    /// Handles that left the resident set.
    pub superseded: Vec<DatasetId>,
    /// False when a resident handle was reused.
    pub loaded: bool,
}

struct RegistryState {
    data_dir: PathBuf,
    current: Option<Arc<DatasetHandle>>,
    /// Least recently activated first.
    resident: VecDeque<Arc<DatasetHandle>>,
}

/// Tracks loaded snapshots for one data directory.
pub struct DatasetRegistry {
    loader: Arc<dyn SnapshotLoader>,
    prefix: String,
    resident_capacity: usize,
    state: RwLock<RegistryState>,
}

impl DatasetRegistry {
    pub fn new(
        loader: Arc<dyn SnapshotLoader>,
        data_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        resident_capacity: usize,
    ) -> Self {
        Self {
            loader,
            prefix: prefix.into(),
            resident_capacity: resident_capacity.max(1),
            state: RwLock::new(RegistryState {
                data_dir: data_dir.into(),
                current: None,
                resident: VecDeque::new(),
            }),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub async fn data_dir(&self) -> PathBuf {
        self.state.read().await.data_dir.clone()
    }

    /// The current handle, if any.
    pub async fn current(&self) -> Option<Arc<DatasetHandle>> {
        self.state.read().await.current.clone()
    }

    /// Resident handles, least recently activated first.
    pub async fn resident(&self) -> Vec<Arc<DatasetHandle>> {
        self.state.read().await.resident.iter().cloned().collect()
    }

    /// Snapshot names in the data directory, in registration order.
    ///
    /// `prefix` overrides the configured prefix.
    pub async fn scan(&self, prefix: Option<&str>) -> Result<Vec<String>, LoadError> {
        let dir = self.data_dir().await;
        let prefix = prefix.unwrap_or(&self.prefix);
        list_plotfiles(&dir, prefix).map_err(|e| e.into_load_error(&dir))
    }

    /// Switch to another data directory. All resident handles are retired.
    pub async fn set_data_dir(&self, dir: &Path) -> Result<Vec<DatasetId>, LoadError> {
        if !dir.is_dir() {
            return Err(LoadError::NotFound(dir.to_path_buf()));
        }

        let mut state = self.state.write().await;
        state.data_dir = dir.to_path_buf();
        state.current = None;
        let superseded: Vec<DatasetId> = state.resident.drain(..).map(|h| h.id()).collect();

        info!(
            data_dir = %dir.display(),
            retired = superseded.len(),
            "Changed data directory"
        );
        Ok(superseded)
    }

    /// Load `name` from disk under a fresh id and make it current.
    ///
    /// A resident handle with the same name is replaced. On failure the
    /// current handle is left untouched.
    pub async fn load(&self, name: &str) -> Result<Activation, LoadError> {
        validate_name(name)?;
        let path = self.data_dir().await.join(name);

        let start = Instant::now();
        let snapshot = self.loader.load(&path).await.map_err(|e| {
            warn!(dataset = %name, error = %e, "Dataset load failed; keeping current dataset");
            e
        })?;
        let handle = Arc::new(DatasetHandle::from_snapshot(name, snapshot));

        let mut state = self.state.write().await;
        let mut superseded = Vec::new();
        state.resident.retain(|h| {
            let keep = h.name() != name;
            if !keep {
                superseded.push(h.id());
            }
            keep
        });
        state.resident.push_back(Arc::clone(&handle));
        while state.resident.len() > self.resident_capacity {
            if let Some(old) = state.resident.pop_front() {
                superseded.push(old.id());
            }
        }
        state.current = Some(Arc::clone(&handle));

        info!(
            dataset = %name,
            id = %handle.id(),
            fields = handle.catalog().len(),
            superseded = superseded.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );

        Ok(Activation {
            handle,
            superseded,
            loaded: true,
        })
    }

    /// Make `name` current, reusing its resident handle when there is one.
    pub async fn activate(&self, name: &str) -> Result<Activation, LoadError> {
        {
            let mut state = self.state.write().await;
            let position = state.resident.iter().position(|h| h.name() == name);
            if let Some(index) = position {
                if let Some(handle) = state.resident.remove(index) {
                    state.resident.push_back(Arc::clone(&handle));
                    state.current = Some(Arc::clone(&handle));
                    return Ok(Activation {
                        handle,
                        superseded: Vec::new(),
                        loaded: false,
                    });
                }
            }
        }
        self.load(name).await
    }
}

/// Dataset names are single path components.
fn validate_name(name: &str) -> Result<(), LoadError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\');
    if valid {
        Ok(())
    } else {
        Err(LoadError::UnknownDataset(name.to_string()))
    }
}
