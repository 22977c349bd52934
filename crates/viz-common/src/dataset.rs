//! Dataset identity and loaded snapshot handles.
//!
//! A handle is created on load and replaced, never mutated, when a snapshot
//! is loaded again. Its `DatasetId` is minted fresh on every load, so keys
//! built against a reloaded snapshot never collide with the previous load.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::FieldCatalog;

static NEXT_DATASET_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique token identifying one load of one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetId(pub u64);

impl DatasetId {
    /// Mint a token that has never been handed out by this process.
    pub fn next() -> Self {
        Self(NEXT_DATASET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ds{}", self.0)
    }
}

/// On-disk modification signature of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ModificationSignature {
    /// Modification time in nanoseconds since the Unix epoch (0 if unknown).
    pub modified_nanos: u128,
    /// Size in bytes of the file the signature was taken from.
    pub len: u64,
}

impl ModificationSignature {
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let modified_nanos = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self {
            modified_nanos,
            len: meta.len(),
        }
    }
}

/// Full identity of a loaded snapshot: what goes into cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetIdentity {
    pub id: DatasetId,
    pub path: PathBuf,
    pub signature: ModificationSignature,
}

/// Header-level metadata of a snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Level-0 cell counts per dimension.
    pub domain_dimensions: Vec<u64>,
    /// Simulation time of the snapshot (code units).
    pub current_time: f64,
    /// Finest refinement level present.
    pub max_level: u32,
    pub domain_left_edge: Vec<f64>,
    pub domain_right_edge: Vec<f64>,
}

/// What a loader returns: everything about a snapshot except its load token.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub path: PathBuf,
    pub signature: ModificationSignature,
    pub catalog: FieldCatalog,
    pub info: SnapshotInfo,
}

/// A loaded snapshot. Shared read-only via `Arc`.
#[derive(Debug)]
pub struct DatasetHandle {
    name: String,
    identity: DatasetIdentity,
    catalog: FieldCatalog,
    info: SnapshotInfo,
    loaded_at: DateTime<Utc>,
}

impl DatasetHandle {
    /// Wrap a freshly loaded snapshot under a new `DatasetId`.
    pub fn from_snapshot(name: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            name: name.into(),
            identity: DatasetIdentity {
                id: DatasetId::next(),
                path: snapshot.path,
                signature: snapshot.signature,
            },
            catalog: snapshot.catalog,
            info: snapshot.info,
            loaded_at: Utc::now(),
        }
    }

    pub fn id(&self) -> DatasetId {
        self.identity.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.identity.path
    }

    pub fn identity(&self) -> &DatasetIdentity {
        &self.identity
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn info(&self) -> &SnapshotInfo {
        &self.info
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}
