//! Interfaces to the external collaborators: the snapshot loader and the
//! drawing backend.

use std::path::Path;

use async_trait::async_trait;

use crate::artifact::Artifact;
use crate::dataset::{DatasetHandle, Snapshot};
use crate::error::{DrawError, LoadError};
use crate::params::PlotParameters;

/// Reads a snapshot's metadata and field catalog from disk.
#[async_trait]
pub trait SnapshotLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Snapshot, LoadError>;
}

/// Draws a resolved view of a loaded snapshot into an image.
#[async_trait]
pub trait Drawer: Send + Sync {
    async fn draw(&self, dataset: &DatasetHandle, params: &PlotParameters)
        -> Result<Artifact, DrawError>;
}
