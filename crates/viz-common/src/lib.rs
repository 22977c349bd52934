//! Common types and utilities shared across the snapshot visualization services.

pub mod artifact;
pub mod collab;
pub mod dataset;
pub mod error;
pub mod field;
pub mod params;

pub use artifact::Artifact;
pub use collab::{Drawer, SnapshotLoader};
pub use dataset::{DatasetHandle, DatasetId, DatasetIdentity, ModificationSignature, Snapshot, SnapshotInfo};
pub use error::{DrawError, LoadError, RenderError, RenderResult, ResolutionError};
pub use field::{FieldCatalog, FieldKey};
pub use params::{
    Annotations, Axis, ExactF64, ParticleOverlay, PlotKind, PlotParameters, Resolution,
    ValueRange, VolumeQuality, VolumeSettings, WidthSpec,
};
