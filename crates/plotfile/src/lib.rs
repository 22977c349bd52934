//! AMReX plotfile reader for QUOKKA snapshots.
//!
//! Only the metadata needed to plan renders is read: the top-level `Header`
//! (variable names, simulation time, domain geometry) and the particle
//! subdirectories. Field data under `Level_*` is left to the drawing backend.
//!
//! # Layout
//!
//! ```text
//! plt00100/
//!   Header
//!   Level_0/...
//!   CIC_particles/Header
//!   Sink_particles/Header
//! ```

pub mod catalog;
pub mod error;
pub mod header;
pub mod loader;

pub use catalog::{build_catalog, derived_fields, find_particle_types, NATIVE_NAMESPACE};
pub use error::{PlotfileError, PlotfileResult};
pub use header::PlotfileHeader;
pub use loader::{list_plotfiles, PlotfileLoader};
