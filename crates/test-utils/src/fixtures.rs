//! Common test fixtures for snapshot-viz tests.
//!
//! The catalog here matches what the plotfile loader derives from the
//! [`QUOKKA_VARIABLES`] header, so tests built on mocks and tests built on
//! generated plotfiles see the same fields.

use std::path::Path;
use std::sync::Arc;

use viz_common::{
    DatasetHandle, FieldCatalog, FieldKey, ModificationSignature, Snapshot, SnapshotInfo,
};

/// On-disk variable names of a typical QUOKKA hydro run.
pub const QUOKKA_VARIABLES: [&str; 7] = [
    "gasDensity",
    "x-GasMomentum",
    "y-GasMomentum",
    "z-GasMomentum",
    "gasEnergy",
    "gasInternalEnergy",
    "scalar_0",
];

/// Particle types present in fixture snapshots.
pub const FIXTURE_PARTICLE_TYPES: [&str; 2] = ["CIC_particles", "Sink_particles"];

/// Common field keys.
pub mod fields {
    use viz_common::FieldKey;

    pub fn density() -> FieldKey {
        FieldKey::new("gas", "density")
    }

    pub fn temperature() -> FieldKey {
        FieldKey::new("gas", "temperature")
    }

    pub fn native_density() -> FieldKey {
        FieldKey::new("boxlib", "gasDensity")
    }

    pub fn cell_volume() -> FieldKey {
        FieldKey::new("index", "cell_volume")
    }
}

/// Catalog of a QUOKKA snapshot with hydro variables and two particle types.
pub fn quokka_catalog() -> FieldCatalog {
    let mut keys: Vec<FieldKey> = QUOKKA_VARIABLES
        .iter()
        .map(|v| FieldKey::new("boxlib", *v))
        .collect();

    let derived = [
        "density",
        "momentum_density_x",
        "momentum_density_y",
        "momentum_density_z",
        "velocity_x",
        "velocity_y",
        "velocity_z",
        "velocity_magnitude",
        "total_energy_density",
        "internal_energy_density",
        "number_density",
        "cell_mass",
        "temperature",
    ];
    keys.extend(derived.iter().map(|name| FieldKey::new("gas", *name)));
    keys.push(fields::cell_volume());

    FieldCatalog::new(
        keys,
        FIXTURE_PARTICLE_TYPES.iter().map(|p| p.to_string()),
    )
}

/// Header metadata of a 64^3 unit-cube snapshot.
pub fn cube_info(time: f64) -> SnapshotInfo {
    SnapshotInfo {
        domain_dimensions: vec![64, 64, 64],
        current_time: time,
        max_level: 0,
        domain_left_edge: vec![0.0, 0.0, 0.0],
        domain_right_edge: vec![1.0, 1.0, 1.0],
    }
}

/// A snapshot at `path` with the QUOKKA catalog.
pub fn quokka_snapshot(path: &Path, signature: ModificationSignature) -> Snapshot {
    Snapshot {
        path: path.to_path_buf(),
        signature,
        catalog: quokka_catalog(),
        info: cube_info(0.0),
    }
}

/// A freshly minted handle named `name`, for tests that bypass loading.
pub fn quokka_handle(name: &str) -> Arc<DatasetHandle> {
    let path = Path::new("/data").join(name);
    Arc::new(DatasetHandle::from_snapshot(
        name,
        quokka_snapshot(&path, ModificationSignature::default()),
    ))
}
