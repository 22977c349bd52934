//! Field catalog construction.
//!
//! On-disk variables are listed under the `boxlib` namespace in header
//! order, followed by the derived `gas` fields whose inputs are present and
//! the always-available `index:cell_volume`.

use std::fs;
use std::path::Path;

use viz_common::{FieldCatalog, FieldKey};

use crate::error::PlotfileResult;

/// Namespace of fields stored on disk.
pub const NATIVE_NAMESPACE: &str = "boxlib";

/// Namespace of derived hydro fields.
pub const GAS_NAMESPACE: &str = "gas";

/// Suffix of particle container directories.
pub const PARTICLE_SUFFIX: &str = "_particles";

const AXES: [&str; 3] = ["x", "y", "z"];

/// Derived fields available for a plotfile with the given variables.
pub fn derived_fields(variables: &[String]) -> Vec<FieldKey> {
    let has = |name: &str| variables.iter().any(|v| v == name);
    let gas = |name: &str| FieldKey::new(GAS_NAMESPACE, name);

    let density = has("gasDensity");
    let momentum: Vec<bool> = AXES
        .iter()
        .map(|axis| has(&format!("{}-GasMomentum", axis)))
        .collect();
    let velocity: Vec<bool> = momentum.iter().map(|m| density && *m).collect();
    let total_energy = has("gasEnergy");
    let internal_energy = has("gasInternalEnergy");

    let mut fields = Vec::new();
    if density {
        fields.push(gas("density"));
    }
    for (axis, present) in AXES.iter().zip(&momentum) {
        if *present {
            fields.push(gas(&format!("momentum_density_{}", axis)));
        }
    }
    for (axis, present) in AXES.iter().zip(&velocity) {
        if *present {
            fields.push(gas(&format!("velocity_{}", axis)));
        }
    }
    let all_velocities = velocity.iter().all(|v| *v);
    if all_velocities {
        fields.push(gas("velocity_magnitude"));
    }
    if total_energy {
        fields.push(gas("total_energy_density"));
    }
    if internal_energy {
        fields.push(gas("internal_energy_density"));
    }
    if density {
        fields.push(gas("number_density"));
        fields.push(gas("cell_mass"));
        if (total_energy && all_velocities) || internal_energy {
            fields.push(gas("temperature"));
        }
    }
    fields.push(FieldKey::new("index", "cell_volume"));
    fields
}

/// Particle types stored in a plotfile: `*_particles` subdirectories that
/// contain a `Header`, sorted by name.
pub fn find_particle_types(dir: &Path) -> PlotfileResult<Vec<String>> {
    let mut types = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(PARTICLE_SUFFIX) && entry.path().join("Header").is_file() {
            types.push(name);
        }
    }
    types.sort();
    Ok(types)
}

/// Full catalog for a plotfile with `variables` and `particle_types`.
pub fn build_catalog(variables: &[String], particle_types: Vec<String>) -> FieldCatalog {
    let native = variables
        .iter()
        .map(|v| FieldKey::new(NATIVE_NAMESPACE, v.as_str()));
    FieldCatalog::new(native.chain(derived_fields(variables)), particle_types)
}
