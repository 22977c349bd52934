//! Synthetic plotfile generators.
//!
//! Writes header-only AMReX plotfile directories: enough for the loader to
//! build a catalog, without any field data.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::fixtures::{FIXTURE_PARTICLE_TYPES, QUOKKA_VARIABLES};

/// Builder for one synthetic plotfile directory.
///
/// # Example
///
/// ```
/// use test_utils::PlotfileBuilder;
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = PlotfileBuilder::new("plt00010").time(0.5).write(dir.path()).unwrap();
/// assert!(path.join("Header").exists());
/// ```
#[derive(Debug, Clone)]
pub struct PlotfileBuilder {
    name: String,
    variables: Vec<String>,
    time: f64,
    dimensions: [u64; 3],
    finest_level: u32,
    particle_types: Vec<String>,
}

impl PlotfileBuilder {
    /// A 64^3 plotfile with the QUOKKA hydro variables and no particles.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            variables: QUOKKA_VARIABLES.iter().map(|v| v.to_string()).collect(),
            time: 0.0,
            dimensions: [64, 64, 64],
            finest_level: 0,
            particle_types: Vec::new(),
        }
    }

    pub fn variables(mut self, variables: &[&str]) -> Self {
        self.variables = variables.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn dimensions(mut self, dimensions: [u64; 3]) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn finest_level(mut self, level: u32) -> Self {
        self.finest_level = level;
        self
    }

    /// Add the fixture particle types (CIC and Sink).
    pub fn with_particles(mut self) -> Self {
        self.particle_types = FIXTURE_PARTICLE_TYPES.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn particle_type(mut self, name: &str) -> Self {
        self.particle_types.push(name.to_string());
        self
    }

    /// Render the `Header` file contents.
    pub fn header_text(&self) -> String {
        let mut out = String::new();
        out.push_str("HyperCLaw-V1.1\n");
        out.push_str(&format!("{}\n", self.variables.len()));
        for var in &self.variables {
            out.push_str(var);
            out.push('\n');
        }
        out.push_str("3\n");
        out.push_str(&format!("{}\n", self.time));
        out.push_str(&format!("{}\n", self.finest_level));
        out.push_str("0 0 0\n");
        out.push_str("1 1 1\n");

        let ratios = vec!["2"; self.finest_level as usize].join(" ");
        out.push_str(&ratios);
        out.push('\n');

        let [nx, ny, nz] = self.dimensions;
        let mut boxes = Vec::new();
        for level in 0..=self.finest_level {
            let scale = 1u64 << level;
            boxes.push(format!(
                "((0,0,0) ({},{},{}) (0,0,0))",
                nx * scale - 1,
                ny * scale - 1,
                nz * scale - 1
            ));
        }
        out.push_str(&boxes.join(" "));
        out.push('\n');

        let steps = vec!["0"; self.finest_level as usize + 1].join(" ");
        out.push_str(&steps);
        out.push('\n');
        out
    }

    /// Write the plotfile under `parent`, returning its path.
    pub fn write(&self, parent: &Path) -> io::Result<PathBuf> {
        let root = parent.join(&self.name);
        fs::create_dir_all(&root)?;
        fs::write(root.join("Header"), self.header_text())?;
        fs::create_dir_all(root.join("Level_0"))?;

        for ptype in &self.particle_types {
            let dir = root.join(ptype);
            fs::create_dir_all(&dir)?;
            fs::write(dir.join("Header"), "Version_Two_Dot_One_double\n3\n0\n")?;
        }
        Ok(root)
    }
}

/// Create a temporary data directory containing header-only plotfiles named
/// `names`, each with particles and a time equal to its position.
pub fn create_data_dir(names: &[&str]) -> tempfile::TempDir {
    let dir = crate::paths::temp_test_dir();
    for (i, name) in names.iter().enumerate() {
        PlotfileBuilder::new(name)
            .time(i as f64)
            .with_particles()
            .write(dir.path())
            .expect("Failed to write synthetic plotfile");
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let text = PlotfileBuilder::new("plt00000")
            .variables(&["gasDensity"])
            .time(2.5)
            .header_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "HyperCLaw-V1.1");
        assert_eq!(lines[1], "1");
        assert_eq!(lines[2], "gasDensity");
        assert_eq!(lines[3], "3");
        assert_eq!(lines[4], "2.5");
        assert_eq!(lines[9], "((0,0,0) (63,63,63) (0,0,0))");
    }

    #[test]
    fn test_create_data_dir() {
        let dir = create_data_dir(&["plt00000", "plt00010"]);
        assert!(dir.path().join("plt00000/Header").exists());
        assert!(dir.path().join("plt00010/CIC_particles/Header").exists());
    }
}
