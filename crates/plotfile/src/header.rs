//! Plotfile `Header` parsing.
//!
//! The header is line oriented:
//!
//! ```text
//! HyperCLaw-V1.1          version string
//! 7                       number of variables
//! gasDensity              one name per line
//! ...
//! 3                       dimensionality
//! 0.25                    simulation time
//! 0                       finest level
//! 0 0 0                   domain lower corner
//! 1 1 1                   domain upper corner
//!                         refinement ratios (empty for a single level)
//! ((0,0,0) (63,63,63) (0,0,0))   level-0 index box, then finer levels
//! ```
//!
//! Everything after the domain boxes is ignored.

use std::fs;
use std::path::Path;

use viz_common::SnapshotInfo;

use crate::error::{PlotfileError, PlotfileResult};

/// Parsed top of a plotfile `Header`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotfileHeader {
    pub version: String,
    pub variables: Vec<String>,
    pub dimensionality: usize,
    pub time: f64,
    pub finest_level: u32,
    pub prob_lo: Vec<f64>,
    pub prob_hi: Vec<f64>,
    /// Level-0 cell counts per dimension.
    pub domain_dimensions: Vec<u64>,
}

impl PlotfileHeader {
    /// Read and parse `<dir>/Header`.
    pub fn read(dir: &Path) -> PlotfileResult<Self> {
        let path = dir.join("Header");
        if !path.is_file() {
            return Err(PlotfileError::NotAPlotfile(dir.to_path_buf()));
        }
        let text = fs::read_to_string(&path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> PlotfileResult<Self> {
        let mut lines = Lines::new(text);

        let version = lines.next_line("version")?.to_string();
        if version.is_empty() {
            return Err(PlotfileError::header(1, "empty version line"));
        }

        let nvars: usize = lines.next_parsed("variable count")?;
        let mut variables = Vec::with_capacity(nvars);
        for _ in 0..nvars {
            variables.push(lines.next_line("variable name")?.to_string());
        }

        let dimensionality: usize = lines.next_parsed("dimensionality")?;
        if !(1..=3).contains(&dimensionality) {
            return Err(PlotfileError::header(
                lines.number,
                format!("unsupported dimensionality {}", dimensionality),
            ));
        }

        let time: f64 = lines.next_parsed("time")?;
        let finest_level: u32 = lines.next_parsed("finest level")?;
        let prob_lo = lines.next_floats("domain lower corner", dimensionality)?;
        let prob_hi = lines.next_floats("domain upper corner", dimensionality)?;

        // Refinement ratios may be an empty line; skip to the first box.
        let domain_dimensions = loop {
            let line = lines.next_line("level-0 domain box")?;
            if line.starts_with('(') {
                break parse_box_dimensions(line, dimensionality)
                    .ok_or_else(|| PlotfileError::header(lines.number, "malformed domain box"))?;
            }
        };

        Ok(Self {
            version,
            variables,
            dimensionality,
            time,
            finest_level,
            prob_lo,
            prob_hi,
            domain_dimensions,
        })
    }

    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            domain_dimensions: self.domain_dimensions.clone(),
            current_time: self.time,
            max_level: self.finest_level,
            domain_left_edge: self.prob_lo.clone(),
            domain_right_edge: self.prob_hi.clone(),
        }
    }
}

/// Cell counts from an index box such as `((0,0,0) (63,63,63) (0,0,0))`.
fn parse_box_dimensions(line: &str, dim: usize) -> Option<Vec<u64>> {
    let cleaned: String = line
        .chars()
        .map(|c| if c == '(' || c == ')' { ' ' } else { c })
        .collect();
    let mut tuples = cleaned.split_whitespace();

    let parse = |tuple: &str| -> Option<Vec<i64>> {
        let values: Option<Vec<i64>> = tuple.split(',').map(|v| v.trim().parse().ok()).collect();
        values.filter(|v| v.len() == dim)
    };

    let lo = parse(tuples.next()?)?;
    let hi = parse(tuples.next()?)?;
    lo.iter()
        .zip(&hi)
        .map(|(l, h)| u64::try_from(h - l + 1).ok().filter(|n| *n > 0))
        .collect()
}

struct Lines<'a> {
    inner: std::str::Lines<'a>,
    number: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines(),
            number: 0,
        }
    }

    fn next_line(&mut self, what: &str) -> PlotfileResult<&'a str> {
        self.number += 1;
        self.inner
            .next()
            .map(str::trim)
            .ok_or_else(|| PlotfileError::header(self.number, format!("missing {}", what)))
    }

    fn next_parsed<T: std::str::FromStr>(&mut self, what: &str) -> PlotfileResult<T> {
        let line = self.next_line(what)?;
        line.parse()
            .map_err(|_| PlotfileError::header(self.number, format!("invalid {}: '{}'", what, line)))
    }

    fn next_floats(&mut self, what: &str, count: usize) -> PlotfileResult<Vec<f64>> {
        let line = self.next_line(what)?;
        let values: Result<Vec<f64>, _> = line.split_whitespace().map(str::parse).collect();
        match values {
            Ok(v) if v.len() == count => Ok(v),
            _ => Err(PlotfileError::header(
                self.number,
                format!("expected {} values for {}", count, what),
            )),
        }
    }
}
