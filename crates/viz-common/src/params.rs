//! Canonical plot parameters.
//!
//! A `PlotParameters` value is built only by the parameter resolver and is
//! immutable afterwards. Equality is exact and total over every field:
//! floats are compared by bit pattern through [`ExactF64`], and particle
//! selections are sets. Two records that compare equal describe the same
//! image.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::field::FieldKey;

/// A finite `f64` with exact, total equality.
///
/// `-0.0` is normalized to `0.0` on construction so that the two spellings
/// of zero compare equal; NaN and infinities are not representable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ExactF64(f64);

impl ExactF64 {
    pub fn new(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Self(if value == 0.0 { 0.0 } else { value }))
    }

    pub fn get(self) -> f64 {
        self.0
    }

    pub fn to_bits(self) -> u64 {
        self.0.to_bits()
    }
}

impl PartialEq for ExactF64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for ExactF64 {}

impl Hash for ExactF64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl TryFrom<f64> for ExactF64 {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        ExactF64::new(value).ok_or_else(|| format!("non-finite value: {}", value))
    }
}

impl From<ExactF64> for f64 {
    fn from(value: ExactF64) -> Self {
        value.0
    }
}

impl fmt::Display for ExactF64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Plot kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    /// 2-D cross-section through the domain centre.
    Slice,
    /// Line-of-sight integral.
    Projection,
    /// Camera-rendered 3-D view.
    Volume,
}

impl PlotKind {
    /// Short code used by the web UI ("slc", "prj", "vol").
    pub fn code(&self) -> &'static str {
        match self {
            PlotKind::Slice => "slc",
            PlotKind::Projection => "prj",
            PlotKind::Volume => "vol",
        }
    }

    pub fn is_planar(&self) -> bool {
        !matches!(self, PlotKind::Volume)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Colour-scale limits; `None` on either side means "compute from data".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: Option<ExactF64>,
    pub max: Option<ExactF64>,
}

impl ValueRange {
    pub fn auto() -> Self {
        Self::default()
    }

    pub fn is_auto(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Overlays drawn on top of planar plots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Annotations {
    pub colorbar: bool,
    pub colorbar_label: Option<String>,
    pub scale_bar: bool,
    pub scale_bar_size: Option<ExactF64>,
    pub scale_bar_unit: Option<String>,
    pub grids: bool,
    pub timestamp: bool,
    pub top_left_text: Option<String>,
    pub top_right_text: Option<String>,
}

/// Horizontal extent of the view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WidthSpec {
    /// Whole simulation domain. Distinct from any explicit width, including 0.
    FullDomain,
    Explicit { value: ExactF64, unit: String },
}

impl WidthSpec {
    pub fn is_full_domain(&self) -> bool {
        matches!(self, WidthSpec::FullDomain)
    }
}

/// Particle markers drawn over planar plots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticleOverlay {
    /// Selected particle types; a set, so selection order never matters.
    pub types: BTreeSet<String>,
    pub size: u32,
    pub color: String,
}

impl ParticleOverlay {
    pub fn none(default_size: u32, default_color: &str) -> Self {
        Self {
            types: BTreeSet::new(),
            size: default_size,
            color: default_color.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeQuality {
    Preview,
    Full,
}

/// Camera and transfer-function settings for volume rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeSettings {
    /// Polar angle in degrees, within [0, 180].
    pub theta: ExactF64,
    /// Azimuthal angle in degrees, within [0, 360].
    pub phi: ExactF64,
    pub quality: VolumeQuality,
    pub n_layers: u32,
    pub box_frame: bool,
}

/// Output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Resolution {
    Dpi { dpi: u32 },
    Pixels { width: u32, height: u32 },
}

/// Canonical, immutable description of one render.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlotParameters {
    pub kind: PlotKind,
    /// `None` for volume renders.
    pub axis: Option<Axis>,
    pub field: FieldKey,
    /// Only projections carry a weight field.
    pub weight_field: Option<FieldKey>,
    pub colormap: String,
    pub log_scale: bool,
    pub range: ValueRange,
    pub field_unit: Option<String>,
    pub annotations: Annotations,
    pub width: WidthSpec,
    pub particles: ParticleOverlay,
    /// Only volume renders carry volume settings.
    pub volume: Option<VolumeSettings>,
    pub resolution: Resolution,
}

impl PlotParameters {
    /// Suggested file name for an exported image of this view.
    ///
    /// Views without an axis (volume renders) use the default `z`.
    pub fn export_file_name(&self, dataset_name: &str) -> String {
        let field = self.field.to_string().replace([':', '/'], "_");
        let axis = self.axis.unwrap_or(Axis::Z);
        format!("{}_{}_{}.png", dataset_name, field, axis.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_exact_f64_rejects_non_finite() {
        assert!(ExactF64::new(f64::NAN).is_none());
        assert!(ExactF64::new(f64::INFINITY).is_none());
        assert!(ExactF64::new(f64::NEG_INFINITY).is_none());
        assert!(ExactF64::new(1e-30).is_some());
    }

    #[test]
    fn test_exact_f64_normalizes_negative_zero() {
        let pos = ExactF64::new(0.0).unwrap();
        let neg = ExactF64::new(-0.0).unwrap();
        assert_eq!(pos, neg);
        assert_eq!(hash_of(&pos), hash_of(&neg));
        assert_eq!(neg.to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn test_exact_f64_has_no_tolerance() {
        let a = ExactF64::new(0.1 + 0.2).unwrap();
        let b = ExactF64::new(0.3).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_exact_f64_serde() {
        let value: ExactF64 = serde_json::from_str("2.5").unwrap();
        assert_eq!(value.get(), 2.5);
        assert_eq!(serde_json::to_string(&value).unwrap(), "2.5");
    }

    #[test]
    fn test_particle_types_are_a_set() {
        let mut a = ParticleOverlay::none(10, "red");
        a.types.insert("B_particles".into());
        a.types.insert("A_particles".into());
        let mut b = ParticleOverlay::none(10, "red");
        b.types.insert("A_particles".into());
        b.types.insert("B_particles".into());
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_full_domain_differs_from_zero_width() {
        let zero = WidthSpec::Explicit {
            value: ExactF64::new(0.0).unwrap(),
            unit: "pc".into(),
        };
        assert_ne!(WidthSpec::FullDomain, zero);
        assert!(WidthSpec::FullDomain.is_full_domain());
    }
}
