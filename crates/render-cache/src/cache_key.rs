//! Cache keys for rendered artifacts.
//!
//! A key is the dataset's load token plus a BLAKE3 digest of a canonical,
//! tagged byte encoding of the dataset identity and the plot parameters.
//! Every variable-length value is length-prefixed and every optional value
//! carries a presence tag, so distinct parameter records never encode to the
//! same byte stream.

use std::fmt;

use viz_common::{
    Annotations, DatasetId, DatasetIdentity, ExactF64, FieldKey, ParticleOverlay, PlotKind,
    PlotParameters, Resolution, ValueRange, VolumeQuality, VolumeSettings, WidthSpec,
};

/// Bumped whenever the encoding below changes.
const KEY_FORMAT_VERSION: u8 = 1;

/// Cache key for a rendered artifact.
///
/// Equal keys mean equal (identity, parameters) pairs. The dataset id is kept
/// in the clear so that invalidation can match entries without rehashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    dataset: DatasetId,
    digest: [u8; 32],
}

impl CacheKey {
    /// Build the key for rendering `params` against the dataset `identity`.
    pub fn build(identity: &DatasetIdentity, params: &PlotParameters) -> Self {
        let mut enc = KeyEncoder::new();
        enc.u8(KEY_FORMAT_VERSION);
        enc.identity(identity);
        enc.params(params);
        Self {
            dataset: identity.id,
            digest: enc.finish(),
        }
    }

    pub fn dataset(&self) -> DatasetId {
        self.dataset
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Lowercase hex form of the digest.
    pub fn digest_hex(&self) -> String {
        self.digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dataset, self.digest_hex())
    }
}

struct KeyEncoder {
    hasher: blake3::Hasher,
}

impl KeyEncoder {
    fn new() -> Self {
        Self {
            hasher: blake3::Hasher::new(),
        }
    }

    fn finish(self) -> [u8; 32] {
        self.hasher.finalize().into()
    }

    fn bytes(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    fn u8(&mut self, v: u8) {
        self.bytes(&[v]);
    }

    fn bool(&mut self, v: bool) {
        self.u8(v as u8);
    }

    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.bytes(&v.to_le_bytes());
    }

    fn f64(&mut self, v: ExactF64) {
        self.u64(v.to_bits());
    }

    fn str(&mut self, s: &str) {
        self.u64(s.len() as u64);
        self.bytes(s.as_bytes());
    }

    fn opt<T>(&mut self, value: Option<T>, mut write: impl FnMut(&mut Self, T)) {
        match value {
            None => self.u8(0),
            Some(v) => {
                self.u8(1);
                write(self, v);
            }
        }
    }

    fn field(&mut self, key: &FieldKey) {
        self.str(&key.namespace);
        self.str(&key.name);
    }

    fn identity(&mut self, identity: &DatasetIdentity) {
        self.u64(identity.id.0);
        self.str(&identity.path.to_string_lossy());
        self.bytes(&identity.signature.modified_nanos.to_le_bytes());
        self.u64(identity.signature.len);
    }

    fn params(&mut self, p: &PlotParameters) {
        self.u8(match p.kind {
            PlotKind::Slice => 1,
            PlotKind::Projection => 2,
            PlotKind::Volume => 3,
        });
        self.opt(p.axis, |e, a| e.str(a.as_str()));
        self.field(&p.field);
        self.opt(p.weight_field.as_ref(), |e, w| e.field(w));
        self.str(&p.colormap);
        self.bool(p.log_scale);
        self.range(&p.range);
        self.opt(p.field_unit.as_deref(), |e, u| e.str(u));
        self.annotations(&p.annotations);
        self.width(&p.width);
        self.particles(&p.particles);
        self.opt(p.volume.as_ref(), |e, v| e.volume(v));
        self.resolution(&p.resolution);
    }

    fn range(&mut self, range: &ValueRange) {
        self.opt(range.min, |e, v| e.f64(v));
        self.opt(range.max, |e, v| e.f64(v));
    }

    fn annotations(&mut self, a: &Annotations) {
        self.bool(a.colorbar);
        self.opt(a.colorbar_label.as_deref(), |e, s| e.str(s));
        self.bool(a.scale_bar);
        self.opt(a.scale_bar_size, |e, v| e.f64(v));
        self.opt(a.scale_bar_unit.as_deref(), |e, s| e.str(s));
        self.bool(a.grids);
        self.bool(a.timestamp);
        self.opt(a.top_left_text.as_deref(), |e, s| e.str(s));
        self.opt(a.top_right_text.as_deref(), |e, s| e.str(s));
    }

    fn width(&mut self, width: &WidthSpec) {
        match width {
            WidthSpec::FullDomain => self.u8(0),
            WidthSpec::Explicit { value, unit } => {
                self.u8(1);
                self.f64(*value);
                self.str(unit);
            }
        }
    }

    fn particles(&mut self, overlay: &ParticleOverlay) {
        // BTreeSet iteration is sorted, so selection order cannot leak in.
        self.u64(overlay.types.len() as u64);
        for ptype in &overlay.types {
            self.str(ptype);
        }
        self.u32(overlay.size);
        self.str(&overlay.color);
    }

    fn volume(&mut self, v: &VolumeSettings) {
        self.f64(v.theta);
        self.f64(v.phi);
        self.u8(match v.quality {
            VolumeQuality::Preview => 0,
            VolumeQuality::Full => 1,
        });
        self.u32(v.n_layers);
        self.bool(v.box_frame);
    }

    fn resolution(&mut self, r: &Resolution) {
        match *r {
            Resolution::Dpi { dpi } => {
                self.u8(0);
                self.u32(dpi);
            }
            Resolution::Pixels { width, height } => {
                self.u8(1);
                self.u32(width);
                self.u32(height);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use viz_common::{Axis, ModificationSignature};

    fn identity(id: u64) -> DatasetIdentity {
        DatasetIdentity {
            id: DatasetId(id),
            path: PathBuf::from("/data/plt00010"),
            signature: ModificationSignature {
                modified_nanos: 1_700_000_000_000_000_000,
                len: 4096,
            },
        }
    }

    fn params() -> PlotParameters {
        PlotParameters {
            kind: PlotKind::Slice,
            axis: Some(Axis::Z),
            field: FieldKey::new("gas", "density"),
            weight_field: None,
            colormap: "viridis".into(),
            log_scale: true,
            range: ValueRange::auto(),
            field_unit: None,
            annotations: Annotations::default(),
            width: WidthSpec::FullDomain,
            particles: ParticleOverlay::none(10, "red"),
            volume: None,
            resolution: Resolution::Dpi { dpi: 150 },
        }
    }

    #[test]
    fn test_same_inputs_same_key() {
        assert_eq!(
            CacheKey::build(&identity(1), &params()),
            CacheKey::build(&identity(1), &params())
        );
    }

    #[test]
    fn test_identity_changes_key() {
        let base = CacheKey::build(&identity(1), &params());
        assert_ne!(base, CacheKey::build(&identity(2), &params()));

        let mut touched = identity(1);
        touched.signature.modified_nanos += 1;
        assert_ne!(base, CacheKey::build(&touched, &params()));
    }

    #[test]
    fn test_particle_order_does_not_matter() {
        let mut a = params();
        a.particles.types.insert("A_particles".into());
        a.particles.types.insert("B_particles".into());
        let mut b = params();
        b.particles.types = BTreeSet::new();
        b.particles.types.insert("B_particles".into());
        b.particles.types.insert("A_particles".into());
        assert_eq!(CacheKey::build(&identity(1), &a), CacheKey::build(&identity(1), &b));
    }

    #[test]
    fn test_adjacent_strings_do_not_collide() {
        let mut a = params();
        a.annotations.top_left_text = Some("ab".into());
        a.annotations.top_right_text = Some("c".into());
        let mut b = params();
        b.annotations.top_left_text = Some("a".into());
        b.annotations.top_right_text = Some("bc".into());
        assert_ne!(CacheKey::build(&identity(1), &a), CacheKey::build(&identity(1), &b));
    }

    #[test]
    fn test_none_differs_from_empty() {
        let mut a = params();
        a.field_unit = None;
        let mut b = params();
        b.field_unit = Some(String::new());
        assert_ne!(CacheKey::build(&identity(1), &a), CacheKey::build(&identity(1), &b));
    }

    #[test]
    fn test_full_domain_differs_from_zero_width() {
        let mut b = params();
        b.width = WidthSpec::Explicit {
            value: ExactF64::new(0.0).unwrap(),
            unit: String::new(),
        };
        assert_ne!(
            CacheKey::build(&identity(1), &params()),
            CacheKey::build(&identity(1), &b)
        );
    }

    #[test]
    fn test_float_bits_matter() {
        let mut a = params();
        a.range.min = ExactF64::new(0.1 + 0.2);
        let mut b = params();
        b.range.min = ExactF64::new(0.3);
        assert_ne!(CacheKey::build(&identity(1), &a), CacheKey::build(&identity(1), &b));
    }

    #[test]
    fn test_display() {
        let key = CacheKey::build(&identity(7), &params());
        let text = key.to_string();
        assert!(text.starts_with("ds7:"));
        assert_eq!(text.len(), "ds7:".len() + 64);
    }
}
