//! Parameter resolution: raw request + field catalog -> canonical parameters.
//!
//! The resolver is a pure function of the raw request, the snapshot's field
//! catalog and its own configuration. Its output is what the cache key is
//! built from, so every rule here decides what counts as "the same view":
//!
//! - textual values are trimmed; empty strings count as absent
//! - fields without a namespace land in the primary namespace
//! - an absent width is the full-domain sentinel, never zero
//! - camera angles are clamped to their declared ranges instead of rejected,
//!   so dragging the camera past a pole keeps producing frames
//! - inputs that the plot kind ignores are reset to fixed neutral values, so
//!   switching kind and back lands on the same key

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use viz_common::{
    Annotations, Axis, ExactF64, FieldCatalog, FieldKey, ParticleOverlay, PlotKind,
    PlotParameters, Resolution, ResolutionError, ValueRange, VolumeQuality, VolumeSettings,
    WidthSpec,
};

use crate::request::RawRenderRequest;

/// Valid polar camera angle, degrees.
pub const THETA_RANGE: (f64, f64) = (0.0, 180.0);
/// Valid azimuthal camera angle, degrees.
pub const PHI_RANGE: (f64, f64) = (0.0, 360.0);

/// Weight-field shortcuts accepted by the projection endpoint.
const WEIGHT_SHORTCUTS: &[(&str, (&str, &str))] = &[
    ("density", ("gas", "density")),
    ("cell_volume", ("index", "cell_volume")),
    ("cell_mass", ("gas", "cell_mass")),
];

/// Which surface a request came from; only the default resolution differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPurpose {
    Interactive,
    Export,
}

/// Defaults and limits applied during resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Namespace assumed for field references without one.
    pub primary_namespace: String,
    /// Field plotted when the request names none.
    pub default_field_name: String,
    pub default_colormap: String,
    pub default_log_scale: bool,
    pub interactive_dpi: u32,
    pub export_dpi: u32,
    pub max_dpi: u32,
    /// Upper bound for explicit pixel dimensions.
    pub max_pixels: u32,
    /// Square raster size used by preview-quality volume renders.
    pub preview_resolution_px: u32,
    pub default_particle_size: u32,
    pub default_particle_color: String,
    pub default_camera_theta: f64,
    pub default_camera_phi: f64,
    pub default_n_layers: u32,
    pub max_n_layers: u32,
    /// Volume renders default to preview quality.
    pub default_preview: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            primary_namespace: "gas".to_string(),
            default_field_name: "density".to_string(),
            default_colormap: "viridis".to_string(),
            default_log_scale: true,
            interactive_dpi: 150,
            export_dpi: 300,
            max_dpi: 1200,
            max_pixels: 8192,
            preview_resolution_px: 512,
            default_particle_size: 10,
            default_particle_color: "red".to_string(),
            default_camera_theta: 45.0,
            default_camera_phi: 45.0,
            default_n_layers: 5,
            max_n_layers: 32,
            default_preview: true,
        }
    }
}

/// Turns raw requests into canonical [`PlotParameters`].
#[derive(Debug, Clone, Default)]
pub struct ParameterResolver {
    config: ResolverConfig,
}

impl ParameterResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a raw request against a snapshot's catalog.
    pub fn resolve(
        &self,
        raw: &RawRenderRequest,
        catalog: &FieldCatalog,
        purpose: RenderPurpose,
    ) -> Result<PlotParameters, ResolutionError> {
        let kind = parse_kind(text(&raw.kind))?;

        let axis = match kind {
            PlotKind::Volume => None,
            _ => Some(parse_axis(text(&raw.axis))?),
        };

        let field = self.resolve_field(text(&raw.field), catalog)?;

        let weight_field = match kind {
            PlotKind::Projection => self.resolve_weight(text(&raw.weight_field), catalog)?,
            _ => None,
        };

        let colormap = text(&raw.cmap)
            .unwrap_or(&self.config.default_colormap)
            .to_string();
        let log_scale = parse_bool("log_scale", text(&raw.log_scale), self.config.default_log_scale)?;
        let range = parse_range(text(&raw.vmin), text(&raw.vmax))?;
        let field_unit = text(&raw.field_unit).map(str::to_string);
        let width = parse_width(text(&raw.width_value), text(&raw.width_unit))?;

        let (annotations, particles) = if kind.is_planar() {
            (
                parse_annotations(raw)?,
                self.resolve_particles(raw, catalog)?,
            )
        } else {
            (
                Annotations::default(),
                ParticleOverlay::none(
                    self.config.default_particle_size,
                    &self.config.default_particle_color,
                ),
            )
        };

        let volume = match kind {
            PlotKind::Volume => Some(self.resolve_volume(raw)?),
            _ => None,
        };

        let resolution = match &volume {
            Some(settings) if settings.quality == VolumeQuality::Preview => Resolution::Pixels {
                width: self.config.preview_resolution_px,
                height: self.config.preview_resolution_px,
            },
            _ => self.resolve_resolution(raw, purpose)?,
        };

        Ok(PlotParameters {
            kind,
            axis,
            field,
            weight_field,
            colormap,
            log_scale,
            range,
            field_unit,
            annotations,
            width,
            particles,
            volume,
            resolution,
        })
    }

    /// Resolve the plotted field, applying the default-field policy when the
    /// request names none: "density" in the primary namespace if present,
    /// else the first catalog entry.
    fn resolve_field(
        &self,
        raw: Option<&str>,
        catalog: &FieldCatalog,
    ) -> Result<FieldKey, ResolutionError> {
        match raw {
            Some(raw) => {
                let key = FieldKey::parse(raw, &self.config.primary_namespace);
                if catalog.contains(&key) {
                    Ok(key)
                } else {
                    Err(ResolutionError::UnknownField(key.to_string()))
                }
            }
            None => {
                let preferred = FieldKey::new(
                    self.config.primary_namespace.as_str(),
                    self.config.default_field_name.as_str(),
                );
                if catalog.contains(&preferred) {
                    Ok(preferred)
                } else {
                    catalog.first().cloned().ok_or(ResolutionError::EmptyCatalog)
                }
            }
        }
    }

    fn resolve_weight(
        &self,
        raw: Option<&str>,
        catalog: &FieldCatalog,
    ) -> Result<Option<FieldKey>, ResolutionError> {
        let raw = match raw {
            None => return Ok(None),
            Some(r) if r.eq_ignore_ascii_case("none") => return Ok(None),
            Some(r) => r,
        };

        let key = WEIGHT_SHORTCUTS
            .iter()
            .find(|(shortcut, _)| *shortcut == raw)
            .map(|(_, (ns, name))| FieldKey::new(*ns, *name))
            .unwrap_or_else(|| FieldKey::parse(raw, &self.config.primary_namespace));

        if catalog.contains(&key) {
            Ok(Some(key))
        } else {
            Err(ResolutionError::UnknownField(key.to_string()))
        }
    }

    fn resolve_particles(
        &self,
        raw: &RawRenderRequest,
        catalog: &FieldCatalog,
    ) -> Result<ParticleOverlay, ResolutionError> {
        let types: BTreeSet<String> = text(&raw.particles)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if types.is_empty() {
            return Ok(ParticleOverlay::none(
                self.config.default_particle_size,
                &self.config.default_particle_color,
            ));
        }

        if let Some(missing) = types.iter().find(|p| !catalog.has_particle_type(p)) {
            return Err(ResolutionError::UnknownParticleType(missing.clone()));
        }

        let size = match text(&raw.particle_size) {
            Some(s) => parse_positive_u32("particle_size", s, u32::MAX)?,
            None => self.config.default_particle_size,
        };
        let color = text(&raw.particle_color)
            .unwrap_or(&self.config.default_particle_color)
            .to_string();

        Ok(ParticleOverlay { types, size, color })
    }

    fn resolve_volume(&self, raw: &RawRenderRequest) -> Result<VolumeSettings, ResolutionError> {
        let theta = match text(&raw.camera_theta) {
            Some(s) => parse_f64("camera_theta", s)?,
            None => self.config.default_camera_theta,
        };
        let phi = match text(&raw.camera_phi) {
            Some(s) => parse_f64("camera_phi", s)?,
            None => self.config.default_camera_phi,
        };

        let n_layers = match text(&raw.n_layers) {
            Some(s) => parse_positive_u32("n_layers", s, self.config.max_n_layers)?,
            None => self.config.default_n_layers,
        };

        let preview = parse_bool("preview", text(&raw.preview), self.config.default_preview)?;

        Ok(VolumeSettings {
            theta: exact(theta.clamp(THETA_RANGE.0, THETA_RANGE.1)),
            phi: exact(phi.clamp(PHI_RANGE.0, PHI_RANGE.1)),
            quality: if preview {
                VolumeQuality::Preview
            } else {
                VolumeQuality::Full
            },
            n_layers,
            box_frame: parse_bool("show_box_frame", text(&raw.show_box_frame), false)?,
        })
    }

    fn resolve_resolution(
        &self,
        raw: &RawRenderRequest,
        purpose: RenderPurpose,
    ) -> Result<Resolution, ResolutionError> {
        match (text(&raw.width_px), text(&raw.height_px)) {
            (Some(w), Some(h)) => {
                return Ok(Resolution::Pixels {
                    width: parse_positive_u32("width_px", w, self.config.max_pixels)?,
                    height: parse_positive_u32("height_px", h, self.config.max_pixels)?,
                });
            }
            (Some(_), None) => {
                return Err(ResolutionError::invalid("height_px", "required with width_px"))
            }
            (None, Some(_)) => {
                return Err(ResolutionError::invalid("width_px", "required with height_px"))
            }
            (None, None) => {}
        }

        let dpi = match text(&raw.dpi) {
            Some(s) => parse_positive_u32("dpi", s, self.config.max_dpi)?,
            None => match purpose {
                RenderPurpose::Interactive => self.config.interactive_dpi,
                RenderPurpose::Export => self.config.export_dpi,
            },
        };
        Ok(Resolution::Dpi { dpi })
    }
}

fn parse_annotations(raw: &RawRenderRequest) -> Result<Annotations, ResolutionError> {
    let colorbar = parse_bool("show_colorbar", text(&raw.show_colorbar), false)?;
    let scale_bar = parse_bool("show_scale_bar", text(&raw.show_scale_bar), false)?;

    let scale_bar_size = match text(&raw.scale_bar_size) {
        Some(s) if scale_bar => {
            let size = parse_f64("scale_bar_size", s)?;
            if size <= 0.0 {
                return Err(ResolutionError::invalid("scale_bar_size", "must be positive"));
            }
            Some(exact(size))
        }
        _ => None,
    };

    Ok(Annotations {
        colorbar,
        colorbar_label: text(&raw.colorbar_label)
            .filter(|_| colorbar)
            .map(str::to_string),
        scale_bar,
        scale_bar_size,
        scale_bar_unit: text(&raw.scale_bar_unit)
            .filter(|_| scale_bar)
            .map(str::to_string),
        grids: parse_bool("grids", text(&raw.grids), false)?,
        timestamp: parse_bool("timestamp", text(&raw.timestamp), false)?,
        top_left_text: text(&raw.top_left_text).map(str::to_string),
        top_right_text: text(&raw.top_right_text).map(str::to_string),
    })
}

/// Trimmed, non-empty view of an optional raw value.
fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Wrap a value already known to be finite.
fn exact(value: f64) -> ExactF64 {
    ExactF64::new(value).unwrap_or_else(|| unreachable!("finite value required"))
}

fn parse_kind(raw: Option<&str>) -> Result<PlotKind, ResolutionError> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None | Some("slc") | Some("slice") => Ok(PlotKind::Slice),
        Some("prj") | Some("proj") | Some("projection") => Ok(PlotKind::Projection),
        Some("vol") | Some("volume") => Ok(PlotKind::Volume),
        Some(other) => Err(ResolutionError::UnknownPlotKind(other.to_string())),
    }
}

fn parse_axis(raw: Option<&str>) -> Result<Axis, ResolutionError> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None | Some("z") => Ok(Axis::Z),
        Some("x") => Ok(Axis::X),
        Some("y") => Ok(Axis::Y),
        Some(other) => Err(ResolutionError::UnknownAxis(other.to_string())),
    }
}

fn parse_bool(param: &str, raw: Option<&str>, default: bool) -> Result<bool, ResolutionError> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true") | Some("1") | Some("yes") | Some("on") => Ok(true),
        Some("false") | Some("0") | Some("no") | Some("off") => Ok(false),
        Some(other) => Err(ResolutionError::invalid(
            param,
            format!("expected a boolean, got '{}'", other),
        )),
    }
}

fn parse_f64(param: &str, raw: &str) -> Result<f64, ResolutionError> {
    let value: f64 = raw
        .parse()
        .map_err(|_| ResolutionError::invalid(param, format!("'{}' is not a number", raw)))?;
    if !value.is_finite() {
        return Err(ResolutionError::invalid(param, "must be finite"));
    }
    Ok(value)
}

/// Parse a positive integer no larger than `max`. Integral floats ("10.0")
/// are accepted since UI sliders send them.
fn parse_positive_u32(param: &str, raw: &str, max: u32) -> Result<u32, ResolutionError> {
    let value = match raw.parse::<u64>() {
        Ok(v) => v,
        Err(_) => {
            let f = parse_f64(param, raw)?;
            if f.fract() != 0.0 || f < 0.0 {
                return Err(ResolutionError::invalid(
                    param,
                    format!("'{}' is not a whole number", raw),
                ));
            }
            f as u64
        }
    };
    if value == 0 || value > max as u64 {
        return Err(ResolutionError::invalid(
            param,
            format!("must be between 1 and {}", max),
        ));
    }
    Ok(value as u32)
}

fn parse_range(vmin: Option<&str>, vmax: Option<&str>) -> Result<ValueRange, ResolutionError> {
    fn bound(param: &str, raw: Option<&str>) -> Result<Option<ExactF64>, ResolutionError> {
        match raw {
            None => Ok(None),
            Some(r) if r.eq_ignore_ascii_case("auto") || r.eq_ignore_ascii_case("none") => Ok(None),
            Some(r) => parse_f64(param, r).map(|v| Some(exact(v))),
        }
    }

    let range = ValueRange {
        min: bound("vmin", vmin)?,
        max: bound("vmax", vmax)?,
    };
    if let (Some(lo), Some(hi)) = (range.min, range.max) {
        if lo.get() > hi.get() {
            return Err(ResolutionError::invalid("vmin", "must not exceed vmax"));
        }
    }
    Ok(range)
}

fn parse_width(value: Option<&str>, unit: Option<&str>) -> Result<WidthSpec, ResolutionError> {
    let Some(raw_value) = value else {
        return Ok(WidthSpec::FullDomain);
    };

    let parsed = parse_f64("width_value", raw_value)?;
    if parsed <= 0.0 {
        return Err(ResolutionError::invalid("width_value", "must be positive"));
    }

    match unit {
        Some(unit) => Ok(WidthSpec::Explicit {
            value: exact(parsed),
            unit: unit.to_string(),
        }),
        None => Err(ResolutionError::MissingUnit {
            value: raw_value.to_string(),
        }),
    }
}
