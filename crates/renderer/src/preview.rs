//! Built-in preview drawer.
//!
//! Used when no external plotting program is configured. It does not read
//! field data: it rasterizes a deterministic pattern seeded by the dataset
//! and field, coloured with the requested colormap and scale, with the
//! requested overlays. Two calls with equal inputs produce identical bytes,
//! and every render-affecting parameter changes the output.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use rayon::prelude::*;
use tracing::debug;
use viz_common::{
    Artifact, Axis, DatasetHandle, DrawError, Drawer, PlotKind, PlotParameters, Resolution,
};

use crate::colormap::{Color, Colormap};
use crate::png::create_png_auto;

/// Short side of the figure in inches; DPI renders are this many inches wide.
pub const SHORT_SIDE_INCHES: f64 = 3.6;

/// Width of the colorbar strip, as a fraction of the image width.
const COLORBAR_FRACTION: f64 = 0.06;

/// Preview raster settings.
#[derive(Debug, Clone, Copy)]
pub struct PreviewDrawer {
    /// Largest raster (width * height) the drawer will produce.
    max_pixels: u64,
}

impl Default for PreviewDrawer {
    fn default() -> Self {
        Self {
            max_pixels: 4096 * 4096,
        }
    }
}

impl PreviewDrawer {
    pub fn new(max_pixels: u64) -> Self {
        Self { max_pixels }
    }

    /// Raster size for a request against a domain of `dims` cells.
    pub fn raster_size(&self, params: &PlotParameters, dims: &[u64]) -> Result<(usize, usize), DrawError> {
        let (width, height) = match params.resolution {
            Resolution::Pixels { width, height } => (width as u64, height as u64),
            Resolution::Dpi { dpi } => {
                let short = (SHORT_SIDE_INCHES * dpi as f64).round().max(1.0);
                let (a, b) = plane_extent(params, dims);
                let (lo, hi) = (a.min(b).max(1) as f64, a.max(b).max(1) as f64);
                let long = (short * hi / lo).round();
                if a >= b {
                    (long as u64, short as u64)
                } else {
                    (short as u64, long as u64)
                }
            }
        };

        if width.saturating_mul(height) > self.max_pixels {
            return Err(DrawError::Unsupported(format!(
                "{}x{} preview exceeds the {} pixel limit",
                width, height, self.max_pixels
            )));
        }
        Ok((width as usize, height as usize))
    }

    /// Rasterize and encode synchronously.
    pub fn render_png(&self, dataset: &DatasetHandle, params: &PlotParameters) -> Result<Vec<u8>, DrawError> {
        PreviewJob::new(dataset, params).run(self)
    }
}

#[async_trait]
impl Drawer for PreviewDrawer {
    async fn draw(&self, dataset: &DatasetHandle, params: &PlotParameters) -> Result<Artifact, DrawError> {
        let start = Instant::now();
        let drawer = *self;
        let job = PreviewJob::new(dataset, params);
        let png = tokio::task::spawn_blocking(move || job.run(&drawer))
            .await
            .map_err(|e| DrawError::Backend(format!("preview task failed: {}", e)))??;

        debug!(
            dataset = %dataset.name(),
            field = %params.field,
            bytes = png.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Rendered preview"
        );
        Ok(Artifact::png(Bytes::from(png)))
    }
}

/// Owned inputs for a blocking preview render.
struct PreviewJob {
    seed: u64,
    dims: Vec<u64>,
    params: PlotParameters,
}

impl PreviewJob {
    fn new(dataset: &DatasetHandle, params: &PlotParameters) -> Self {
        let mut hasher = DefaultHasher::new();
        dataset.path().hash(&mut hasher);
        dataset.info().current_time.to_bits().hash(&mut hasher);
        Self {
            seed: hasher.finish(),
            dims: dataset.info().domain_dimensions.clone(),
            params: params.clone(),
        }
    }

    fn run(self, drawer: &PreviewDrawer) -> Result<Vec<u8>, DrawError> {
        let colormap = Colormap::by_name(&self.params.colormap).ok_or_else(|| {
            DrawError::Unsupported(format!("unknown colormap '{}'", self.params.colormap))
        })?;
        let (width, height) = drawer.raster_size(&self.params, &self.dims)?;

        let scene = Scene::from_seed(self.seed, &self.params, colormap);
        let mut pixels = vec![0u8; width * height * 4];
        pixels
            .par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(y, row)| scene.fill_row(row, y, width, height));

        create_png_auto(&pixels, width, height).map_err(|e| DrawError::Backend(e.to_string()))
    }
}

/// Cell counts along the two in-plane axes (horizontal, vertical).
fn plane_extent(params: &PlotParameters, dims: &[u64]) -> (u64, u64) {
    let dim = |i: usize| dims.get(i).copied().unwrap_or(1);
    match (params.kind, params.axis) {
        (PlotKind::Volume, _) => (1, 1),
        (_, Some(Axis::X)) => (dim(1), dim(2)),
        (_, Some(Axis::Y)) => (dim(2), dim(0)),
        _ => (dim(0), dim(1)),
    }
}

/// Everything needed to colour one pixel.
struct Scene {
    colormap: Colormap,
    log_scale: bool,
    lo: f64,
    hi: f64,
    phase: f64,
    frequency: f64,
    rotation: f64,
    tilt: f64,
    layers: u32,
    grids: bool,
    frame: bool,
    colorbar: bool,
    particles: Vec<(f64, f64)>,
    marker_radius: f64,
    marker_color: Color,
}

impl Scene {
    fn from_seed(seed: u64, params: &PlotParameters, colormap: Colormap) -> Self {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        params.field.hash(&mut hasher);
        params.kind.hash(&mut hasher);
        params.axis.hash(&mut hasher);
        params.weight_field.hash(&mut hasher);
        params.width.hash(&mut hasher);
        let field_seed = hasher.finish();

        let (rotation, tilt, layers, frame) = match &params.volume {
            Some(v) => (
                v.phi.get().to_radians(),
                v.theta.get().to_radians().cos(),
                v.n_layers,
                v.box_frame,
            ),
            None => (0.0, 1.0, 1, false),
        };

        let mut particles = Vec::new();
        for ptype in &params.particles.types {
            let mut h = DefaultHasher::new();
            (seed, ptype).hash(&mut h);
            let mut state = h.finish();
            for _ in 0..24 {
                state = splitmix(state);
                let x = (state >> 11) as f64 / (1u64 << 53) as f64;
                state = splitmix(state);
                let y = (state >> 11) as f64 / (1u64 << 53) as f64;
                particles.push((x, y));
            }
        }

        Self {
            colormap,
            log_scale: params.log_scale,
            lo: params.range.min.map(|v| v.get()).unwrap_or(0.0),
            hi: params.range.max.map(|v| v.get()).unwrap_or(1.0),
            phase: (field_seed % 6283) as f64 / 1000.0,
            frequency: 2.0 + (field_seed >> 16) as f64 % 5.0,
            rotation,
            tilt,
            layers: layers.max(1),
            grids: params.annotations.grids,
            frame,
            colorbar: params.annotations.colorbar,
            particles,
            marker_radius: (params.particles.size as f64).sqrt() / 200.0,
            marker_color: Color::parse(&params.particles.color).unwrap_or(Color::rgb(255, 0, 0)),
        }
    }

    /// Pattern value in [0, 1] at normalized plot coordinates.
    fn sample(&self, u: f64, v: f64) -> f64 {
        let (x, y) = (u - 0.5, (v - 0.5) * self.tilt);
        let (s, c) = self.rotation.sin_cos();
        let (x, y) = (x * c - y * s, x * s + y * c);

        let r2 = x * x + y * y;
        let core = (-r2 * 12.0).exp();
        let waves = 0.5 + 0.5 * (self.frequency * (x + y) * std::f64::consts::TAU + self.phase).sin();
        let mut value = 0.7 * core + 0.3 * waves * (1.0 - core);

        if self.layers > 1 {
            value = (value * self.layers as f64).floor() / self.layers as f64;
        }
        value
    }

    fn normalize(&self, value: f64) -> f32 {
        let span = self.hi - self.lo;
        let t = if span.abs() < f64::EPSILON {
            0.0
        } else {
            (value - self.lo) / span
        };
        let t = t.clamp(0.0, 1.0);
        let t = if self.log_scale {
            (1.0 + 99.0 * t).ln() / 100f64.ln()
        } else {
            t
        };
        t as f32
    }

    fn fill_row(&self, row: &mut [u8], y: usize, width: usize, height: usize) {
        let bar_start = if self.colorbar {
            ((1.0 - COLORBAR_FRACTION) * width as f64) as usize
        } else {
            width
        };
        let v = (y as f64 + 0.5) / height as f64;

        for x in 0..width {
            let color = if x >= bar_start {
                self.colormap.color_at((1.0 - v) as f32)
            } else {
                let u = (x as f64 + 0.5) / bar_start.max(1) as f64;
                self.pixel(u, v, x, y, bar_start, height)
            };
            row[x * 4..x * 4 + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
    }

    fn pixel(&self, u: f64, v: f64, x: usize, y: usize, width: usize, height: usize) -> Color {
        if self.frame && (x == 0 || y == 0 || x + 1 == width || y + 1 == height) {
            return Color::rgb(255, 255, 255);
        }
        if self.grids {
            let step_x = (width / 8).max(1);
            let step_y = (height / 8).max(1);
            if x % step_x == 0 || y % step_y == 0 {
                return Color::rgb(0, 0, 0);
            }
        }
        let hit = self.particles.iter().any(|(px, py)| {
            let (dx, dy) = (u - px, v - py);
            dx * dx + dy * dy <= self.marker_radius * self.marker_radius
        });
        if hit {
            return self.marker_color;
        }
        self.colormap.color_at(self.normalize(self.sample(u, v)))
    }
}

fn splitmix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::quokka_handle;
    use viz_protocol::{ParameterResolver, RawRenderRequest, RenderPurpose};

    fn params(pairs: &[(&str, &str)]) -> PlotParameters {
        let handle = quokka_handle("plt00000");
        ParameterResolver::default()
            .resolve(
                &RawRenderRequest::from_pairs(pairs.iter().copied()),
                handle.catalog(),
                RenderPurpose::Interactive,
            )
            .unwrap()
    }

    #[test]
    fn test_dpi_raster_size() {
        let drawer = PreviewDrawer::default();
        let (w, h) = drawer
            .raster_size(&params(&[("dpi", "100")]), &[128, 64, 64])
            .unwrap();
        assert_eq!((w, h), (720, 360));
    }

    #[test]
    fn test_pixel_raster_size_and_cap() {
        let drawer = PreviewDrawer::new(10_000);
        assert_eq!(
            drawer
                .raster_size(&params(&[("width_px", "100"), ("height_px", "100")]), &[64, 64, 64])
                .unwrap(),
            (100, 100)
        );
        assert!(matches!(
            drawer.raster_size(&params(&[("width_px", "101"), ("height_px", "100")]), &[64, 64, 64]),
            Err(DrawError::Unsupported(_))
        ));
    }

    #[test]
    fn test_deterministic_output() {
        let handle = quokka_handle("plt00000");
        let drawer = PreviewDrawer::default();
        let p = params(&[("width_px", "32"), ("height_px", "24"), ("particles", "CIC_particles")]);
        let a = drawer.render_png(&handle, &p).unwrap();
        let b = drawer.render_png(&handle, &p).unwrap();
        assert_eq!(a, b);
        assert_eq!(&a[1..4], b"PNG");
    }

    #[test]
    fn test_colormap_changes_output() {
        let handle = quokka_handle("plt00000");
        let drawer = PreviewDrawer::default();
        let a = drawer
            .render_png(&handle, &params(&[("width_px", "16"), ("height_px", "16")]))
            .unwrap();
        let b = drawer
            .render_png(&handle, &params(&[("width_px", "16"), ("height_px", "16"), ("cmap", "magma")]))
            .unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_unknown_colormap_is_unsupported() {
        let handle = quokka_handle("plt00000");
        let err = PreviewDrawer::default()
            .draw(&handle, &params(&[("cmap", "nope")]))
            .await
            .unwrap_err();
        assert!(matches!(err, DrawError::Unsupported(_)));
    }
}
