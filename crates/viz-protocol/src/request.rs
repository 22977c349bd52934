//! Raw render requests as they arrive from the HTTP layer.
//!
//! Nothing is validated here. Every value is kept as text (numbers and
//! booleans in JSON bodies are stringified) so that the resolver is the only
//! place that interprets request shape.

use serde::{Deserialize, Deserializer, Serialize};

/// Loosely typed render request.
///
/// Unknown keys such as the UI's `refreshTrigger` or `use_cache` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRenderRequest {
    #[serde(deserialize_with = "loose")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub axis: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub field: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub weight_field: Option<String>,

    // Colour settings
    #[serde(deserialize_with = "loose")]
    pub cmap: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub log_scale: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub vmin: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub vmax: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub field_unit: Option<String>,

    // Output size
    #[serde(deserialize_with = "loose")]
    pub dpi: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub width_px: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub height_px: Option<String>,

    // Colorbar and scale bar
    #[serde(deserialize_with = "loose")]
    pub show_colorbar: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub colorbar_label: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub show_scale_bar: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub scale_bar_size: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub scale_bar_unit: Option<String>,

    // Width/zoom
    #[serde(deserialize_with = "loose")]
    pub width_value: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub width_unit: Option<String>,

    // Annotations
    #[serde(deserialize_with = "loose")]
    pub grids: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub timestamp: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub top_left_text: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub top_right_text: Option<String>,

    // Particles
    #[serde(deserialize_with = "loose")]
    pub particles: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub particle_size: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub particle_color: Option<String>,

    // Volume rendering
    #[serde(deserialize_with = "loose")]
    pub camera_theta: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub camera_phi: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub n_layers: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub preview: Option<String>,
    #[serde(deserialize_with = "loose")]
    pub show_box_frame: Option<String>,
}

impl RawRenderRequest {
    /// Build a request from `(key, value)` pairs, as a script would.
    ///
    /// Unknown keys are ignored, matching the HTTP behaviour.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut request = Self::default();
        for (key, value) in pairs {
            if let Some(slot) = request.slot_mut(key) {
                *slot = Some(value.to_string());
            }
        }
        request
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        let slot = match key {
            "kind" => &mut self.kind,
            "axis" => &mut self.axis,
            "field" => &mut self.field,
            "weight_field" => &mut self.weight_field,
            "cmap" => &mut self.cmap,
            "log_scale" => &mut self.log_scale,
            "vmin" => &mut self.vmin,
            "vmax" => &mut self.vmax,
            "field_unit" => &mut self.field_unit,
            "dpi" => &mut self.dpi,
            "width_px" => &mut self.width_px,
            "height_px" => &mut self.height_px,
            "show_colorbar" => &mut self.show_colorbar,
            "colorbar_label" => &mut self.colorbar_label,
            "show_scale_bar" => &mut self.show_scale_bar,
            "scale_bar_size" => &mut self.scale_bar_size,
            "scale_bar_unit" => &mut self.scale_bar_unit,
            "width_value" => &mut self.width_value,
            "width_unit" => &mut self.width_unit,
            "grids" => &mut self.grids,
            "timestamp" => &mut self.timestamp,
            "top_left_text" => &mut self.top_left_text,
            "top_right_text" => &mut self.top_right_text,
            "particles" => &mut self.particles,
            "particle_size" => &mut self.particle_size,
            "particle_color" => &mut self.particle_color,
            "camera_theta" => &mut self.camera_theta,
            "camera_phi" => &mut self.camera_phi,
            "n_layers" => &mut self.n_layers,
            "preview" => &mut self.preview,
            "show_box_frame" => &mut self.show_box_frame,
            _ => return None,
        };
        Some(slot)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    List(Vec<String>),
}

impl LooseValue {
    fn into_text(self) -> String {
        match self {
            LooseValue::Text(s) => s,
            LooseValue::Bool(b) => b.to_string(),
            LooseValue::Int(i) => i.to_string(),
            LooseValue::Float(f) => f.to_string(),
            LooseValue::List(items) => items.join(","),
        }
    }
}

fn loose<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<LooseValue>::deserialize(deserializer)?.map(LooseValue::into_text))
}
