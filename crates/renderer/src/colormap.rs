//! Named colormaps.
//!
//! Each colormap is a handful of evenly spaced stops sampled from the
//! matplotlib map of the same name; values in between are linearly
//! interpolated.

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a marker colour: a handful of names or `#rrggbb`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(hex) = name.strip_prefix('#') {
            if hex.len() != 6 {
                return None;
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            return Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?));
        }
        match name.to_ascii_lowercase().as_str() {
            "red" => Some(Self::rgb(255, 0, 0)),
            "green" => Some(Self::rgb(0, 128, 0)),
            "blue" => Some(Self::rgb(0, 0, 255)),
            "white" => Some(Self::rgb(255, 255, 255)),
            "black" => Some(Self::rgb(0, 0, 0)),
            "yellow" => Some(Self::rgb(255, 255, 0)),
            "cyan" => Some(Self::rgb(0, 255, 255)),
            "magenta" => Some(Self::rgb(255, 0, 255)),
            "orange" => Some(Self::rgb(255, 165, 0)),
            _ => None,
        }
    }
}

const VIRIDIS: &[Color] = &[
    Color::rgb(68, 1, 84),
    Color::rgb(72, 40, 120),
    Color::rgb(62, 74, 137),
    Color::rgb(49, 104, 142),
    Color::rgb(38, 130, 142),
    Color::rgb(31, 158, 137),
    Color::rgb(53, 183, 121),
    Color::rgb(109, 205, 89),
    Color::rgb(180, 222, 44),
    Color::rgb(253, 231, 37),
];

const PLASMA: &[Color] = &[
    Color::rgb(13, 8, 135),
    Color::rgb(84, 2, 163),
    Color::rgb(139, 10, 165),
    Color::rgb(185, 50, 137),
    Color::rgb(219, 92, 104),
    Color::rgb(244, 136, 73),
    Color::rgb(254, 188, 43),
    Color::rgb(240, 249, 33),
];

const INFERNO: &[Color] = &[
    Color::rgb(0, 0, 4),
    Color::rgb(40, 11, 84),
    Color::rgb(101, 21, 110),
    Color::rgb(159, 42, 99),
    Color::rgb(212, 72, 66),
    Color::rgb(245, 125, 21),
    Color::rgb(250, 193, 39),
    Color::rgb(252, 255, 164),
];

const MAGMA: &[Color] = &[
    Color::rgb(0, 0, 4),
    Color::rgb(28, 16, 68),
    Color::rgb(79, 18, 123),
    Color::rgb(129, 37, 129),
    Color::rgb(181, 54, 122),
    Color::rgb(229, 80, 100),
    Color::rgb(251, 135, 97),
    Color::rgb(254, 194, 135),
    Color::rgb(252, 253, 191),
];

const CIVIDIS: &[Color] = &[
    Color::rgb(0, 34, 78),
    Color::rgb(61, 78, 108),
    Color::rgb(124, 123, 120),
    Color::rgb(188, 175, 111),
    Color::rgb(255, 234, 70),
];

const GRAY: &[Color] = &[Color::rgb(0, 0, 0), Color::rgb(255, 255, 255)];

const HOT: &[Color] = &[
    Color::rgb(11, 0, 0),
    Color::rgb(255, 0, 0),
    Color::rgb(255, 255, 0),
    Color::rgb(255, 255, 255),
];

const COOLWARM: &[Color] = &[
    Color::rgb(59, 76, 192),
    Color::rgb(141, 176, 254),
    Color::rgb(221, 221, 221),
    Color::rgb(244, 154, 123),
    Color::rgb(180, 4, 38),
];

/// Names accepted by [`Colormap::by_name`].
pub const COLORMAP_NAMES: &[&str] = &[
    "viridis", "plasma", "inferno", "magma", "cividis", "gray", "hot", "coolwarm",
];

/// A named, piecewise-linear colormap.
#[derive(Debug, Clone, Copy)]
pub struct Colormap {
    stops: &'static [Color],
    reversed: bool,
}

impl Colormap {
    /// Look up a colormap. A `_r` suffix reverses it.
    pub fn by_name(name: &str) -> Option<Self> {
        let (base, reversed) = match name.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let stops = match base {
            "viridis" => VIRIDIS,
            "plasma" => PLASMA,
            "inferno" => INFERNO,
            "magma" => MAGMA,
            "cividis" => CIVIDIS,
            "gray" | "grey" => GRAY,
            "hot" | "afmhot" => HOT,
            "coolwarm" => COOLWARM,
            _ => return None,
        };
        Some(Self { stops, reversed })
    }

    /// Colour for a normalized value in [0, 1] (clamped).
    pub fn color_at(&self, t: f32) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let t = if self.reversed { 1.0 - t } else { t };

        let segments = self.stops.len() - 1;
        let scaled = t * segments as f32;
        let i = (scaled.floor() as usize).min(segments - 1);
        interpolate_color(self.stops[i], self.stops[i + 1], scaled - i as f32)
    }
}

/// Linear color interpolation
fn interpolate_color(color1: Color, color2: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Color {
        r: mix(color1.r, color2.r),
        g: mix(color1.g, color2.g),
        b: mix(color1.b, color2.b),
        a: mix(color1.a, color2.a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let viridis = Colormap::by_name("viridis").unwrap();
        assert_eq!(viridis.color_at(0.0), VIRIDIS[0]);
        assert_eq!(viridis.color_at(1.0), VIRIDIS[VIRIDIS.len() - 1]);
        assert_eq!(viridis.color_at(-3.0), VIRIDIS[0]);
    }

    #[test]
    fn test_reversed() {
        let forward = Colormap::by_name("magma").unwrap();
        let reversed = Colormap::by_name("magma_r").unwrap();
        assert_eq!(forward.color_at(0.0), reversed.color_at(1.0));
    }

    #[test]
    fn test_unknown_colormap() {
        assert!(Colormap::by_name("jet2000").is_none());
        for name in COLORMAP_NAMES {
            assert!(Colormap::by_name(name).is_some(), "{}", name);
        }
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(Color::parse("red"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("#10ff00"), Some(Color::rgb(16, 255, 0)));
        assert_eq!(Color::parse("#xyz"), None);
    }
}
