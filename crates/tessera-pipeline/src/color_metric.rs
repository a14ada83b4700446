//! Pixel color distance in RGB, HSV, or CIE L\*a\*b\* space.
//!
//! Every distance is a fixed closed-form conversion followed by a
//! Euclidean norm. Conversion and metric are split ([`ColorSpace::project`]
//! and [`ColorSpace::projected_distance`]) so the segmenter can convert
//! each pixel once per run instead of once per neighbor comparison;
//! [`distance`] composes the two and is bit-for-bit identical.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Pixel;

/// Color space a distance is computed in.
///
/// Parsing is lenient: an unrecognized name falls back to
/// [`ColorSpace::Rgb`] (with a warning) instead of failing. The same
/// rule applies when deserializing a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorSpace {
    /// Euclidean distance over raw `(r, g, b)`.
    #[default]
    Rgb,
    /// Normalized distance over hue (circular), saturation and value.
    Hsv,
    /// Euclidean distance over CIE L\*a\*b\* (D65).
    Lab,
}

impl ColorSpace {
    /// All supported spaces, in display order.
    pub const ALL: [Self; 3] = [Self::Rgb, Self::Hsv, Self::Lab];

    /// Exact, case-insensitive name lookup.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|space| space.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Name lookup that falls back to [`ColorSpace::Rgb`] for unknown
    /// names.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            log::warn!("unknown color space {name:?}, falling back to RGB");
            Self::Rgb
        })
    }

    /// Canonical upper-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rgb => "RGB",
            Self::Hsv => "HSV",
            Self::Lab => "LAB",
        }
    }

    /// Convert an `(r, g, b)` triple into this space's coordinates.
    ///
    /// RGB coordinates are the raw channels, HSV is `(h, s, v)` with
    /// `h` in degrees and `s`, `v` in percent, LAB is `(L*, a*, b*)`.
    #[must_use]
    pub fn project(self, rgb: [u8; 3]) -> [f64; 3] {
        match self {
            Self::Rgb => rgb.map(f64::from),
            Self::Hsv => rgb_to_hsv(rgb),
            Self::Lab => rgb_to_lab(rgb),
        }
    }

    /// Distance between two coordinates previously produced by
    /// [`project`](Self::project) for this same space.
    #[must_use]
    pub fn projected_distance(self, a: [f64; 3], b: [f64; 3]) -> f64 {
        match self {
            Self::Rgb | Self::Lab => euclidean(
                a[0] - b[0],
                a[1] - b[1],
                a[2] - b[2],
            ),
            Self::Hsv => {
                let raw = (a[0] - b[0]).abs();
                let hue = raw.min(360.0 - raw) / 180.0;
                euclidean(hue, (a[1] - b[1]) / 100.0, (a[2] - b[2]) / 100.0)
            }
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for ColorSpace {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl From<String> for ColorSpace {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<ColorSpace> for String {
    fn from(space: ColorSpace) -> Self {
        space.name().to_string()
    }
}

fn euclidean(d0: f64, d1: f64, d2: f64) -> f64 {
    d0.mul_add(d0, d1.mul_add(d1, d2 * d2)).sqrt()
}

/// Color distance between two pixels in `space`.
///
/// Symmetric and non-negative. Zero exactly when both pixels project to
/// the same coordinates in `space`.
#[must_use]
pub fn distance(a: &Pixel, b: &Pixel, space: ColorSpace) -> f64 {
    space.projected_distance(space.project(a.rgb()), space.project(b.rgb()))
}

/// Convert `(r, g, b)` to `(h, s, v)`: hue in `[0, 360)` degrees,
/// saturation and value in `[0, 100]`.
///
/// Hexagonal model; hue is `0` for achromatic colors and saturation is
/// `0` for black.
#[must_use]
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [f64; 3] {
    let [r, g, b] = rgb.map(|c| f64::from(c) / 255.0);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    #[allow(clippy::float_cmp)]
    let sector = if delta == 0.0 {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    let h = sector.mul_add(60.0, 360.0).rem_euclid(360.0);

    let s = if max == 0.0 { 0.0 } else { delta / max };

    [h, s * 100.0, max * 100.0]
}

/// D65 reference white used to normalize XYZ.
const D65_WHITE: [f64; 3] = [0.950_47, 1.0, 1.088_83];

/// Linear segment threshold of the L\*a\*b\* companding function.
const LAB_EPSILON: f64 = 0.008_856;

/// Slope of the L\*a\*b\* linear segment.
const LAB_KAPPA_SLOPE: f64 = 7.787;

/// Undo the sRGB transfer curve for one normalized channel.
fn srgb_to_linear(c: f64) -> f64 {
    if c > 0.040_45 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        LAB_KAPPA_SLOPE.mul_add(t, 16.0 / 116.0)
    }
}

/// Convert `(r, g, b)` to CIE `(L*, a*, b*)` under D65.
#[must_use]
pub fn rgb_to_lab(rgb: [u8; 3]) -> [f64; 3] {
    let [r, g, b] = rgb.map(|c| srgb_to_linear(f64::from(c) / 255.0));

    let x = r.mul_add(0.412_456_4, g.mul_add(0.357_576_1, b * 0.180_437_5));
    let y = r.mul_add(0.212_672_9, g.mul_add(0.715_152_2, b * 0.072_175_0));
    let z = r.mul_add(0.019_333_9, g.mul_add(0.119_192_0, b * 0.950_304_1));

    let fx = lab_f(x / D65_WHITE[0]);
    let fy = lab_f(y / D65_WHITE[1]);
    let fz = lab_f(z / D65_WHITE[2]);

    [
        116.0f64.mul_add(fy, -16.0),
        500.0 * (fx - fy),
        200.0 * (fy - fz),
    ]
}
