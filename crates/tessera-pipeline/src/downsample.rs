//! Resize to a working resolution before segmentation.
//!
//! Shrinks the image so its longest axis is at most
//! `working_resolution`, keeping the aspect ratio. Images already within
//! the limit are returned unchanged. The merge pass is linear in pixel
//! count, so this is the main lever on run time for large photos.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::RgbaImage;

/// Resampling filter for the working-resolution resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownsampleFilter {
    /// Keep the image at its decoded size.
    #[default]
    Disabled,
    /// Nearest-neighbor. Keeps exact source colors.
    Nearest,
    /// Bilinear.
    Triangle,
    /// Bicubic (Catmull-Rom).
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with 3 lobes.
    Lanczos3,
}

impl DownsampleFilter {
    const fn to_image_filter(self) -> Option<image::imageops::FilterType> {
        use image::imageops::FilterType;
        match self {
            Self::Disabled => None,
            Self::Nearest => Some(FilterType::Nearest),
            Self::Triangle => Some(FilterType::Triangle),
            Self::CatmullRom => Some(FilterType::CatmullRom),
            Self::Gaussian => Some(FilterType::Gaussian),
            Self::Lanczos3 => Some(FilterType::Lanczos3),
        }
    }
}

impl fmt::Display for DownsampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disabled => "Disabled",
            Self::Nearest => "Nearest",
            Self::Triangle => "Triangle",
            Self::CatmullRom => "CatmullRom",
            Self::Gaussian => "Gaussian",
            Self::Lanczos3 => "Lanczos3",
        })
    }
}

/// Shrink `image` so the longest axis is at most `max_dimension`.
///
/// Returns the (possibly unchanged) image and whether a resize happened.
#[must_use]
pub fn downsample(
    image: &RgbaImage,
    max_dimension: u32,
    filter: DownsampleFilter,
) -> (RgbaImage, bool) {
    let Some(image_filter) = filter.to_image_filter() else {
        return (image.clone(), false);
    };

    let (w, h) = image.dimensions();
    if w.max(h) <= max_dimension {
        return (image.clone(), false);
    }

    let (new_w, new_h) = fit_within(w, h, max_dimension);
    log::debug!("downsampling {w}x{h} -> {new_w}x{new_h} ({filter})");
    (
        image::imageops::resize(image, new_w, new_h, image_filter),
        true,
    )
}

/// Scale `(w, h)` so the longer side equals `max_dimension`, truncating
/// the shorter side and keeping it at least 1.
fn fit_within(w: u32, h: u32, max_dimension: u32) -> (u32, u32) {
    let longest = u64::from(w.max(h));
    let scaled = |v: u32| {
        let short = u64::from(v) * u64::from(max_dimension) / longest;
        u32::try_from(short).unwrap_or(max_dimension).clamp(1, max_dimension)
    };
    if w >= h {
        (max_dimension, scaled(h))
    } else {
        (scaled(w), max_dimension)
    }
}
