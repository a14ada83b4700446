//! Gaussian blur applied before segmentation.
//!
//! Smoothing removes sensor noise and JPEG ringing that would otherwise
//! split flat areas into many tiny components.

use image::GrayImage;

use crate::types::{PipelineConfig, RgbaImage};

/// Blur each RGBA channel independently.
///
/// `imageproc::filter::gaussian_blur_f32` only accepts single-channel
/// images, so the image is split, blurred per channel and reassembled.
/// Non-positive or NaN `sigma` returns the image unchanged (`imageproc`
/// panics on `sigma <= 0.0`). Larger values than
/// [`PipelineConfig::MAX_BLUR_SIGMA`] are clamped to it.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur_rgba(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma.is_nan() || sigma <= 0.0 {
        return image.clone();
    }
    let sigma = if sigma > PipelineConfig::MAX_BLUR_SIGMA {
        log::warn!(
            "blur sigma {sigma} clamped to {}",
            PipelineConfig::MAX_BLUR_SIGMA
        );
        PipelineConfig::MAX_BLUR_SIGMA
    } else {
        sigma
    };

    let (w, h) = image.dimensions();
    let blurred: [GrayImage; 4] = std::array::from_fn(|c| {
        let channel = GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]));
        imageproc::filter::gaussian_blur_f32(&channel, sigma)
    });

    log::debug!("blurred {w}x{h} with sigma {sigma:.2}");
    RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba(std::array::from_fn(|c| blurred[c].get_pixel(x, y).0[0]))
    })
}
