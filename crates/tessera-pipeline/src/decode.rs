//! Image decoding.
//!
//! Raw bytes in any format the `image` crate was built with (PNG, JPEG,
//! BMP, WebP) become an 8-bit RGBA buffer. Segmentation reads only the
//! color channels; alpha is carried so `render_onto` can preserve it.

use crate::types::{RgbaImage, SegmentError};

/// Decode raw image bytes to RGBA.
///
/// # Errors
///
/// Returns [`SegmentError::EmptyInput`] if `bytes` is empty.
/// Returns [`SegmentError::ImageDecode`] if the format is unrecognized
/// or the data is corrupt.
#[must_use = "returns the decoded image"]
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, SegmentError> {
    if bytes.is_empty() {
        return Err(SegmentError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    log::debug!(
        "decoded {} bytes to {}x{} ({:?})",
        bytes.len(),
        img.width(),
        img.height(),
        img.color(),
    );
    Ok(img.to_rgba8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode an RGBA image as PNG bytes.
    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode(&[]), Err(SegmentError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_return_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(SegmentError::ImageDecode(_))));
    }

    #[test]
    fn png_roundtrip_keeps_colors_and_alpha() {
        let img = RgbaImage::from_fn(3, 2, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let px = image::Rgba([x as u8 * 80, y as u8 * 90, 7, 200]);
            px
        });
        let decoded = decode(&png_bytes(&img)).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn rgb_source_gets_opaque_alpha() {
        let rgb = image::RgbImage::from_pixel(2, 2, image::Rgb([10, 20, 30]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(rgb)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert!(decoded.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }
}
