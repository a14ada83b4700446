//! PNG encoding of rendered segmentations.

use std::io::Cursor;

use tessera_pipeline::RgbImage;

use crate::ExportError;

/// Encode an RGB image as PNG bytes.
///
/// # Errors
///
/// Returns [`ExportError::Png`] if the encoder fails.
pub fn to_png(image: &RgbImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}
