//! Deterministic region palette and raster rendering.
//!
//! Hues advance by the golden angle so consecutive region ids land far
//! apart on the color wheel. Saturation and value cycle on short periods
//! to separate colors that share a hue band.

use std::ops::{Deref, DerefMut};

use image::{ImageBuffer, Rgb};

use crate::types::{Dimensions, Region, RgbImage, SegmentError};

/// Color of pixels not covered by any region.
pub const FALLBACK_COLOR: [u8; 3] = [128, 128, 128];

/// Hue step between consecutive palette entries, in degrees.
const GOLDEN_ANGLE_DEG: f64 = 137.508;

/// Saturation percentages, cycled by index mod 3.
const SATURATION_STEPS: [f64; 3] = [70.0, 85.0, 100.0];

/// Value percentages, cycled by index mod 2.
const VALUE_STEPS: [f64; 2] = [80.0, 100.0];

/// Generate `n` visually distinct colors.
///
/// Entry `i` has hue `(i * 137.508) mod 360`. The result depends only
/// on `n`, and a shorter palette is a prefix of a longer one.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn assign_colors(n: usize) -> Vec<[u8; 3]> {
    (0..n)
        .map(|i| {
            let hue = (i as f64 * GOLDEN_ANGLE_DEG) % 360.0;
            let saturation = SATURATION_STEPS[i % SATURATION_STEPS.len()];
            let value = VALUE_STEPS[i % VALUE_STEPS.len()];
            hsv_to_rgb(hue, saturation, value)
        })
        .collect()
}

/// Convert hue (degrees, `[0, 360)`), saturation and value (percent) to
/// RGB. Channels are scaled by 255 and truncated.
///
/// The hue circle is split into six sectors; within sector `i` at
/// fraction `f`, each channel is one of `v`, `p = v(1 - s)`,
/// `q = v(1 - fs)` or `t = v(1 - (1 - f)s)`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::many_single_char_names
)]
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> [u8; 3] {
    let h = hue / 360.0 * 6.0;
    let s = saturation / 100.0;
    let v = value / 100.0;

    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    let (r, g, b) = match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    // `as` saturates, so tiny float excursions outside [0, 1] clamp.
    [r, g, b].map(|channel| (channel * 255.0) as u8)
}

fn check_palette(regions: &[Region], palette: &[[u8; 3]]) -> Result<(), SegmentError> {
    if palette.len() < regions.len() {
        return Err(SegmentError::invalid(
            "palette",
            format!(
                "{} colors for {} regions",
                palette.len(),
                regions.len()
            ),
        ));
    }
    Ok(())
}

/// Paint every region pixel with `palette[region.id]` on a canvas filled
/// with [`FALLBACK_COLOR`].
///
/// Regions are indexed by position in the slice, so `palette[k]` colors
/// `regions[k]`.
///
/// # Errors
///
/// Returns [`SegmentError::InvalidArgument`] if the palette is shorter
/// than the region list or a dimension is zero, and
/// [`SegmentError::IndexOutOfRange`] if a region pixel lies outside
/// `dimensions`.
pub fn render(
    dimensions: Dimensions,
    regions: &[Region],
    palette: &[[u8; 3]],
) -> Result<RgbImage, SegmentError> {
    if dimensions.width == 0 || dimensions.height == 0 {
        return Err(SegmentError::invalid(
            "dimensions",
            format!(
                "width and height must be positive, got {}x{}",
                dimensions.width, dimensions.height
            ),
        ));
    }
    let mut canvas = RgbImage::from_pixel(dimensions.width, dimensions.height, Rgb(FALLBACK_COLOR));
    paint(&mut canvas, regions, palette)?;
    log::debug!(
        "rendered {} regions onto {}x{} canvas",
        regions.len(),
        dimensions.width,
        dimensions.height,
    );
    Ok(canvas)
}

/// Paint region colors onto a copy of `source`.
///
/// The pixel type (and so the channel count) of `source` is kept. Only
/// the first three channels of covered pixels change; alpha and any
/// further channels are left as they were. Uncovered pixels keep their
/// source color.
///
/// # Errors
///
/// Same as [`render`], except dimensions come from `source`.
pub fn render_onto<P, C>(
    source: &ImageBuffer<P, C>,
    regions: &[Region],
    palette: &[[u8; 3]],
) -> Result<ImageBuffer<P, Vec<u8>>, SegmentError>
where
    P: image::Pixel<Subpixel = u8>,
    C: Deref<Target = [u8]>,
{
    let mut out = ImageBuffer::from_raw(source.width(), source.height(), source.to_vec())
        .ok_or_else(|| SegmentError::invalid("dimensions", "source buffer too small"))?;
    paint(&mut out, regions, palette)?;
    Ok(out)
}

fn paint<P, C>(
    canvas: &mut ImageBuffer<P, C>,
    regions: &[Region],
    palette: &[[u8; 3]],
) -> Result<(), SegmentError>
where
    P: image::Pixel<Subpixel = u8>,
    C: Deref<Target = [u8]> + DerefMut,
{
    check_palette(regions, palette)?;
    if P::CHANNEL_COUNT < 3 {
        return Err(SegmentError::invalid(
            "channels",
            format!("need at least 3 channels, got {}", P::CHANNEL_COUNT),
        ));
    }
    let dims = Dimensions::new(canvas.width(), canvas.height());
    for (region, color) in regions.iter().zip(palette) {
        for p in &region.pixels {
            if !dims.contains(p.x, p.y) {
                return Err(SegmentError::IndexOutOfRange {
                    index: dims.index_of(p.x, p.y),
                    len: dims.pixel_count(),
                });
            }
            let channels = canvas.get_pixel_mut(p.x, p.y).channels_mut();
            channels[..3].copy_from_slice(color);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::types::{BoundingBox, Pixel, Point};

    fn region(id: usize, coords: &[(u32, u32)]) -> Region {
        let pixels: Vec<Pixel> = coords
            .iter()
            .map(|&(x, y)| Pixel::new(x, y, [0, 0, 0]))
            .collect();
        Region {
            id,
            size: pixels.len(),
            pixels,
            centroid: Point::new(0.0, 0.0),
            avg_color: [0, 0, 0],
            bounding_box: BoundingBox {
                x: 0,
                y: 0,
                width: 1,
                height: 1,
            },
        }
    }

    #[test]
    fn first_colors_are_stable() {
        assert_eq!(
            assign_colors(4),
            vec![[204, 61, 61], [38, 255, 101], [119, 0, 204], [255, 232, 76]]
        );
    }

    #[test]
    fn palette_is_prefix_stable() {
        let long = assign_colors(50);
        assert_eq!(assign_colors(17), long[..17]);
        assert!(assign_colors(0).is_empty());
    }

    #[test]
    fn three_hundred_sixty_colors_are_distinct() {
        let palette = assign_colors(360);
        let unique: HashSet<_> = palette.iter().collect();
        assert_eq!(unique.len(), 360);
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 100.0, 100.0), [255, 0, 0]);
        assert_eq!(hsv_to_rgb(120.0, 100.0, 100.0), [0, 255, 0]);
        assert_eq!(hsv_to_rgb(240.0, 100.0, 100.0), [0, 0, 255]);
        assert_eq!(hsv_to_rgb(42.0, 0.0, 100.0), [255, 255, 255]);
        assert_eq!(hsv_to_rgb(42.0, 100.0, 0.0), [0, 0, 0]);
    }

    #[test]
    fn hsv_mid_sector_channels() {
        assert_eq!(hsv_to_rgb(30.0, 100.0, 100.0), [255, 127, 0]);
        assert_eq!(hsv_to_rgb(90.0, 100.0, 100.0), [127, 255, 0]);
        assert_eq!(hsv_to_rgb(330.0, 50.0, 100.0), [255, 127, 191]);
    }

    #[test]
    fn render_fills_uncovered_with_fallback() {
        let regions = vec![region(0, &[(0, 0), (1, 0)]), region(1, &[(1, 1)])];
        let palette = assign_colors(2);
        let img = render(Dimensions::new(3, 2), &regions, &palette).unwrap();

        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(0, 0).0, palette[0]);
        assert_eq!(img.get_pixel(1, 0).0, palette[0]);
        assert_eq!(img.get_pixel(1, 1).0, palette[1]);
        for (x, y) in [(2, 0), (0, 1), (2, 1)] {
            assert_eq!(img.get_pixel(x, y).0, FALLBACK_COLOR);
        }
    }

    #[test]
    fn render_with_no_regions_is_all_fallback() {
        let img = render(Dimensions::new(4, 4), &[], &[]).unwrap();
        assert!(img.pixels().all(|p| p.0 == FALLBACK_COLOR));
    }

    #[test]
    fn short_palette_is_rejected() {
        let regions = vec![region(0, &[(0, 0)]), region(1, &[(1, 0)])];
        let err = render(Dimensions::new(2, 1), &regions, &assign_colors(1)).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::InvalidArgument {
                parameter: "palette",
                ..
            }
        ));
    }

    #[test]
    fn out_of_bounds_pixel_is_rejected() {
        let regions = vec![region(0, &[(5, 0)])];
        let err = render(Dimensions::new(2, 2), &regions, &assign_colors(1)).unwrap_err();
        assert!(matches!(err, SegmentError::IndexOutOfRange { len: 4, .. }));
    }

    #[test]
    fn render_onto_keeps_alpha_and_uncovered_pixels() {
        let source = RgbaImage::from_fn(2, 2, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let alpha = (x * 10 + y * 100) as u8;
            Rgba([1, 2, 3, alpha])
        });
        let regions = vec![region(0, &[(0, 0), (1, 1)])];
        let palette = vec![[200, 100, 50]];
        let out = render_onto(&source, &regions, &palette).unwrap();

        assert_eq!(out.get_pixel(0, 0).0, [200, 100, 50, 0]);
        assert_eq!(out.get_pixel(1, 1).0, [200, 100, 50, 110]);
        assert_eq!(out.get_pixel(1, 0).0, [1, 2, 3, 10]);
        assert_eq!(out.get_pixel(0, 1).0, [1, 2, 3, 100]);
    }

    #[test]
    fn render_onto_rgb_keeps_type() {
        let source = RgbImage::from_pixel(3, 1, Rgb([9, 9, 9]));
        let regions = vec![region(0, &[(2, 0)])];
        let out: RgbImage = render_onto(&source, &regions, &[[7, 7, 7]]).unwrap();
        assert_eq!(out.get_pixel(2, 0).0, [7, 7, 7]);
        assert_eq!(out.get_pixel(0, 0).0, [9, 9, 9]);
    }
}
