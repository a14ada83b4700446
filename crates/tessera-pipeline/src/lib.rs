//! tessera-pipeline: color-based image segmentation (sans-IO).
//!
//! Partitions a raster image into regions of similar color by merging
//! neighboring pixels with a union-find structure:
//! decode -> resize -> blur -> build graph -> merge -> extract -> render.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory
//! byte slices and image buffers and returns structured data. File
//! handling and export formats live in `tessera-export` and the CLI.

pub mod blur;
pub mod color_metric;
pub mod decode;
pub mod diagnostics;
pub mod disjoint_set;
pub mod downsample;
pub mod palette;
pub mod pixel_graph;
pub mod segment;
pub mod types;

pub use color_metric::ColorSpace;
pub use disjoint_set::DisjointSet;
pub use downsample::DownsampleFilter;
pub use pixel_graph::{Connectivity, PixelGraph};
pub use segment::{SegmentParams, Segmentation, Segmenter, segment};
pub use types::{
    BoundingBox, Dimensions, Pixel, PipelineConfig, Point, ProcessResult, Region, RgbImage,
    RgbaImage, SegmentError,
};

/// Run the full segmentation pipeline on encoded image bytes.
///
/// # Pipeline steps
///
/// 1. Decode to RGBA
/// 2. Resize to the working resolution (when a filter is selected)
/// 3. Gaussian blur (when `blur_sigma > 0`)
/// 4. Union-find segmentation
/// 5. Palette assignment and rendering
///
/// # Errors
///
/// Returns [`SegmentError::InvalidArgument`] if `config` is invalid,
/// [`SegmentError::EmptyInput`] if `image_bytes` is empty, and
/// [`SegmentError::ImageDecode`] if the image cannot be decoded.
pub fn process(image_bytes: &[u8], config: &PipelineConfig) -> Result<ProcessResult, SegmentError> {
    config.validate()?;

    let decoded = decode::decode(image_bytes)?;
    let (working, _) = downsample::downsample(
        &decoded,
        config.working_resolution,
        config.downsample_filter,
    );
    let blurred = blur::gaussian_blur_rgba(&working, config.blur_sigma);

    let regions = segment(&blurred, &config.segment_params())?;

    let dimensions = Dimensions::new(blurred.width(), blurred.height());
    let colors = palette::assign_colors(regions.len());
    let rendered = palette::render(dimensions, &regions, &colors)?;

    log::debug!(
        "processed {}x{} into {} regions",
        dimensions.width,
        dimensions.height,
        regions.len(),
    );

    Ok(ProcessResult {
        regions,
        palette: colors,
        rendered,
        dimensions,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
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

    /// Left half dark, right half light.
    fn split_png(width: u32, height: u32) -> Vec<u8> {
        encode_png(&RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                image::Rgba([30, 30, 40, 255])
            } else {
                image::Rgba([220, 210, 200, 255])
            }
        }))
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &PipelineConfig::default());
        assert!(matches!(result, Err(SegmentError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], &PipelineConfig::default());
        assert!(matches!(result, Err(SegmentError::ImageDecode(_))));
    }

    #[test]
    fn process_rejects_invalid_config() {
        let config = PipelineConfig {
            color_threshold: -1.0,
            ..PipelineConfig::default()
        };
        let result = process(&split_png(4, 4), &config);
        assert!(matches!(
            result,
            Err(SegmentError::InvalidArgument {
                parameter: "color_threshold",
                ..
            })
        ));
    }

    #[test]
    fn process_split_image_gives_two_regions() {
        let result = process(&split_png(20, 10), &PipelineConfig::default()).unwrap();
        assert_eq!(result.dimensions, Dimensions::new(20, 10));
        assert_eq!(result.regions.len(), 2);
        assert_eq!(result.regions[0].avg_color, [30, 30, 40]);
        assert_eq!(result.regions[1].avg_color, [220, 210, 200]);
        assert_eq!(result.palette, palette::assign_colors(2));
        assert_eq!(result.rendered.get_pixel(0, 0).0, result.palette[0]);
        assert_eq!(result.rendered.get_pixel(19, 9).0, result.palette[1]);
    }

    #[test]
    fn process_small_regions_render_as_fallback() {
        // Each half has 8 pixels, below the default minimum of 50.
        let result = process(&split_png(4, 4), &PipelineConfig::default()).unwrap();
        assert!(result.regions.is_empty());
        assert!(
            result
                .rendered
                .pixels()
                .all(|p| p.0 == palette::FALLBACK_COLOR)
        );
    }

    #[test]
    fn process_resizes_to_working_resolution() {
        let config = PipelineConfig {
            working_resolution: 10,
            downsample_filter: DownsampleFilter::Nearest,
            min_region_size: 1,
            ..PipelineConfig::default()
        };
        let result = process(&split_png(40, 20), &config).unwrap();
        assert_eq!(result.dimensions, Dimensions::new(10, 5));
        assert_eq!(result.rendered.dimensions(), (10, 5));
        let covered: usize = result.regions.iter().map(|r| r.size).sum();
        assert_eq!(covered, 50);
    }

    #[test]
    fn blur_merges_noisy_pixels() {
        // A light field sprinkled with isolated dark pixels. Without blur
        // every speck is its own component; a strong blur washes them out.
        let img = RgbaImage::from_fn(30, 30, |x, y| {
            if (x * 7 + y * 3) % 11 == 0 {
                image::Rgba([150, 150, 150, 255])
            } else {
                image::Rgba([200, 200, 200, 255])
            }
        });
        let png = encode_png(&img);
        let sharp = PipelineConfig {
            color_threshold: 10.0,
            min_region_size: 1,
            ..PipelineConfig::default()
        };
        let blurred = PipelineConfig {
            blur_sigma: 3.0,
            ..sharp.clone()
        };
        let sharp_count = process(&png, &sharp).unwrap().regions.len();
        let blurred_count = process(&png, &blurred).unwrap().regions.len();
        assert!(
            blurred_count < sharp_count,
            "blur should reduce regions: {blurred_count} vs {sharp_count}"
        );
    }
}
