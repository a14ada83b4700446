//! Shared types for the tessera segmentation pipeline.

use serde::{Deserialize, Serialize};

use crate::color_metric::ColorSpace;
use crate::downsample::DownsampleFilter;
use crate::pixel_graph::Connectivity;
use crate::segment::SegmentParams;

/// Re-export `RgbImage` so downstream crates can reference the
/// rendered segmentation without depending on `image` directly.
pub use image::RgbImage;

/// Re-export `RgbaImage` so downstream crates can reference the
/// decoded source image without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Row-major index of `(x, y)`: `y * width + x`.
    #[must_use]
    pub const fn index_of(self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Whether `(x, y)` lies inside `[0, width) x [0, height)`.
    #[must_use]
    pub const fn contains(self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }
}

/// One source pixel: its coordinate and its first three channels.
///
/// Any channel beyond the third (alpha) is dropped at extraction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pixel {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Pixel {
    /// Create a new pixel.
    #[must_use]
    pub const fn new(x: u32, y: u32, rgb: [u8; 3]) -> Self {
        Self {
            x,
            y,
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
        }
    }

    /// The `(r, g, b)` channel triple.
    #[must_use]
    pub const fn rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Minimal axis-aligned rectangle covering a set of pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Leftmost column.
    pub x: u32,
    /// Topmost row.
    pub y: u32,
    /// `max(x) - min(x) + 1`.
    pub width: u32,
    /// `max(y) - min(y) + 1`.
    pub height: u32,
}

impl BoundingBox {
    /// Whether `(x, y)` lies inside the box.
    #[must_use]
    pub const fn contains(self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }
}

/// A connected set of similar-colored pixels that survived the
/// minimum-size filter.
///
/// Regions are immutable once produced by
/// [`Segmenter`](crate::segment::Segmenter); the caller owns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Zero-based id, assigned in order of each component's first pixel
    /// in a row-major scan.
    pub id: usize,
    /// Member pixels in row-major order.
    pub pixels: Vec<Pixel>,
    /// Arithmetic mean of member coordinates.
    pub centroid: Point,
    /// Arithmetic mean of member colors, truncated per channel.
    pub avg_color: [u8; 3],
    /// Number of member pixels.
    pub size: usize,
    /// Minimal rectangle covering every member pixel.
    pub bounding_box: BoundingBox,
}

/// Configuration for the full decode-to-render pipeline.
///
/// Defaults: threshold 30, minimum region size 50, 8-connectivity, RGB
/// distance. Resizing and blur are disabled by default so the image is
/// segmented as supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum color distance between two neighbors for them to be merged.
    pub color_threshold: f64,

    /// Components smaller than this are dropped from the output.
    pub min_region_size: usize,

    /// Which neighbors each pixel is compared with.
    pub connectivity: Connectivity,

    /// Color space the distance is computed in.
    pub color_space: ColorSpace,

    /// Longest-axis pixel limit applied before segmentation.
    pub working_resolution: u32,

    /// Resampling filter for the working-resolution resize.
    /// [`DownsampleFilter::Disabled`] skips the resize entirely.
    pub downsample_filter: DownsampleFilter,

    /// Gaussian blur sigma applied before segmentation. Non-positive
    /// values disable the blur.
    pub blur_sigma: f32,
}

impl PipelineConfig {
    /// Default color distance threshold.
    pub const DEFAULT_COLOR_THRESHOLD: f64 = 30.0;
    /// Default minimum region size in pixels.
    pub const DEFAULT_MIN_REGION_SIZE: usize = 50;
    /// Default pixel connectivity.
    pub const DEFAULT_CONNECTIVITY: Connectivity = Connectivity::Eight;
    /// Default color space.
    pub const DEFAULT_COLOR_SPACE: ColorSpace = ColorSpace::Rgb;
    /// Default working resolution (only used when a filter is selected).
    pub const DEFAULT_WORKING_RESOLUTION: u32 = 512;
    /// Default downsample filter.
    pub const DEFAULT_DOWNSAMPLE_FILTER: DownsampleFilter = DownsampleFilter::Disabled;
    /// Default blur sigma.
    pub const DEFAULT_BLUR_SIGMA: f32 = 0.0;
    /// Largest accepted blur sigma. The kernel spans roughly `6 * sigma`
    /// taps.
    pub const MAX_BLUR_SIGMA: f32 = 1000.0;

    /// The segmentation parameters carried by this config.
    #[must_use]
    pub const fn segment_params(&self) -> SegmentParams {
        SegmentParams {
            color_threshold: self.color_threshold,
            min_region_size: self.min_region_size,
            connectivity: self.connectivity,
            color_space: self.color_space,
        }
    }

    /// Check every field, naming the first offending one.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidArgument`] if the segmentation
    /// parameters are invalid, `working_resolution` is zero, or
    /// `blur_sigma` is not finite or exceeds [`Self::MAX_BLUR_SIGMA`].
    pub fn validate(&self) -> Result<(), SegmentError> {
        self.segment_params().validate()?;
        if self.working_resolution == 0 {
            return Err(SegmentError::invalid(
                "working_resolution",
                "must be at least 1",
            ));
        }
        if !self.blur_sigma.is_finite() {
            return Err(SegmentError::invalid("blur_sigma", "must be finite"));
        }
        if self.blur_sigma > Self::MAX_BLUR_SIGMA {
            return Err(SegmentError::invalid(
                "blur_sigma",
                format!(
                    "must be at most {}, got {}",
                    Self::MAX_BLUR_SIGMA,
                    self.blur_sigma
                ),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            color_threshold: Self::DEFAULT_COLOR_THRESHOLD,
            min_region_size: Self::DEFAULT_MIN_REGION_SIZE,
            connectivity: Self::DEFAULT_CONNECTIVITY,
            color_space: Self::DEFAULT_COLOR_SPACE,
            working_resolution: Self::DEFAULT_WORKING_RESOLUTION,
            downsample_filter: Self::DEFAULT_DOWNSAMPLE_FILTER,
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
        }
    }
}

/// Result of running the full pipeline.
///
/// Does not derive `PartialEq` because comparing rendered rasters
/// pixel-by-pixel is rarely what callers want.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Surviving regions, ordered by id.
    pub regions: Vec<Region>,
    /// One palette color per region, indexed by region id.
    pub palette: Vec<[u8; 3]>,
    /// Region-colored rendering of the (preprocessed) image.
    pub rendered: RgbImage,
    /// Dimensions of the segmented image (after any resize).
    pub dimensions: Dimensions,
}

/// Errors that can occur during segmentation.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    /// A caller-supplied parameter is out of range.
    #[error("invalid argument `{parameter}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// An element index fell outside its container. Indicates an
    /// internal invariant violation rather than bad user input.
    #[error("index {index} out of range for {len} elements")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of valid elements.
        len: usize,
    },

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
}

impl SegmentError {
    /// Shorthand for [`SegmentError::InvalidArgument`].
    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    /// Whether the caller can recover by supplying different input.
    ///
    /// [`SegmentError::IndexOutOfRange`] is the only unrecoverable
    /// variant.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::IndexOutOfRange { .. })
    }
}

/// Serde-compatible proxy for `SegmentError`.
///
/// `image::ImageError` does not implement serde, so the `ImageDecode`
/// variant stores its `Display` string instead. The parameter name of
/// `InvalidArgument` is owned here because a `&'static str` cannot be
/// deserialized.
#[derive(Serialize, Deserialize)]
enum SegmentErrorProxy {
    InvalidArgument { parameter: String, reason: String },
    IndexOutOfRange { index: usize, len: usize },
    EmptyInput,
    ImageDecode(String),
}

/// Parameter names `SegmentError::InvalidArgument` can carry. Used to
/// recover the `&'static str` on deserialization.
const KNOWN_PARAMETERS: &[&str] = &[
    "color_threshold",
    "min_region_size",
    "connectivity",
    "color_space",
    "dimensions",
    "channels",
    "palette",
    "working_resolution",
    "blur_sigma",
];

impl Serialize for SegmentError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::InvalidArgument { parameter, reason } => SegmentErrorProxy::InvalidArgument {
                parameter: (*parameter).to_string(),
                reason: reason.clone(),
            },
            Self::IndexOutOfRange { index, len } => SegmentErrorProxy::IndexOutOfRange {
                index: *index,
                len: *len,
            },
            Self::EmptyInput => SegmentErrorProxy::EmptyInput,
            Self::ImageDecode(e) => SegmentErrorProxy::ImageDecode(e.to_string()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SegmentError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = SegmentErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            SegmentErrorProxy::InvalidArgument { parameter, reason } => {
                let known = KNOWN_PARAMETERS
                    .iter()
                    .copied()
                    .find(|&p| p == parameter)
                    .unwrap_or("unknown");
                Self::InvalidArgument {
                    parameter: known,
                    reason,
                }
            }
            SegmentErrorProxy::IndexOutOfRange { index, len } => {
                Self::IndexOutOfRange { index, len }
            }
            SegmentErrorProxy::EmptyInput => Self::EmptyInput,
            // The original image::ImageError cannot be reconstructed;
            // keep the message under a generic decoding error.
            SegmentErrorProxy::ImageDecode(msg) => {
                Self::ImageDecode(image::ImageError::Decoding(
                    image::error::DecodingError::new(
                        image::error::ImageFormatHint::Unknown,
                        msg,
                    ),
                ))
            }
        })
    }
}
