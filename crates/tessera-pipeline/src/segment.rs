//! Union-find region segmentation.
//!
//! The segmenter is a consuming state machine:
//!
//! ```text
//! Segmenter (uninitialized) -> GraphBuilt -> Merged -> RegionsExtracted
//! ```
//!
//! ```rust
//! # use tessera_pipeline::{SegmentError, segment::{SegmentParams, Segmenter}};
//! # fn run(image: &image::RgbImage) -> Result<(), SegmentError> {
//! let regions = Segmenter::new(SegmentParams::default())?
//!     .build_graph(image)?
//!     .merge()?
//!     .extract_regions()
//!     .into_regions();
//! # Ok(())
//! # }
//! ```
//!
//! Each call to [`Segmenter::build_graph`] allocates a fresh
//! [`DisjointSet`] and pixel buffer; nothing is shared between runs.
//! [`segment`] runs every stage in one call.

use std::ops::Deref;

use image::ImageBuffer;
use serde::{Deserialize, Serialize};

use crate::color_metric::ColorSpace;
use crate::diagnostics::StageMetrics;
use crate::disjoint_set::DisjointSet;
use crate::pixel_graph::{Connectivity, PixelGraph};
use crate::types::{BoundingBox, Dimensions, Pixel, Point, Region, SegmentError};

/// Parameters of one segmentation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentParams {
    /// Neighbors at most this far apart (in `color_space`) are merged.
    pub color_threshold: f64,
    /// Components with fewer pixels are dropped.
    pub min_region_size: usize,
    /// Neighborhood used for merging.
    pub connectivity: Connectivity,
    /// Space the color distance is computed in.
    pub color_space: ColorSpace,
}

impl Default for SegmentParams {
    fn default() -> Self {
        crate::PipelineConfig::default().segment_params()
    }
}

impl SegmentParams {
    /// Build and validate parameters from raw caller input.
    ///
    /// `connectivity` must be `4` or `8`. `color_space` is matched
    /// case-insensitively; unknown names fall back to RGB.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidArgument`] naming the first bad
    /// parameter.
    pub fn try_new(
        color_threshold: f64,
        min_region_size: usize,
        connectivity: u32,
        color_space: &str,
    ) -> Result<Self, SegmentError> {
        let params = Self {
            color_threshold,
            min_region_size,
            connectivity: Connectivity::try_from(connectivity)?,
            color_space: ColorSpace::from_name(color_space),
        };
        params.validate()?;
        Ok(params)
    }

    /// Check the numeric parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidArgument`] if `color_threshold` is
    /// negative or not finite, or `min_region_size` is zero.
    pub fn validate(&self) -> Result<(), SegmentError> {
        if !self.color_threshold.is_finite() {
            return Err(SegmentError::invalid(
                "color_threshold",
                format!("must be finite, got {}", self.color_threshold),
            ));
        }
        if self.color_threshold < 0.0 {
            return Err(SegmentError::invalid(
                "color_threshold",
                format!("must be >= 0, got {}", self.color_threshold),
            ));
        }
        if self.min_region_size == 0 {
            return Err(SegmentError::invalid(
                "min_region_size",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Common interface of the segmenter states, used by diagnostics.
pub trait SegmentStage {
    /// Human-readable stage name.
    const NAME: &str;

    /// Metrics describing the work done to reach this state.
    fn metrics(&self) -> StageMetrics;
}

// ─────────────────────── State 0: Uninitialized ──────────────────────

/// Segmenter with validated parameters and no image yet.
#[must_use = "segmenter states are consumed by advancing; call .build_graph() to continue"]
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    params: SegmentParams,
}

impl Segmenter {
    /// Validate `params` and create a segmenter.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidArgument`] if `params` is invalid.
    pub fn new(params: SegmentParams) -> Result<Self, SegmentError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The parameters this segmenter runs with.
    pub const fn params(&self) -> &SegmentParams {
        &self.params
    }

    /// Extract pixels from an image buffer and build the adjacency graph.
    ///
    /// Only the first three channels are read; alpha or any further
    /// channel is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidArgument`] if the image has a zero
    /// dimension or fewer than three channels.
    pub fn build_graph<P, C>(self, image: &ImageBuffer<P, C>) -> Result<GraphBuilt, SegmentError>
    where
        P: image::Pixel<Subpixel = u8>,
        C: Deref<Target = [u8]>,
    {
        let (width, height) = image.dimensions();
        let dimensions = Dimensions::new(width, height);
        let channels = usize::from(P::CHANNEL_COUNT);
        let raw: &[u8] = image;
        // The container may hold trailing bytes past the last pixel.
        let data = dimensions
            .pixel_count()
            .checked_mul(channels)
            .and_then(|len| raw.get(..len))
            .unwrap_or(raw);
        self.build_graph_from_raw(data, dimensions, channels)
    }

    /// Like [`build_graph`](Self::build_graph), for a bare interleaved
    /// 8-bit buffer (row-major, top-left origin).
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidArgument`] if a dimension is zero,
    /// `channels < 3`, or `data.len() != width * height * channels`.
    pub fn build_graph_from_raw(
        self,
        data: &[u8],
        dimensions: Dimensions,
        channels: usize,
    ) -> Result<GraphBuilt, SegmentError> {
        if dimensions.width == 0 || dimensions.height == 0 {
            return Err(SegmentError::invalid(
                "dimensions",
                format!(
                    "width and height must be positive, got {}x{}",
                    dimensions.width, dimensions.height
                ),
            ));
        }
        if channels < 3 {
            return Err(SegmentError::invalid(
                "channels",
                format!("need at least 3 channels, got {channels}"),
            ));
        }
        let expected = dimensions
            .pixel_count()
            .checked_mul(channels)
            .ok_or_else(|| SegmentError::invalid("dimensions", "image too large"))?;
        if data.len() != expected {
            return Err(SegmentError::invalid(
                "dimensions",
                format!(
                    "buffer holds {} bytes, {}x{}x{channels} needs {expected}",
                    data.len(),
                    dimensions.width,
                    dimensions.height,
                ),
            ));
        }

        let pixels: Vec<Pixel> = (0..dimensions.height)
            .flat_map(|y| (0..dimensions.width).map(move |x| (x, y)))
            .zip(data.chunks_exact(channels))
            .map(|((x, y), c)| Pixel::new(x, y, [c[0], c[1], c[2]]))
            .collect();

        let space = self.params.color_space;
        let coords = pixels.iter().map(|p| space.project(p.rgb())).collect();

        log::debug!(
            "graph built: {}x{} ({} pixels, {})",
            dimensions.width,
            dimensions.height,
            pixels.len(),
            self.params.connectivity,
        );

        Ok(GraphBuilt {
            params: self.params,
            graph: PixelGraph::new(dimensions, self.params.connectivity),
            sets: DisjointSet::new(pixels.len()),
            pixels,
            coords,
        })
    }
}

// ─────────────────────── State 1: GraphBuilt ─────────────────────────

/// Pixels extracted, projected into the color space, and a fresh
/// singleton [`DisjointSet`] allocated.
#[must_use = "segmenter states are consumed by advancing; call .merge() to continue"]
#[derive(Debug)]
pub struct GraphBuilt {
    params: SegmentParams,
    graph: PixelGraph,
    pixels: Vec<Pixel>,
    /// Per-pixel coordinates in `params.color_space`.
    coords: Vec<[f64; 3]>,
    sets: DisjointSet,
}

impl GraphBuilt {
    /// The extracted pixels in row-major order.
    #[must_use]
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// The adjacency graph.
    pub const fn graph(&self) -> &PixelGraph {
        &self.graph
    }

    /// Union every neighbor pair whose color distance is within the
    /// threshold.
    ///
    /// Each unordered pair is compared once. Visiting it again from the
    /// other endpoint would be a no-op `union`, so the partition is the
    /// same either way.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::IndexOutOfRange`] only if the graph
    /// produced an index outside the pixel buffer, which indicates a bug.
    pub fn merge(self) -> Result<Merged, SegmentError> {
        let Self {
            params,
            graph,
            pixels,
            coords,
            mut sets,
        } = self;

        let space = params.color_space;
        let mut compared_pairs = 0_usize;
        let mut merge_count = 0_usize;
        for (i, j) in graph.forward_edges() {
            compared_pairs += 1;
            let (Some(&a), Some(&b)) = (coords.get(i), coords.get(j)) else {
                return Err(SegmentError::IndexOutOfRange {
                    index: i.max(j),
                    len: coords.len(),
                });
            };
            if space.projected_distance(a, b) <= params.color_threshold && sets.union(i, j)? {
                merge_count += 1;
            }
        }

        log::debug!(
            "merge pass: {compared_pairs} pairs compared, {merge_count} unions, {} components",
            pixels.len() - merge_count,
        );

        Ok(Merged {
            params,
            dimensions: graph.dimensions(),
            pixels,
            sets,
            compared_pairs,
            merge_count,
        })
    }
}

impl SegmentStage for GraphBuilt {
    const NAME: &str = "graph";

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Graph {
            width: self.graph.dimensions().width,
            height: self.graph.dimensions().height,
            pixel_count: self.pixels.len(),
            connectivity: self.graph.connectivity().degree(),
            color_space: self.params.color_space.name().to_string(),
        }
    }
}

// ───────────────────────── State 2: Merged ───────────────────────────

/// All merges applied; the partition is final.
#[must_use = "segmenter states are consumed by advancing; call .extract_regions() to continue"]
#[derive(Debug)]
pub struct Merged {
    params: SegmentParams,
    dimensions: Dimensions,
    pixels: Vec<Pixel>,
    sets: DisjointSet,
    compared_pairs: usize,
    merge_count: usize,
}

impl Merged {
    /// Number of successful unions (each one removes a component).
    #[must_use]
    pub const fn merge_count(&self) -> usize {
        self.merge_count
    }

    /// Number of connected components before size filtering.
    #[must_use]
    pub const fn component_count(&self) -> usize {
        self.pixels.len() - self.merge_count
    }

    /// Group pixels by component and summarize every component with at
    /// least `min_region_size` pixels.
    ///
    /// Region ids follow the order in which each component's first
    /// pixel appears in a row-major scan. Pixels of smaller components
    /// are dropped, not reassigned.
    pub fn extract_regions(self) -> RegionsExtracted {
        let Self {
            params,
            dimensions,
            pixels,
            mut sets,
            merge_count,
            ..
        } = self;

        let components = sets.components();
        let roots = sets.roots();

        // Map each root to its position in first-seen order.
        let mut slot = vec![0_usize; roots.len()];
        for (k, &(root, _)) in components.iter().enumerate() {
            slot[root] = k;
        }
        let mut members: Vec<Vec<usize>> = components
            .iter()
            .map(|&(_, size)| Vec::with_capacity(size))
            .collect();
        for (i, &root) in roots.iter().enumerate() {
            members[slot[root]].push(i);
        }

        let mut regions = Vec::new();
        let mut dropped_pixel_count = 0;
        for group in &members {
            if group.len() < params.min_region_size {
                dropped_pixel_count += group.len();
                continue;
            }
            let region_pixels = group.iter().map(|&i| pixels[i]).collect();
            regions.push(summarize(regions.len(), region_pixels));
        }

        log::debug!(
            "extracted {} regions from {} components ({dropped_pixel_count} pixels below min size {})",
            regions.len(),
            components.len(),
            params.min_region_size,
        );

        RegionsExtracted {
            dimensions,
            regions,
            component_count: components.len(),
            dropped_pixel_count,
            merge_count,
        }
    }
}

impl SegmentStage for Merged {
    const NAME: &str = "merge";

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Merge {
            color_threshold: self.params.color_threshold,
            compared_pairs: self.compared_pairs,
            merge_count: self.merge_count,
            component_count: self.component_count(),
        }
    }
}

/// Build the summary of one component. `pixels` must be non-empty.
#[allow(clippy::cast_precision_loss)]
fn summarize(id: usize, pixels: Vec<Pixel>) -> Region {
    let size = pixels.len();
    let mut sum_x = 0_u64;
    let mut sum_y = 0_u64;
    let mut sum_rgb = [0_u64; 3];
    let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
    let (mut max_x, mut max_y) = (0_u32, 0_u32);

    for p in &pixels {
        sum_x += u64::from(p.x);
        sum_y += u64::from(p.y);
        for (sum, c) in sum_rgb.iter_mut().zip(p.rgb()) {
            *sum += u64::from(c);
        }
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    let n = size as u64;
    let centroid = Point::new(sum_x as f64 / size as f64, sum_y as f64 / size as f64);
    // Truncating mean of u8 values always fits in u8.
    let avg_color = sum_rgb.map(|sum| u8::try_from(sum / n).unwrap_or(u8::MAX));

    Region {
        id,
        pixels,
        centroid,
        avg_color,
        size,
        bounding_box: BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        },
    }
}

// ──────────────────── State 3: RegionsExtracted ──────────────────────

/// Final state holding the surviving regions.
#[must_use = "call .into_regions() or .into_result() to take the regions"]
#[derive(Debug, Clone)]
pub struct RegionsExtracted {
    dimensions: Dimensions,
    regions: Vec<Region>,
    component_count: usize,
    dropped_pixel_count: usize,
    merge_count: usize,
}

impl RegionsExtracted {
    /// The surviving regions, ordered by id.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Take the regions.
    #[must_use]
    pub fn into_regions(self) -> Vec<Region> {
        self.regions
    }

    /// Take the regions together with run statistics.
    #[must_use]
    pub fn into_result(self) -> Segmentation {
        Segmentation {
            regions: self.regions,
            dimensions: self.dimensions,
            component_count: self.component_count,
            dropped_pixel_count: self.dropped_pixel_count,
            merge_count: self.merge_count,
        }
    }
}

impl SegmentStage for RegionsExtracted {
    const NAME: &str = "extract";

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Extract {
            component_count: self.component_count,
            region_count: self.regions.len(),
            dropped_pixel_count: self.dropped_pixel_count,
            largest_region: self.regions.iter().map(|r| r.size).max().unwrap_or(0),
        }
    }
}

/// Regions plus statistics from one segmentation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    /// Surviving regions, ordered by id.
    pub regions: Vec<Region>,
    /// Dimensions of the segmented image.
    pub dimensions: Dimensions,
    /// Connected components before size filtering.
    pub component_count: usize,
    /// Pixels belonging to components below `min_region_size`.
    pub dropped_pixel_count: usize,
    /// Successful unions during the merge pass.
    pub merge_count: usize,
}

/// Segment `image` into regions of similar color.
///
/// # Errors
///
/// Returns [`SegmentError::InvalidArgument`] for invalid parameters or a
/// malformed image, before any work is done.
pub fn segment<P, C>(
    image: &ImageBuffer<P, C>,
    params: &SegmentParams,
) -> Result<Vec<Region>, SegmentError>
where
    P: image::Pixel<Subpixel = u8>,
    C: Deref<Target = [u8]>,
{
    Ok(Segmenter::new(*params)?
        .build_graph(image)?
        .merge()?
        .extract_regions()
        .into_regions())
}
