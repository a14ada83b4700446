//! Implicit pixel-adjacency graph over a row-major image grid.
//!
//! Nothing is materialized: neighbors are computed from the pixel
//! coordinate and a fixed offset table. Offsets are listed as
//! `(dx, dy)` and their order is stable so test fixtures are
//! reproducible.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, SegmentError};

/// Which neighbors a pixel is adjacent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Connectivity {
    /// Cardinal neighbors only (W, E, N, S).
    Four,
    /// Cardinal and diagonal neighbors.
    #[default]
    Eight,
}

/// 4-connected offsets, cardinal order.
const FOUR_OFFSETS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// 8-connected offsets, grouped by `dx`.
const EIGHT_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

impl Connectivity {
    /// Neighbor offsets for this connectivity as `(dx, dy)`.
    #[must_use]
    pub const fn offsets(self) -> &'static [(i64, i64)] {
        match self {
            Self::Four => &FOUR_OFFSETS,
            Self::Eight => &EIGHT_OFFSETS,
        }
    }

    /// Neighbor count of an interior pixel (`4` or `8`).
    #[must_use]
    pub const fn degree(self) -> u8 {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

impl TryFrom<u8> for Connectivity {
    type Error = SegmentError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            other => Err(SegmentError::invalid(
                "connectivity",
                format!("must be 4 or 8, got {other}"),
            )),
        }
    }
}

impl TryFrom<u32> for Connectivity {
    type Error = SegmentError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| {
                SegmentError::invalid("connectivity", format!("must be 4 or 8, got {value}"))
            })
            .and_then(Self::try_from)
    }
}

impl From<Connectivity> for u8 {
    fn from(c: Connectivity) -> Self {
        c.degree()
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-connected", self.degree())
    }
}

/// Row-major indices of the in-bounds neighbors of `(x, y)`, in the
/// fixed offset order of `connectivity`.
#[must_use]
pub fn neighbors(x: u32, y: u32, connectivity: Connectivity, dimensions: Dimensions) -> Vec<usize> {
    neighbor_iter(x, y, connectivity, dimensions).collect()
}

fn neighbor_iter(
    x: u32,
    y: u32,
    connectivity: Connectivity,
    dimensions: Dimensions,
) -> impl Iterator<Item = usize> {
    let width = i64::from(dimensions.width);
    let height = i64::from(dimensions.height);
    connectivity.offsets().iter().filter_map(move |&(dx, dy)| {
        let nx = i64::from(x) + dx;
        let ny = i64::from(y) + dy;
        if (0..width).contains(&nx) && (0..height).contains(&ny) {
            // In-bounds, so both coordinates are non-negative and fit.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = ny as usize * dimensions.width as usize + nx as usize;
            Some(index)
        } else {
            None
        }
    })
}

/// Adjacency over every pixel of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelGraph {
    dimensions: Dimensions,
    connectivity: Connectivity,
}

impl PixelGraph {
    /// Create the graph for an image of `dimensions`.
    #[must_use]
    pub const fn new(dimensions: Dimensions, connectivity: Connectivity) -> Self {
        Self {
            dimensions,
            connectivity,
        }
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Connectivity.
    #[must_use]
    pub const fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Number of vertices (pixels).
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.dimensions.pixel_count()
    }

    /// Neighbors of the pixel at row-major `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::IndexOutOfRange`] if `index` is not a
    /// pixel of this image.
    pub fn neighbors_of(&self, index: usize) -> Result<Vec<usize>, SegmentError> {
        let (x, y) = self.coordinate(index)?;
        Ok(neighbors(x, y, self.connectivity, self.dimensions))
    }

    /// `(x, y)` of the pixel at row-major `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::IndexOutOfRange`] if `index` is not a
    /// pixel of this image.
    pub fn coordinate(&self, index: usize) -> Result<(u32, u32), SegmentError> {
        let len = self.node_count();
        if index >= len {
            return Err(SegmentError::IndexOutOfRange { index, len });
        }
        let width = self.dimensions.width as usize;
        // index < width * height, so both quotient and remainder fit in u32.
        #[allow(clippy::cast_possible_truncation)]
        let coordinate = ((index % width) as u32, (index / width) as u32);
        Ok(coordinate)
    }

    /// Every unordered neighbor pair exactly once, as `(i, j)` with
    /// `i < j`, in row-major order of `i`.
    pub fn forward_edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let dims = self.dimensions;
        let connectivity = self.connectivity;
        (0..dims.height).flat_map(move |y| {
            (0..dims.width).flat_map(move |x| {
                let i = dims.index_of(x, y);
                neighbor_iter(x, y, connectivity, dims)
                    .filter(move |&j| j > i)
                    .map(move |j| (i, j))
            })
        })
    }
}
