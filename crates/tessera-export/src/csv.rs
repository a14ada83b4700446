//! CSV export of region summaries and region-graph edges.
//!
//! One header line, then one row per item, `\n` line endings. None of
//! the fields can contain a comma, so no quoting is needed.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use tessera_pipeline::Region;

/// Column header for [`regions_to_csv`].
pub const REGION_CSV_HEADER: &str = "id,size,centroid_x,centroid_y,avg_color_r,avg_color_g,avg_color_b,bbox_x,bbox_y,bbox_width,bbox_height";

/// Column header for [`mst_edges_to_csv`].
pub const EDGE_CSV_HEADER: &str = "from,to,weight";

/// A weighted edge between two regions, as produced by an external
/// minimum-spanning-tree step over region centroids or colors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionEdge {
    /// Id of one endpoint region.
    pub from: usize,
    /// Id of the other endpoint region.
    pub to: usize,
    /// Edge weight.
    pub weight: f64,
}

/// Serialize region summaries (member pixels omitted) as CSV.
///
/// ```
/// let csv = tessera_export::regions_to_csv(&[]);
/// assert_eq!(csv.lines().count(), 1);
/// ```
#[must_use]
pub fn regions_to_csv(regions: &[Region]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{REGION_CSV_HEADER}");
    for r in regions {
        let [red, green, blue] = r.avg_color;
        let b = r.bounding_box;
        let _ = writeln!(
            out,
            "{},{},{},{},{red},{green},{blue},{},{},{},{}",
            r.id, r.size, r.centroid.x, r.centroid.y, b.x, b.y, b.width, b.height,
        );
    }
    out
}

/// Serialize region-graph edges as CSV.
#[must_use]
pub fn mst_edges_to_csv(edges: &[RegionEdge]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{EDGE_CSV_HEADER}");
    for e in edges {
        let _ = writeln!(out, "{},{},{}", e.from, e.to, e.weight);
    }
    out
}
