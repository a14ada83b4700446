//! JSON export of region summaries.
//!
//! Member pixel lists are left out; a region is written as
//! `{id, size, centroid: [x, y], avg_color: [r, g, b],
//! bounding_box: {x, y, width, height}}`.

use serde::Serialize;

use tessera_pipeline::{BoundingBox, Region};

use crate::ExportError;

#[derive(Serialize)]
struct RegionRecord {
    id: usize,
    size: usize,
    centroid: [f64; 2],
    avg_color: [u8; 3],
    bounding_box: BoundingBox,
}

impl From<&Region> for RegionRecord {
    fn from(r: &Region) -> Self {
        Self {
            id: r.id,
            size: r.size,
            centroid: [r.centroid.x, r.centroid.y],
            avg_color: r.avg_color,
            bounding_box: r.bounding_box,
        }
    }
}

/// Serialize region summaries as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if encoding fails.
pub fn regions_to_json(regions: &[Region]) -> Result<String, ExportError> {
    let records: Vec<RegionRecord> = regions.iter().map(RegionRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}
