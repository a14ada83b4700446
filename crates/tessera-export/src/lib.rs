//! tessera-export: pure serializers for segmentation results (sans-IO).
//!
//! Converts regions and rendered images into CSV, JSON, PNG and a
//! plain-text processing report. Every function returns bytes or a
//! `String`; writing them anywhere is the caller's job.

pub mod csv;
pub mod json;
pub mod png;
pub mod report;

pub use csv::{RegionEdge, mst_edges_to_csv, regions_to_csv};
pub use json::regions_to_json;
pub use png::to_png;
pub use report::{ReportInput, ReportMetadata, processing_report};

/// Errors from the fallible serializers.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// JSON encoding failed.
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// PNG encoding failed.
    #[error("failed to encode PNG: {0}")]
    Png(#[from] image::ImageError),
}
