//! Plain-text processing report.
//!
//! Summarizes one segmentation run: image size, region count,
//! compression ratio, timing, throughput and the parameters used.

use std::fmt::Write;
use std::time::Duration;

use tessera_pipeline::{Dimensions, SegmentParams};

/// Facts about a finished run.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    /// Dimensions of the segmented image.
    pub dimensions: Dimensions,
    /// Number of regions kept.
    pub region_count: usize,
    /// Wall-clock time of the run.
    pub processing_time: Duration,
    /// Parameters the run used.
    pub params: &'a SegmentParams,
}

/// Optional header lines.
#[derive(Debug, Clone, Default)]
pub struct ReportMetadata<'a> {
    /// Source image name, emitted as `Source: <title>`.
    pub title: Option<&'a str>,
    /// Time of processing, emitted as `Processing Date: <timestamp>`.
    pub timestamp: Option<&'a str>,
}

/// Render the processing report.
///
/// Compression ratio is `regions / pixels * 100`. Throughput is omitted
/// when the processing time is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn processing_report(input: &ReportInput<'_>, metadata: &ReportMetadata<'_>) -> String {
    let pixels = input.dimensions.pixel_count();
    let seconds = input.processing_time.as_secs_f64();

    let mut out = String::new();
    let _ = writeln!(out, "IMAGE SEGMENTATION REPORT");
    let _ = writeln!(out, "=========================");
    let _ = writeln!(out);
    if let Some(title) = metadata.title {
        let _ = writeln!(out, "Source: {title}");
    }
    if let Some(timestamp) = metadata.timestamp {
        let _ = writeln!(out, "Processing Date: {timestamp}");
    }
    if metadata.title.is_some() || metadata.timestamp.is_some() {
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "IMAGE INFORMATION");
    let _ = writeln!(out, "-----------------");
    let _ = writeln!(out, "Total Pixels: {}", group_thousands(pixels as u64));
    let _ = writeln!(
        out,
        "Image Dimensions: {} x {}",
        input.dimensions.width, input.dimensions.height
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "SEGMENTATION RESULTS");
    let _ = writeln!(out, "--------------------");
    let _ = writeln!(out, "Total Regions: {}", input.region_count);
    let ratio = if pixels == 0 {
        0.0
    } else {
        input.region_count as f64 / pixels as f64 * 100.0
    };
    let _ = writeln!(out, "Compression Ratio: {ratio:.2}%");
    let _ = writeln!(out, "Processing Time: {seconds:.2} seconds");
    if seconds > 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let speed = (pixels as f64 / seconds).round() as u64;
        let _ = writeln!(
            out,
            "Processing Speed: {} pixels/second",
            group_thousands(speed)
        );
    }
    let _ = writeln!(out);

    let params = input.params;
    let _ = writeln!(out, "PARAMETERS USED");
    let _ = writeln!(out, "---------------");
    let _ = writeln!(out, "Color Threshold: {}", params.color_threshold);
    let _ = writeln!(out, "Minimum Region Size: {} pixels", params.min_region_size);
    let _ = writeln!(out, "Pixel Connectivity: {}", params.connectivity);
    let _ = writeln!(out, "Color Space: {}", params.color_space);
    out
}

/// Format with `,` every three digits.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use tessera_pipeline::{ColorSpace, Connectivity};

    use super::*;

    fn params() -> SegmentParams {
        SegmentParams {
            color_threshold: 30.0,
            min_region_size: 50,
            connectivity: Connectivity::Eight,
            color_space: ColorSpace::Lab,
        }
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn report_contains_every_section() {
        let params = params();
        let input = ReportInput {
            dimensions: Dimensions::new(200, 100),
            region_count: 40,
            processing_time: Duration::from_millis(500),
            params: &params,
        };
        let metadata = ReportMetadata {
            title: Some("beach.png"),
            timestamp: Some("2024-05-01 12:00:00"),
        };
        let report = processing_report(&input, &metadata);

        for expected in [
            "IMAGE SEGMENTATION REPORT",
            "Source: beach.png",
            "Processing Date: 2024-05-01 12:00:00",
            "Total Pixels: 20,000",
            "Image Dimensions: 200 x 100",
            "Total Regions: 40",
            "Compression Ratio: 0.20%",
            "Processing Time: 0.50 seconds",
            "Processing Speed: 40,000 pixels/second",
            "Color Threshold: 30",
            "Minimum Region Size: 50 pixels",
            "Pixel Connectivity: 8-connected",
            "Color Space: LAB",
        ] {
            assert!(report.contains(expected), "missing {expected:?} in\n{report}");
        }
    }

    #[test]
    fn zero_time_omits_speed_and_metadata() {
        let params = params();
        let input = ReportInput {
            dimensions: Dimensions::new(10, 10),
            region_count: 1,
            processing_time: Duration::ZERO,
            params: &params,
        };
        let report = processing_report(&input, &ReportMetadata::default());
        assert!(!report.contains("Processing Speed"));
        assert!(!report.contains("Source:"));
        assert!(report.contains("Compression Ratio: 1.00%"));
    }
}
