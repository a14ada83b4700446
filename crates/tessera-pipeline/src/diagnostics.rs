//! Per-stage timing and metrics for a pipeline run.
//!
//! [`process_with_diagnostics`] runs the same stages as
//! [`process`](crate::process) and records how long each took and what
//! it produced. Time comes from a caller-supplied [`Clock`], so the
//! library never reads the system clock itself.
//!
//! Durations are serialized as fractional seconds (`f64`) because
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::segment::{SegmentStage, Segmenter};
use crate::types::{Dimensions, PipelineConfig, ProcessResult, SegmentError};
use crate::{blur, decode, downsample, palette};

/// Source of monotonic time for stage measurements.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom("duration seconds must be finite and non-negative")
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Image decoding.
    pub decode: StageDiagnostics,
    /// Working-resolution resize (recorded even when skipped).
    pub downsample: StageDiagnostics,
    /// Gaussian blur (recorded even when skipped).
    pub blur: StageDiagnostics,
    /// Pixel extraction and graph setup.
    pub build_graph: StageDiagnostics,
    /// Union-find merge pass.
    pub merge: StageDiagnostics,
    /// Component grouping and region summaries.
    pub extract: StageDiagnostics,
    /// Palette generation and rendering.
    pub render: StageDiagnostics,
    /// Wall-clock duration of the entire run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding.
    Decode {
        /// Size of the encoded input.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
        /// `width * height`.
        pixel_count: u64,
    },
    /// Working-resolution resize.
    Downsample {
        /// Filter name.
        filter: String,
        /// Width before resizing.
        original_width: u32,
        /// Height before resizing.
        original_height: u32,
        /// Width after resizing.
        width: u32,
        /// Height after resizing.
        height: u32,
        /// Whether a resize actually happened.
        applied: bool,
    },
    /// Gaussian blur.
    Blur {
        /// Kernel sigma (non-positive means skipped).
        sigma: f32,
    },
    /// Pixel extraction and graph setup.
    Graph {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Number of graph vertices.
        pixel_count: usize,
        /// `4` or `8`.
        connectivity: u8,
        /// Color space name.
        color_space: String,
    },
    /// Merge pass.
    Merge {
        /// Threshold in effect.
        color_threshold: f64,
        /// Neighbor pairs whose distance was computed.
        compared_pairs: usize,
        /// Successful unions.
        merge_count: usize,
        /// Components after merging.
        component_count: usize,
    },
    /// Region extraction.
    Extract {
        /// Components before size filtering.
        component_count: usize,
        /// Regions kept.
        region_count: usize,
        /// Pixels in dropped components.
        dropped_pixel_count: usize,
        /// Size of the largest region (0 when none survive).
        largest_region: usize,
    },
    /// Rendering.
    Render {
        /// Palette entries generated.
        palette_size: usize,
        /// Pixels painted with a region color.
        covered_pixel_count: usize,
    },
}

/// High-level counts for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Segmented image width (after any resize).
    pub image_width: u32,
    /// Segmented image height (after any resize).
    pub image_height: u32,
    /// Segmented pixel count.
    pub pixel_count: u64,
    /// Regions kept.
    pub region_count: usize,
    /// Components before size filtering.
    pub component_count: usize,
}

impl PipelineDiagnostics {
    /// Stages in execution order, labelled.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 7] {
        [
            ("decode", &self.decode),
            ("downsample", &self.downsample),
            ("blur", &self.blur),
            (crate::segment::GraphBuilt::NAME, &self.build_graph),
            (crate::segment::Merged::NAME, &self.merge),
            (crate::segment::RegionsExtracted::NAME, &self.extract),
            ("render", &self.render),
        ]
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Segmentation Diagnostics\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration)
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<12} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<12} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Regions: {}  |  Components: {}",
            self.summary.region_count, self.summary.component_count,
        ));

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Downsample {
            filter,
            original_width,
            original_height,
            width,
            height,
            applied,
        } => {
            if *applied {
                format!("{filter} {original_width}x{original_height} -> {width}x{height}")
            } else {
                format!("skipped ({filter}, {width}x{height})")
            }
        }
        StageMetrics::Blur { sigma } => {
            if *sigma > 0.0 {
                format!("sigma={sigma:.2}")
            } else {
                "skipped".to_string()
            }
        }
        StageMetrics::Graph {
            pixel_count,
            connectivity,
            color_space,
            ..
        } => format!("{pixel_count} px, {connectivity}-conn, {color_space}"),
        StageMetrics::Merge {
            color_threshold,
            compared_pairs,
            merge_count,
            component_count,
        } => format!(
            "t={color_threshold:.2} pairs={compared_pairs} unions={merge_count} -> {component_count} components"
        ),
        StageMetrics::Extract {
            component_count,
            region_count,
            dropped_pixel_count,
            largest_region,
        } => format!(
            "{component_count} -> {region_count} regions, dropped {dropped_pixel_count} px, largest {largest_region}"
        ),
        StageMetrics::Render {
            palette_size,
            covered_pixel_count,
        } => format!("{palette_size} colors, {covered_pixel_count} px covered"),
    }
}

/// Run `f`, returning its output and the elapsed time.
fn timed<C: Clock, T>(clock: &C, f: impl FnOnce() -> T) -> (T, Duration) {
    let start = clock.now();
    let out = f();
    (out, clock.elapsed(&start))
}

/// Run the full pipeline and record per-stage diagnostics.
///
/// Produces the same [`ProcessResult`] as [`process`](crate::process).
///
/// # Errors
///
/// Same as [`process`](crate::process).
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &PipelineConfig,
    clock: &C,
) -> Result<(ProcessResult, PipelineDiagnostics), SegmentError> {
    config.validate()?;
    let run_start = clock.now();

    let (decoded, decode_time) = timed(clock, || decode::decode(image_bytes));
    let decoded = decoded?;
    let (original_width, original_height) = decoded.dimensions();
    let decode_diag = StageDiagnostics {
        duration: decode_time,
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: original_width,
            height: original_height,
            pixel_count: u64::from(original_width) * u64::from(original_height),
        },
    };

    let ((working, applied), downsample_time) = timed(clock, || {
        downsample::downsample(
            &decoded,
            config.working_resolution,
            config.downsample_filter,
        )
    });
    let (width, height) = working.dimensions();
    let downsample_diag = StageDiagnostics {
        duration: downsample_time,
        metrics: StageMetrics::Downsample {
            filter: config.downsample_filter.to_string(),
            original_width,
            original_height,
            width,
            height,
            applied,
        },
    };

    let (blurred, blur_time) = timed(clock, || {
        blur::gaussian_blur_rgba(&working, config.blur_sigma)
    });
    let blur_diag = StageDiagnostics {
        duration: blur_time,
        metrics: StageMetrics::Blur {
            sigma: config.blur_sigma,
        },
    };

    let segmenter = Segmenter::new(config.segment_params())?;
    let (built, graph_time) = timed(clock, || segmenter.build_graph(&blurred));
    let built = built?;
    let graph_diag = StageDiagnostics {
        duration: graph_time,
        metrics: built.metrics(),
    };

    let (merged, merge_time) = timed(clock, || built.merge());
    let merged = merged?;
    let merge_diag = StageDiagnostics {
        duration: merge_time,
        metrics: merged.metrics(),
    };

    let (extracted, extract_time) = timed(clock, || merged.extract_regions());
    let extract_diag = StageDiagnostics {
        duration: extract_time,
        metrics: extracted.metrics(),
    };
    let segmentation = extracted.into_result();

    let dimensions = Dimensions::new(width, height);
    let (rendered, render_time) = timed(clock, || {
        let colors = palette::assign_colors(segmentation.regions.len());
        palette::render(dimensions, &segmentation.regions, &colors).map(|img| (colors, img))
    });
    let (colors, rendered) = rendered?;
    let render_diag = StageDiagnostics {
        duration: render_time,
        metrics: StageMetrics::Render {
            palette_size: colors.len(),
            covered_pixel_count: segmentation.regions.iter().map(|r| r.size).sum(),
        },
    };

    let diagnostics = PipelineDiagnostics {
        decode: decode_diag,
        downsample: downsample_diag,
        blur: blur_diag,
        build_graph: graph_diag,
        merge: merge_diag,
        extract: extract_diag,
        render: render_diag,
        total_duration: clock.elapsed(&run_start),
        summary: PipelineSummary {
            image_width: width,
            image_height: height,
            pixel_count: u64::from(width) * u64::from(height),
            region_count: segmentation.regions.len(),
            component_count: segmentation.component_count,
        },
    };

    Ok((
        ProcessResult {
            regions: segmentation.regions,
            palette: colors,
            rendered,
            dimensions,
        },
        diagnostics,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Clock that advances one millisecond per reading.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn two_tone_png() -> Vec<u8> {
        let img = image::RgbaImage::from_fn(16, 8, |x, _| {
            if x < 8 {
                image::Rgba([20, 20, 20, 255])
            } else {
                image::Rgba([230, 230, 230, 255])
            }
        });
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn diagnostics_match_plain_process() {
        let png = two_tone_png();
        let config = PipelineConfig::default();
        let clock = TickClock(Cell::new(0));
        let (result, diag) = process_with_diagnostics(&png, &config, &clock).unwrap();
        let plain = crate::process(&png, &config).unwrap();

        assert_eq!(result.regions, plain.regions);
        assert_eq!(result.palette, plain.palette);
        assert_eq!(result.rendered, plain.rendered);

        assert_eq!(diag.summary.region_count, 2);
        assert_eq!(diag.summary.component_count, 2);
        assert_eq!(diag.summary.pixel_count, 128);
        assert!(matches!(
            diag.render.metrics,
            StageMetrics::Render {
                palette_size: 2,
                covered_pixel_count: 128
            }
        ));
        assert!(matches!(
            diag.downsample.metrics,
            StageMetrics::Downsample { applied: false, .. }
        ));
        for (_, stage) in diag.stages() {
            assert!(stage.duration >= Duration::from_millis(1));
            assert!(stage.duration <= diag.total_duration);
        }
    }

    #[test]
    fn invalid_config_fails_before_decoding() {
        let config = PipelineConfig {
            min_region_size: 0,
            ..PipelineConfig::default()
        };
        let clock = TickClock(Cell::new(0));
        let err = process_with_diagnostics(&[], &config, &clock).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::InvalidArgument {
                parameter: "min_region_size",
                ..
            }
        ));
        assert_eq!(clock.0.get(), 0);
    }

    #[test]
    fn report_lists_every_stage() {
        let clock = TickClock(Cell::new(0));
        let (_, diag) =
            process_with_diagnostics(&two_tone_png(), &PipelineConfig::default(), &clock).unwrap();
        let report = diag.report();
        assert!(report.contains("Segmentation Diagnostics"));
        for name in ["decode", "downsample", "blur", "graph", "merge", "extract", "render"] {
            assert!(report.contains(name), "missing stage {name}");
        }
        assert!(report.contains("Regions: 2"));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let clock = TickClock(Cell::new(0));
        let (_, diag) =
            process_with_diagnostics(&two_tone_png(), &PipelineConfig::default(), &clock).unwrap();
        let json = serde_json::to_value(&diag).unwrap();
        assert!(json["decode"]["duration"].is_f64());
        let back: PipelineDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.decode.duration, diag.decode.duration);
        assert_eq!(back.merge.metrics, diag.merge.metrics);
    }
}
