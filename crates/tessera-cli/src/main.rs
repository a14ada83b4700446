//! tessera: segment an image into color regions from the command line.
//!
//! Runs the segmentation pipeline on an image file, prints per-stage
//! diagnostics, and optionally writes the rendered segmentation and
//! region exports.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin tessera -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Progress goes to the log (`RUST_LOG`, default `info`); diagnostics
//! go to stdout.

#![allow(clippy::print_stdout)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};
use tessera_export::{RegionEdge, ReportInput, ReportMetadata};
use tessera_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use tessera_pipeline::{
    ColorSpace, Connectivity, DownsampleFilter, PipelineConfig, ProcessResult, SegmentError,
};

/// Color-based image segmentation with union-find region merging.
///
/// Neighboring pixels whose colors are within the threshold are merged
/// into regions; regions smaller than the minimum size are dropped.
#[derive(Parser)]
#[command(name = "tessera", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Maximum color distance between merged neighbors.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_COLOR_THRESHOLD)]
    color_threshold: f64,

    /// Regions with fewer pixels are dropped.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MIN_REGION_SIZE)]
    min_region_size: usize,

    /// Pixel connectivity (4 or 8).
    #[arg(long, default_value_t = u32::from(PipelineConfig::DEFAULT_CONNECTIVITY.degree()))]
    connectivity: u32,

    /// Color space for distances (RGB, HSV, LAB). Unknown names use RGB.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_COLOR_SPACE.to_string())]
    color_space: String,

    /// Working resolution (max dimension in pixels after resizing).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_WORKING_RESOLUTION, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    working_resolution: u32,

    /// Resize filter; `disabled` keeps the decoded size.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    downsample_filter: Filter,

    /// Gaussian blur sigma applied before segmentation (0 disables).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BLUR_SIGMA)]
    blur_sigma: f32,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    #[arg(long)]
    config_json: Option<String>,

    /// Write the rendered segmentation as PNG.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write region summaries as CSV.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write region summaries as JSON.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write a plain-text processing report.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Convert region-graph edges to CSV: `INPUT.json OUTPUT.csv`.
    ///
    /// The input is a JSON array of `{"from", "to", "weight"}` objects.
    #[arg(long, num_args = 2, value_names = ["EDGES_JSON", "OUTPUT_CSV"])]
    mst_edges_csv: Option<Vec<PathBuf>>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    diagnostics_json: bool,
}

/// Resize filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Skip resizing regardless of image size.
    Disabled,
    /// Nearest-neighbor (keeps exact source colors).
    Nearest,
    /// Bilinear.
    Triangle,
    /// Bicubic Catmull-Rom.
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with 3 lobes.
    Lanczos3,
}

impl From<Filter> for DownsampleFilter {
    fn from(f: Filter) -> Self {
        match f {
            Filter::Disabled => Self::Disabled,
            Filter::Nearest => Self::Nearest,
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Gaussian => Self::Gaussian,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

const fn filter_from_pipeline(f: DownsampleFilter) -> Filter {
    match f {
        DownsampleFilter::Disabled => Filter::Disabled,
        DownsampleFilter::Nearest => Filter::Nearest,
        DownsampleFilter::Triangle => Filter::Triangle,
        DownsampleFilter::CatmullRom => Filter::CatmullRom,
        DownsampleFilter::Gaussian => Filter::Gaussian,
        DownsampleFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// Derived from [`PipelineConfig::DEFAULT_DOWNSAMPLE_FILTER`] so the two
/// cannot drift apart.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(PipelineConfig::DEFAULT_DOWNSAMPLE_FILTER);

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// `--config-json` wins over the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        PipelineConfig {
            color_threshold: cli.color_threshold,
            min_region_size: cli.min_region_size,
            connectivity: Connectivity::try_from(cli.connectivity).map_err(|e| e.to_string())?,
            color_space: ColorSpace::from_name(&cli.color_space),
            working_resolution: cli.working_resolution,
            downsample_filter: cli.downsample_filter.into(),
            blur_sigma: cli.blur_sigma,
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            log::error!("{msg}");
            ExitCode::FAILURE
        }
    }
}

/// Word a pipeline failure by whether different input could fix it.
fn pipeline_error_message(err: &SegmentError) -> String {
    if err.is_user_error() {
        format!("Pipeline error: {err}")
    } else {
        format!("Internal pipeline error (please report this): {err}")
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;

    let image_bytes = std::fs::read(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;

    log::info!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    log::info!(
        "Config: threshold={} min_size={} {} {} resize={}@{} blur={}",
        config.color_threshold,
        config.min_region_size,
        config.connectivity,
        config.color_space,
        config.downsample_filter,
        config.working_resolution,
        config.blur_sigma,
    );

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            log::info!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (result, diagnostics) = tessera_pipeline::diagnostics::process_with_diagnostics(
            &image_bytes,
            &config,
            &StdClock,
        )
        .map_err(|e| pipeline_error_message(&e))?;

        if cli.diagnostics_json {
            let json = serde_json::to_string_pretty(&diagnostics)
                .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
            println!("{json}");
        } else {
            println!("{}", diagnostics.report());
        }

        // Outputs come from the first run only.
        if run == 0 {
            write_outputs(cli, &config, &result, diagnostics.total_duration)?;
        }

        all_diagnostics.push(diagnostics);
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    Ok(())
}

/// Write every requested output file.
fn write_outputs(
    cli: &Cli,
    config: &PipelineConfig,
    result: &ProcessResult,
    elapsed: Duration,
) -> Result<(), String> {
    if let Some(ref path) = cli.output {
        let png = tessera_export::to_png(&result.rendered).map_err(|e| e.to_string())?;
        write_file(path, &png, "segmented image")?;
    }

    if let Some(ref path) = cli.csv {
        let csv = tessera_export::regions_to_csv(&result.regions);
        write_file(path, csv.as_bytes(), "region CSV")?;
    }

    if let Some(ref path) = cli.json {
        let json = tessera_export::regions_to_json(&result.regions).map_err(|e| e.to_string())?;
        write_file(path, json.as_bytes(), "region JSON")?;
    }

    if let Some(ref path) = cli.report {
        let title = cli.image_path.file_name().and_then(|s| s.to_str());
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| format!("{} (unix seconds)", d.as_secs()))
            .ok();
        let params = config.segment_params();
        let report = tessera_export::processing_report(
            &ReportInput {
                dimensions: result.dimensions,
                region_count: result.regions.len(),
                processing_time: elapsed,
                params: &params,
            },
            &ReportMetadata {
                title,
                timestamp: timestamp.as_deref(),
            },
        );
        write_file(path, report.as_bytes(), "processing report")?;
    }

    if let Some([input, output]) = cli.mst_edges_csv.as_deref() {
        let text = std::fs::read_to_string(input)
            .map_err(|e| format!("Error reading {}: {e}", input.display()))?;
        let edges: Vec<RegionEdge> = serde_json::from_str(&text)
            .map_err(|e| format!("Error parsing edges in {}: {e}", input.display()))?;
        let csv = tessera_export::mst_edges_to_csv(&edges);
        write_file(output, csv.as_bytes(), "edge CSV")?;
    }

    Ok(())
}

fn write_file(path: &Path, bytes: &[u8], what: &str) -> Result<(), String> {
    std::fs::write(path, bytes)
        .map_err(|e| format!("Error writing {what} to {}: {e}", path.display()))?;
    log::info!(
        "{what} written to {} ({} bytes)",
        path.display(),
        bytes.len()
    );
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        return;
    }
    let runs = all_diagnostics.len() as f64;

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();
    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / runs;
    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<12} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(28));

    let stage_count = all_diagnostics[0].stages().len();
    for i in 0..stage_count {
        let name = all_diagnostics[0].stages()[i].0;
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| d.stages()[i].1.duration.as_secs_f64() * 1000.0)
            .sum::<f64>()
            / runs;
        println!("{name:<12} {stage_mean:>10.3}ms");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tessera").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn pipeline_errors_name_their_kind() {
        let bad_input = pipeline_error_message(&SegmentError::EmptyInput);
        assert!(bad_input.starts_with("Pipeline error:"), "{bad_input}");

        let internal =
            pipeline_error_message(&SegmentError::IndexOutOfRange { index: 9, len: 4 });
        assert!(internal.starts_with("Internal pipeline error"), "{internal}");
    }

    #[test]
    fn huge_blur_sigma_is_rejected() {
        let cli = parse(&["in.png", "--blur-sigma", "1e30"]);
        let err = config_from_cli(&cli).unwrap_err();
        assert!(err.contains("blur_sigma"), "{err}");
    }

    #[test]
    fn defaults_match_pipeline_defaults() {
        let cli = parse(&["in.png"]);
        assert_eq!(config_from_cli(&cli).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn flags_build_config() {
        let cli = parse(&[
            "in.png",
            "--color-threshold",
            "12.5",
            "--min-region-size",
            "3",
            "--connectivity",
            "4",
            "--color-space",
            "hsv",
            "--downsample-filter",
            "lanczos3",
            "--blur-sigma",
            "1.5",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.color_threshold - 12.5).abs() < f64::EPSILON);
        assert_eq!(config.min_region_size, 3);
        assert_eq!(config.connectivity, Connectivity::Four);
        assert_eq!(config.color_space, ColorSpace::Hsv);
        assert_eq!(config.downsample_filter, DownsampleFilter::Lanczos3);
    }

    #[test]
    fn unknown_color_space_falls_back_to_rgb() {
        let cli = parse(&["in.png", "--color-space", "cmyk"]);
        assert_eq!(config_from_cli(&cli).unwrap().color_space, ColorSpace::Rgb);
    }

    #[test]
    fn bad_connectivity_is_an_error() {
        let cli = parse(&["in.png", "--connectivity", "6"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("connectivity"));
    }

    #[test]
    fn negative_threshold_is_an_error() {
        let cli = parse(&["in.png", "--color-threshold=-1"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("color_threshold"));
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&[
            "in.png",
            "--min-region-size",
            "999",
            "--config-json",
            r#"{"min_region_size": 7, "color_space": "LAB"}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.min_region_size, 7);
        assert_eq!(config.color_space, ColorSpace::Lab);
    }

    #[test]
    fn edge_csv_takes_two_paths() {
        let cli = parse(&["in.png", "--mst-edges-csv", "e.json", "e.csv"]);
        assert_eq!(
            cli.mst_edges_csv.unwrap(),
            vec![PathBuf::from("e.json"), PathBuf::from("e.csv")]
        );
    }
}
