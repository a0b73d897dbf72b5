use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pitch_overlay::{run_batch, DnnDetector, DnnDetectorConfig, OverlayConfig, TracingSink};

/// Generate pitching overlays from a pitching sequence.
#[derive(Debug, Parser)]
#[command(version)]
struct Opts {
    /// Root directory containing one subdirectory per pitching sequence
    #[arg(short, long, default_value = "videos")]
    input_directory: PathBuf,

    /// Location of the ball-detection model (ONNX)
    #[arg(short, long)]
    model: PathBuf,

    /// Network input size
    #[arg(long, default_value_t = 416)]
    size: i32,

    /// IoU suppression threshold
    #[arg(long, default_value_t = 0.45)]
    iou: f32,

    /// Minimum detection confidence
    #[arg(long, default_value_t = 0.5)]
    score: f32,

    /// Minimum fraction of frames with an accepted detection per pitch
    #[arg(long, default_value_t = 0.2)]
    min_detections: f32,

    /// Write per-pitch `.dets` sidecars with the raw candidates
    #[arg(long)]
    dump_detections: bool,

    /// -v for per-pitch detail, -vv for per-frame detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let default_level = match opts.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let detector = DnnDetector::new(&opts.model, DnnDetectorConfig::new(opts.size))
        .with_context(|| format!("loading detection model {}", opts.model.display()))?;
    let detector = Mutex::new(detector);

    let config = OverlayConfig {
        score_threshold: opts.score,
        iou_threshold: opts.iou,
        min_detection_ratio: opts.min_detections,
        dump_detections: opts.dump_detections,
    };

    let sink = TracingSink;

    let summary = run_batch(&opts.input_directory, &detector, &config, &sink)
        .with_context(|| format!("reading input root {}", opts.input_directory.display()))?;

    tracing::info!(
        "batch complete: {} written, {} already present, {} failed",
        summary.written,
        summary.skipped,
        summary.failed
    );

    Ok(())
}
