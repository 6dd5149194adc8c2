use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recycle_lens::config::DetectorSettings;
use recycle_lens::detection::{build_detector, summarize, YoloParams};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Runs the detector on a single image and prints what it finds.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Image to analyze.
    #[clap(value_parser = parse_path)]
    pub image: PathBuf,

    /// ONNX model exported from a YOLOv8 detector.
    #[clap(long, value_parser = parse_path, default_value = "models/best.onnx")]
    pub model_path: PathBuf,

    /// Class names of the model, one per line, in class id order.
    #[clap(long, value_parser = parse_path, default_value = "models/labels.txt")]
    pub labels_path: PathBuf,

    #[clap(long, default_value_t = YoloParams::default().input_size)]
    pub input_size: u32,

    #[clap(long, default_value_t = YoloParams::default().confidence_threshold)]
    pub confidence_threshold: f32,

    #[clap(long, default_value_t = YoloParams::default().iou_threshold)]
    pub iou_threshold: f32,

    #[clap(long, default_value = "images")]
    pub input_name: String,

    #[clap(long, default_value = "output0")]
    pub output_name: String,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let settings = DetectorSettings {
        model_path: Some(cli_args.model_path),
        labels_path: Some(cli_args.labels_path),
        params: YoloParams {
            input_size: cli_args.input_size,
            confidence_threshold: cli_args.confidence_threshold,
            iou_threshold: cli_args.iou_threshold,
            ..Default::default()
        },
        input_name: cli_args.input_name,
        output_name: cli_args.output_name,
    };
    let detector = build_detector(&settings)?;
    let detections = detector.detect(&cli_args.image)?;

    println!("Detection Results:");
    for detection in &detections {
        println!(
            "Detected: {}, Confidence: {:.2}",
            detection.class_name, detection.confidence
        );
    }

    let summary = summarize(&detections);
    if summary.is_empty() {
        println!("No objects detected.");
    } else {
        println!("Summary:");
        for item in summary.detected_items() {
            println!("  {} x{} (max {})", item.item_name, item.count, item.confidence);
        }
    }
    Ok(())
}
