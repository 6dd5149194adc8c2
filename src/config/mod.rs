mod file_config;

pub use file_config::{DetectorConfig, FileConfig};

use crate::detection::YoloParams;
use crate::server::RequestsLoggingLevel;
use anyhow::{anyhow, bail, Result};
use byte_unit::Byte;
use clap::ValueEnum;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_UPLOAD_SIZE: &str = "20 MiB";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub max_upload_size: String,
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub input_name: String,
    pub output_name: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        let params = YoloParams::default();
        Self {
            db_path: PathBuf::from("data.db"),
            uploads_dir: PathBuf::from("static/uploads"),
            port: 5000,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE.to_string(),
            model_path: None,
            labels_path: None,
            input_size: params.input_size,
            confidence_threshold: params.confidence_threshold,
            iou_threshold: params.iou_threshold,
            max_detections: params.max_detections,
            input_name: "images".to_string(),
            output_name: "output0".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub max_upload_bytes: usize,
    pub detector: DetectorSettings,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub params: YoloParams,
    pub input_name: String,
    pub output_name: String,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.db_path.clone());
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        let db_dir = parent_dir(&db_path);
        if !db_dir.is_dir() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }

        let uploads_dir = file
            .uploads_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.uploads_dir.clone());
        if uploads_dir.exists() && !uploads_dir.is_dir() {
            bail!("uploads_dir is not a directory: {:?}", uploads_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port && port != 0 {
            bail!("port and metrics_port must differ, both are {}", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let max_upload_size = file
            .max_upload_size
            .unwrap_or_else(|| cli.max_upload_size.clone());
        let max_upload_bytes = parse_size(&max_upload_size)?;

        let detector_file = file.detector.unwrap_or_default();
        let params = YoloParams {
            input_size: detector_file.input_size.unwrap_or(cli.input_size),
            confidence_threshold: detector_file
                .confidence_threshold
                .unwrap_or(cli.confidence_threshold),
            iou_threshold: detector_file.iou_threshold.unwrap_or(cli.iou_threshold),
            max_detections: detector_file.max_detections.unwrap_or(cli.max_detections),
        };
        validate_params(&params)?;

        let detector = DetectorSettings {
            model_path: detector_file
                .model_path
                .map(PathBuf::from)
                .or_else(|| cli.model_path.clone()),
            labels_path: detector_file
                .labels_path
                .map(PathBuf::from)
                .or_else(|| cli.labels_path.clone()),
            params,
            input_name: detector_file
                .input_name
                .unwrap_or_else(|| cli.input_name.clone()),
            output_name: detector_file
                .output_name
                .unwrap_or_else(|| cli.output_name.clone()),
        };

        Ok(Self {
            db_path,
            uploads_dir,
            port,
            metrics_port,
            logging_level,
            max_upload_bytes,
            detector,
        })
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn parse_size(s: &str) -> Result<usize> {
    let bytes = Byte::parse_str(s, true)
        .map_err(|e| anyhow!("Invalid size '{}': {}", s, e))?
        .as_u64();
    if bytes == 0 {
        bail!("Size must be greater than zero: '{}'", s);
    }
    usize::try_from(bytes).map_err(|_| anyhow!("Size too large: '{}'", s))
}

fn validate_params(params: &YoloParams) -> Result<()> {
    if params.input_size == 0 {
        bail!("Detector input_size must be greater than zero");
    }
    if !(0.0..=1.0).contains(&params.confidence_threshold) {
        bail!(
            "Detector confidence_threshold must be within [0, 1], got {}",
            params.confidence_threshold
        );
    }
    if !(0.0..=1.0).contains(&params.iou_threshold) {
        bail!(
            "Detector iou_threshold must be within [0, 1], got {}",
            params.iou_threshold
        );
    }
    if params.max_detections == 0 {
        bail!("Detector max_detections must be greater than zero");
    }
    Ok(())
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
