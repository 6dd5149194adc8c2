//! Object detection: the detector seam, its implementations and the aggregation
//! of raw detections into per-class summaries.

mod noop;
#[cfg(feature = "onnx")]
mod onnx;
pub mod summary;
pub mod yolo;

pub use noop::NoOpDetector;
#[cfg(feature = "onnx")]
pub use onnx::OnnxDetector;
pub use summary::{format_confidence, summarize, ClassSummary, DetectedItem, DetectionSummary};
pub use yolo::{BoundingBox, YoloParams};

use crate::config::DetectorSettings;
use image::DynamicImage;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
#[cfg(not(feature = "onnx"))]
use tracing::warn;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Can not read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Can not decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Model failure: {0}")]
    Model(String),

    #[error("Invalid labels: {0}")]
    Labels(String),
}

/// A single object found in an image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub class_name: String,
    /// In `[0, 1]`.
    pub confidence: f32,
    /// In source image pixels, when the detector reports one.
    pub bbox: Option<BoundingBox>,
}

impl Detection {
    pub fn new(class_name: impl Into<String>, confidence: f32) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            bbox: None,
        }
    }
}

/// Image in, labeled detections out.
///
/// Implementations are loaded once and shared between requests.
pub trait Detector: Send + Sync {
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, DetectionError>;
}

/// Reads and decodes the image at `path`, the format is sniffed from its content.
pub fn load_image(path: &Path) -> Result<DynamicImage, DetectionError> {
    let bytes = std::fs::read(path)?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Reads a label file, one class name per line. Blank lines are skipped.
pub fn load_labels(path: &Path) -> Result<Vec<String>, DetectionError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| DetectionError::Labels(format!("{}: {}", path.display(), e)))?;
    let labels: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if labels.is_empty() {
        return Err(DetectionError::Labels(format!(
            "{} contains no class names",
            path.display()
        )));
    }
    Ok(labels)
}

/// Builds the detector described by `settings`.
#[cfg(feature = "onnx")]
pub fn build_detector(settings: &DetectorSettings) -> anyhow::Result<Arc<dyn Detector>> {
    let model_path = settings
        .model_path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("No detection model configured, set model_path"))?;
    let labels_path = settings
        .labels_path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("No label file configured, set labels_path"))?;
    let detector = OnnxDetector::load(
        model_path,
        labels_path,
        settings.params.clone(),
        settings.input_name.clone(),
        settings.output_name.clone(),
    )?;
    Ok(Arc::new(detector))
}

/// Builds the detector described by `settings`.
#[cfg(not(feature = "onnx"))]
pub fn build_detector(settings: &DetectorSettings) -> anyhow::Result<Arc<dyn Detector>> {
    if settings.model_path.is_some() {
        warn!("Built without the onnx feature, ignoring model {:?}", settings.model_path);
    }
    warn!("No model runtime available, every image will yield zero detections");
    Ok(Arc::new(NoOpDetector))
}
