//! Submission pipeline: persist, detect, summarize, look up.

use super::metrics::{record_detection, record_error, record_inference, record_upload};
use super::state::ServerState;
use crate::detection::{summarize, DetectedItem, Detection, DetectionError};
use crate::knowledge::{lookup, LookupResult};
use axum::{
    extract::multipart::{Multipart, MultipartError},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Where a submission came from. Decides the multipart field, the stored name
/// and the form a rejected submission is sent back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSource {
    File,
    Camera,
}

impl UploadSource {
    pub fn field_name(&self) -> &'static str {
        match self {
            UploadSource::File => "file",
            UploadSource::Camera => "camera_image",
        }
    }

    pub fn form_path(&self) -> &'static str {
        match self {
            UploadSource::File => "/upload",
            UploadSource::Camera => "/camera",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UploadSource::File => "file",
            UploadSource::Camera => "camera",
        }
    }

    /// Camera captures are always stored as `camera.jpg`.
    fn stored_name<'a>(&self, original_name: &'a str) -> &'a str {
        match self {
            UploadSource::File => original_name,
            UploadSource::Camera => "camera.jpg",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("No image submitted")]
    MissingUpload(UploadSource),

    #[error("Malformed form data: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Failed to store image: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Detection failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProcessError {
    fn kind(&self) -> &'static str {
        match self {
            ProcessError::MissingUpload(_) => "missing_upload",
            ProcessError::Multipart(_) => "multipart",
            ProcessError::UnsupportedMedia(_) => "unsupported_media",
            ProcessError::Storage(_) => "storage",
            ProcessError::Detection(_) => "detection",
            ProcessError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ProcessError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProcessError::MissingUpload(source) => {
                debug!("No image in submission, back to {}", source.form_path());
                return Redirect::to(source.form_path()).into_response();
            }
            ProcessError::Multipart(e) => e.status(),
            ProcessError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ProcessError::Storage(_) | ProcessError::Detection(_) | ProcessError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!("Failed to process submission: {}", self);
        } else {
            warn!("Rejected submission: {}", self);
        }
        record_error(self.kind(), "process");
        (status, self.to_string()).into_response()
    }
}

/// An image as received from the client.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Reads the image field of `source` from the form. Other fields are skipped.
///
/// A missing field, a missing file name or an empty body count as no submission.
pub async fn read_upload(
    multipart: &mut Multipart,
    source: UploadSource,
) -> Result<Upload, ProcessError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(source.field_name()) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        if file_name.is_empty() || data.is_empty() {
            return Err(ProcessError::MissingUpload(source));
        }
        return Ok(Upload {
            file_name,
            data: data.to_vec(),
        });
    }
    Err(ProcessError::MissingUpload(source))
}

/// Everything the result view shows.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    /// Name of the stored image inside the uploads directory.
    pub image_name: String,
    pub detected_items: Vec<DetectedItem>,
    pub detections: Vec<Detection>,
    #[serde(flatten)]
    pub lookup: LookupResult,
}

impl ProcessOutcome {
    pub fn image_url(&self) -> String {
        format!("/uploads/{}", self.image_name)
    }
}

fn ensure_image(data: &[u8]) -> Result<(), ProcessError> {
    match infer::get(data) {
        Some(kind) if matches!(kind.matcher_type(), infer::MatcherType::Image) => Ok(()),
        Some(kind) => Err(ProcessError::UnsupportedMedia(kind.mime_type().to_string())),
        None => Err(ProcessError::UnsupportedMedia("unknown".to_string())),
    }
}

pub async fn process_upload(
    state: &ServerState,
    source: UploadSource,
    upload: Upload,
) -> Result<ProcessOutcome, ProcessError> {
    ensure_image(&upload.data)?;

    let stored = state
        .image_storage
        .save(source.stored_name(&upload.file_name), &upload.data)
        .await?;
    record_upload(source.label());
    info!(
        "Stored {} submission as {} ({} bytes)",
        source.label(),
        stored.name,
        upload.data.len()
    );

    let detector = state.detector.clone();
    let image_path = stored.path.clone();
    let start = Instant::now();
    let detections = tokio::task::spawn_blocking(move || detector.detect(&image_path))
        .await
        .map_err(|e| ProcessError::Internal(e.to_string()))??;
    record_inference(start.elapsed());

    for detection in &detections {
        record_detection(&detection.class_name);
    }
    let summary = summarize(&detections);
    info!(
        "{} detections in {} classes for {}",
        detections.len(),
        summary.len(),
        stored.name
    );

    let store = state.knowledge_store.clone();
    let class_names = summary.class_names();
    let lookup_result = tokio::task::spawn_blocking(move || lookup(store.as_ref(), &class_names))
        .await
        .map_err(|e| ProcessError::Internal(e.to_string()))?;

    Ok(ProcessOutcome {
        image_name: stored.name,
        detected_items: summary.detected_items(),
        detections,
        lookup: lookup_result,
    })
}
