use super::yolo::{decode, to_input_tensor, YoloParams};
use super::{load_image, load_labels, Detection, DetectionError, Detector};
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

fn model_error(e: ort::Error) -> DetectionError {
    DetectionError::Model(e.to_string())
}

/// YOLO detector running on ONNX Runtime.
pub struct OnnxDetector {
    // Running a session needs exclusive access.
    session: Mutex<Session>,
    labels: Vec<String>,
    params: YoloParams,
    input_name: String,
    output_name: String,
}

impl OnnxDetector {
    pub fn load(
        model_path: &Path,
        labels_path: &Path,
        params: YoloParams,
        input_name: impl Into<String>,
        output_name: impl Into<String>,
    ) -> Result<Self, DetectionError> {
        let labels = load_labels(labels_path)?;
        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|e| {
                DetectionError::Model(format!(
                    "Failed to load model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;
        info!(
            "Loaded detection model {:?} with {} classes, input size {}",
            model_path,
            labels.len(),
            params.input_size
        );

        Ok(Self {
            session: Mutex::new(session),
            labels,
            params,
            input_name: input_name.into(),
            output_name: output_name.into(),
        })
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, DetectionError> {
        let image = load_image(image_path)?;
        let size = self.params.input_size as usize;
        let input = Tensor::from_array((
            [1usize, 3, size, size],
            to_input_tensor(&image, self.params.input_size),
        ))
        .map_err(model_error)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Model("Detector session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(model_error)?;
        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            DetectionError::Model(format!("Model has no output named '{}'", self.output_name))
        })?;
        let (shape, data) = output.try_extract_tensor::<f32>().map_err(model_error)?;
        let shape: Vec<usize> = shape.iter().map(|&dim| dim as usize).collect();
        debug!("Detector output shape {:?} for {:?}", shape, image_path);

        decode(
            data,
            &shape,
            &self.labels,
            &self.params,
            (image.width(), image.height()),
        )
    }
}
