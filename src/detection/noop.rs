use super::{load_image, Detection, DetectionError, Detector};
use std::path::Path;

/// Detector that never finds anything. Used when the crate is built without a
/// model runtime, it still checks that submitted images decode.
#[derive(Default)]
pub struct NoOpDetector;

impl Detector for NoOpDetector {
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, DetectionError> {
        load_image(image_path)?;
        Ok(vec![])
    }
}
