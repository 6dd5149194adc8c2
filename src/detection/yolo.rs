//! Pre and post processing for YOLOv8-style detection models.
//!
//! The model takes a `[1, 3, S, S]` RGB tensor with values in `[0, 1]` and produces
//! a `[1, 4 + classes, anchors]` tensor: for every anchor a box `(cx, cy, w, h)` in
//! input pixels followed by one score per class.

use super::{Detection, DetectionError};
use image::imageops::FilterType;
use image::DynamicImage;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct YoloParams {
    /// Side of the square model input.
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

/// Axis-aligned box, corners in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Stretches `image` to the model input size and lays it out as CHW floats.
pub fn to_input_tensor(image: &DynamicImage, input_size: u32) -> Vec<f32> {
    let rgb = image
        .resize_exact(input_size, input_size, FilterType::Triangle)
        .to_rgb8();
    let plane = (input_size * input_size) as usize;
    let mut data = vec![0f32; 3 * plane];
    for (i, pixel) in rgb.pixels().enumerate() {
        data[i] = pixel[0] as f32 / 255.0;
        data[plane + i] = pixel[1] as f32 / 255.0;
        data[2 * plane + i] = pixel[2] as f32 / 255.0;
    }
    data
}

struct Candidate {
    class_id: usize,
    confidence: f32,
    bbox: BoundingBox,
}

/// Turns the raw output tensor into detections in source image pixels.
///
/// `source_size` is `(width, height)` of the image before resizing.
pub fn decode(
    output: &[f32],
    shape: &[usize],
    labels: &[String],
    params: &YoloParams,
    source_size: (u32, u32),
) -> Result<Vec<Detection>, DetectionError> {
    let (features, anchors) = match shape {
        [1, features, anchors] => (*features, *anchors),
        _ => {
            return Err(DetectionError::Model(format!(
                "Unexpected output shape {:?}, expected [1, 4 + classes, anchors]",
                shape
            )))
        }
    };
    if features != 4 + labels.len() {
        return Err(DetectionError::Model(format!(
            "Model reports {} classes but {} labels are loaded",
            features.saturating_sub(4),
            labels.len()
        )));
    }
    if output.len() != features * anchors {
        return Err(DetectionError::Model(format!(
            "Output holds {} values, shape {:?} needs {}",
            output.len(),
            shape,
            features * anchors
        )));
    }

    let scale_x = source_size.0 as f32 / params.input_size as f32;
    let scale_y = source_size.1 as f32 / params.input_size as f32;
    let max_x = source_size.0 as f32;
    let max_y = source_size.1 as f32;
    let at = |feature: usize, anchor: usize| output[feature * anchors + anchor];

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let mut class_id = 0;
        let mut confidence = f32::NEG_INFINITY;
        for class in 0..labels.len() {
            let score = at(4 + class, anchor);
            if score > confidence {
                confidence = score;
                class_id = class;
            }
        }
        if !confidence.is_finite() || confidence < params.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        let bbox = BoundingBox {
            x1: ((cx - w / 2.0) * scale_x).clamp(0.0, max_x),
            y1: ((cy - h / 2.0) * scale_y).clamp(0.0, max_y),
            x2: ((cx + w / 2.0) * scale_x).clamp(0.0, max_x),
            y2: ((cy + h / 2.0) * scale_y).clamp(0.0, max_y),
        };
        candidates.push(Candidate {
            class_id,
            confidence: confidence.min(1.0),
            bbox,
        });
    }

    Ok(non_max_suppression(candidates, params)
        .into_iter()
        .map(|c| Detection {
            class_name: labels[c.class_id].clone(),
            confidence: c.confidence,
            bbox: Some(c.bbox),
        })
        .collect())
}

/// Greedy class-wise NMS, highest confidence first.
fn non_max_suppression(mut candidates: Vec<Candidate>, params: &YoloParams) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.len() >= params.max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > params.iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn labels() -> Vec<String> {
        vec!["bottle".to_string(), "can".to_string()]
    }

    fn params() -> YoloParams {
        YoloParams {
            input_size: 100,
            confidence_threshold: 0.5,
            iou_threshold: 0.5,
            max_detections: 10,
        }
    }

    /// Builds a `[1, 6, anchors]` output from per-anchor rows `[cx, cy, w, h, s0, s1]`.
    fn output(rows: &[[f32; 6]]) -> (Vec<f32>, Vec<usize>) {
        let anchors = rows.len();
        let mut data = vec![0f32; 6 * anchors];
        for (anchor, row) in rows.iter().enumerate() {
            for (feature, value) in row.iter().enumerate() {
                data[feature * anchors + anchor] = *value;
            }
        }
        (data, vec![1, 6, anchors])
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BoundingBox { x1: 0.0, y1: 0.0, x2: 10.0, y2: 10.0 };
        let b = BoundingBox { x1: 20.0, y1: 20.0, x2: 30.0, y2: 30.0 };
        let half = BoundingBox { x1: 5.0, y1: 0.0, x2: 15.0, y2: 10.0 };
        assert_eq!(a.iou(&a), 1.0);
        assert_eq!(a.iou(&b), 0.0);
        assert!((a.iou(&half) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn picks_best_class_and_drops_low_scores() {
        let (data, shape) = output(&[
            [50.0, 50.0, 20.0, 20.0, 0.2, 0.9],
            [10.0, 10.0, 4.0, 4.0, 0.3, 0.1],
        ]);

        let detections = decode(&data, &shape, &labels(), &params(), (100, 100)).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_name, "can");
        assert!((detections[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn boxes_are_scaled_to_source_pixels() {
        let (data, shape) = output(&[[50.0, 50.0, 20.0, 40.0, 0.8, 0.0]]);

        let detections = decode(&data, &shape, &labels(), &params(), (200, 50)).unwrap();

        let bbox = detections[0].bbox.unwrap();
        assert_eq!(bbox, BoundingBox { x1: 80.0, y1: 15.0, x2: 120.0, y2: 35.0 });
    }

    #[test]
    fn boxes_are_clamped_to_the_image() {
        let (data, shape) = output(&[[2.0, 98.0, 10.0, 10.0, 0.8, 0.0]]);

        let detections = decode(&data, &shape, &labels(), &params(), (100, 100)).unwrap();

        let bbox = detections[0].bbox.unwrap();
        assert_eq!(bbox.x1, 0.0);
        assert_eq!(bbox.y2, 100.0);
    }

    #[test]
    fn overlapping_boxes_of_same_class_are_suppressed() {
        let (data, shape) = output(&[
            [50.0, 50.0, 20.0, 20.0, 0.7, 0.0],
            [51.0, 50.0, 20.0, 20.0, 0.9, 0.0],
            [51.0, 50.0, 20.0, 20.0, 0.0, 0.6],
            [10.0, 10.0, 5.0, 5.0, 0.55, 0.0],
        ]);

        let detections = decode(&data, &shape, &labels(), &params(), (100, 100)).unwrap();

        let summary: Vec<(&str, f32)> = detections
            .iter()
            .map(|d| (d.class_name.as_str(), d.confidence))
            .collect();
        assert_eq!(summary, vec![("bottle", 0.9), ("can", 0.6), ("bottle", 0.55)]);
    }

    #[test]
    fn detections_are_capped() {
        let rows: Vec<[f32; 6]> = (0..5)
            .map(|i| [10.0 + 15.0 * i as f32, 10.0, 5.0, 5.0, 0.9, 0.0])
            .collect();
        let (data, shape) = output(&rows);
        let params = YoloParams {
            max_detections: 3,
            ..params()
        };

        let detections = decode(&data, &shape, &labels(), &params, (100, 100)).unwrap();
        assert_eq!(detections.len(), 3);
    }

    #[test]
    fn label_count_must_match_the_model() {
        let (data, shape) = output(&[[50.0, 50.0, 20.0, 20.0, 0.8, 0.0]]);
        let three = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let result = decode(&data, &shape, &three, &params(), (100, 100));
        assert!(matches!(result, Err(DetectionError::Model(_))));
    }

    #[test]
    fn unexpected_shape_is_rejected() {
        let result = decode(&[0.0; 12], &[2, 6], &labels(), &params(), (100, 100));
        assert!(matches!(result, Err(DetectionError::Model(_))));
    }

    #[test]
    fn input_tensor_is_planar_rgb() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 0, 51])));

        let tensor = to_input_tensor(&image, 2);

        assert_eq!(tensor.len(), 12);
        let close = |values: &[f32], expected: f32| {
            values.iter().all(|v| (v - expected).abs() < 0.01)
        };
        assert!(close(&tensor[0..4], 1.0));
        assert!(close(&tensor[4..8], 0.0));
        assert!(close(&tensor[8..12], 0.2));
    }
}
