use super::Detection;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// All detections of one class within a single inference run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSummary {
    pub class_name: String,
    pub count: usize,
    pub max_confidence: f32,
}

/// [`ClassSummary`] ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedItem {
    pub item_name: String,
    pub count: usize,
    /// Max confidence as a percentage with two decimals, e.g. `"87.34%"`.
    pub confidence: String,
}

impl ClassSummary {
    pub fn format(&self) -> DetectedItem {
        DetectedItem {
            item_name: self.class_name.clone(),
            count: self.count,
            confidence: format_confidence(self.max_confidence),
        }
    }
}

pub fn format_confidence(confidence: f32) -> String {
    format!("{:.2}%", confidence as f64 * 100.0)
}

/// Per-class summaries in the order classes were first seen.
#[derive(Debug, Clone, Default)]
pub struct DetectionSummary {
    classes: Vec<ClassSummary>,
    index: HashMap<String, usize>,
}

impl DetectionSummary {
    fn record(&mut self, detection: &Detection) {
        match self.index.get(&detection.class_name) {
            Some(&position) => {
                let summary = &mut self.classes[position];
                summary.count += 1;
                if detection.confidence > summary.max_confidence {
                    summary.max_confidence = detection.confidence;
                }
            }
            None => {
                self.index
                    .insert(detection.class_name.clone(), self.classes.len());
                self.classes.push(ClassSummary {
                    class_name: detection.class_name.clone(),
                    count: 1,
                    max_confidence: detection.confidence,
                });
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn get(&self, class_name: &str) -> Option<&ClassSummary> {
        self.index.get(class_name).map(|&i| &self.classes[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassSummary> {
        self.classes.iter()
    }

    pub fn class_names(&self) -> BTreeSet<String> {
        self.index.keys().cloned().collect()
    }

    pub fn detected_items(&self) -> Vec<DetectedItem> {
        self.classes.iter().map(ClassSummary::format).collect()
    }
}

/// Folds detections into one [`ClassSummary`] per class.
pub fn summarize(detections: &[Detection]) -> DetectionSummary {
    let mut summary = DetectionSummary::default();
    for detection in detections {
        summary.record(detection);
    }
    summary
}
