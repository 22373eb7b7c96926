//! Duplicate-box suppression and the output cap.

pub(crate) mod nms;

use crate::detection::Detection;

/// NMS stage with a fixed IoU threshold and detection cap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Suppressor {
    iou_threshold: f32,
    max_detections: usize,
}

impl Suppressor {
    pub fn new(iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            iou_threshold,
            max_detections,
        }
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    pub fn max_detections(&self) -> usize {
        self.max_detections
    }

    /// Suppresses overlaps and truncates; output is sorted by confidence.
    pub fn apply(&self, detections: Vec<Detection>) -> Vec<Detection> {
        nms::nms_boxes(detections, self.iou_threshold, self.max_detections)
    }
}
