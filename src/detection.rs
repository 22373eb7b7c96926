//! Accepted detections and the per-frame detection set.

use crate::geometry::BoundingBox;
use std::sync::Arc;

/// One accepted object instance in destination image pixel space.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Class index into the label vocabulary.
    pub class_id: usize,
    /// Class name, shared with the vocabulary.
    pub label: Arc<str>,
    /// Winning class score, in `(0, 1]`.
    pub confidence: f32,
    /// Box with `right > left` and `bottom > top`.
    pub bbox: BoundingBox,
}

impl Detection {
    /// Returns a copy with `bbox` replaced.
    pub fn with_bbox(&self, bbox: BoundingBox) -> Self {
        Self {
            bbox,
            ..self.clone()
        }
    }
}

/// Ordered output of one pipeline run, highest confidence first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    /// Wraps detections that are already sorted and capped.
    pub(crate) fn from_sorted(detections: Vec<Detection>) -> Self {
        debug_assert!(detections
            .windows(2)
            .all(|pair| pair[0].confidence >= pair[1].confidence));
        Self { detections }
    }

    /// An empty set: the ordinary "nothing detected" outcome.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.detections
    }

    pub fn into_vec(self) -> Vec<Detection> {
        self.detections
    }

    /// Returns class ids sorted ascending, the set's label multiset.
    pub fn label_multiset(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.detections.iter().map(|d| d.class_id).collect();
        ids.sort_unstable();
        ids
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}

impl IntoIterator for DetectionSet {
    type Item = Detection;
    type IntoIter = std::vec::IntoIter<Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.into_iter()
    }
}
