//! Greedy IoU non-maximum suppression over detections.

use crate::detection::Detection;
use std::cmp::Ordering;

fn detection_cmp_desc(a: &Detection, b: &Detection) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.class_id.cmp(&b.class_id))
        .then_with(|| a.bbox.top.total_cmp(&b.bbox.top))
        .then_with(|| a.bbox.left.total_cmp(&b.bbox.left))
}

/// Sorts detections by descending confidence with deterministic tie-breaking.
pub(crate) fn sort_detections_desc(detections: &mut [Detection]) {
    detections.sort_by(detection_cmp_desc);
}

/// Applies class-agnostic greedy NMS and keeps at most `max_detections`.
///
/// Detections are sorted by descending confidence; each kept detection
/// suppresses every later one whose IoU with it exceeds `iou_threshold`.
pub fn nms_boxes(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    sort_detections_desc(&mut detections);

    let mut kept: Vec<Detection> = Vec::with_capacity(max_detections.min(detections.len()));
    'outer: for detection in detections {
        if kept.len() == max_detections {
            break;
        }
        for kept_detection in kept.iter() {
            if kept_detection.bbox.iou(&detection.bbox) > iou_threshold {
                continue 'outer;
            }
        }
        kept.push(detection);
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::nms_boxes;
    use crate::detection::Detection;
    use crate::geometry::BoundingBox;
    use std::sync::Arc;

    fn det(class_id: usize, confidence: f32, left: f32) -> Detection {
        Detection {
            class_id,
            label: Arc::from(format!("class{class_id}")),
            confidence,
            bbox: BoundingBox::new(left, 0.0, left + 100.0, 100.0),
        }
    }

    #[test]
    fn suppresses_overlapping_lower_confidence_boxes() {
        let kept = nms_boxes(vec![det(0, 0.55, 25.0), det(0, 0.80, 0.0)], 0.45, 5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.80);
    }

    #[test]
    fn suppression_ignores_class() {
        let kept = nms_boxes(vec![det(0, 0.9, 0.0), det(1, 0.7, 10.0)], 0.45, 5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].class_id, 0);
    }

    #[test]
    fn overlap_at_threshold_is_kept() {
        // IoU exactly 0.6 with threshold 0.6 does not exceed it.
        let kept = nms_boxes(vec![det(0, 0.9, 0.0), det(0, 0.8, 25.0)], 0.6, 5);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn output_is_capped_and_sorted() {
        let input = (0..8).map(|i| det(0, 0.1 * (i + 1) as f32, i as f32 * 200.0)).collect();
        let kept = nms_boxes(input, 0.45, 5);
        assert_eq!(kept.len(), 5);
        assert!(kept.windows(2).all(|p| p[0].confidence >= p[1].confidence));
        assert!((kept[0].confidence - 0.8).abs() < 1e-6);
    }
}
