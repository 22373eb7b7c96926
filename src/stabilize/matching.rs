//! Label-based pairing of current and previous detections.

use crate::detection::Detection;

fn center_distance_sq(a: &Detection, b: &Detection) -> f32 {
    let (ax, ay) = a.bbox.center();
    let (bx, by) = b.bbox.center();
    let (dx, dy) = (ax - bx, ay - by);
    dx * dx + dy * dy
}

/// Pairs each current detection with a previous detection of the same label.
///
/// Current detections are visited in order (highest confidence first); each
/// claims the nearest unclaimed previous detection by box center, lowest
/// index on ties. Pairing is one-to-one, so two same-label objects never
/// share a smoothing target.
pub(crate) fn pair_by_label(current: &[Detection], previous: &[Detection]) -> Vec<Option<usize>> {
    let mut claimed = vec![false; previous.len()];
    current
        .iter()
        .map(|det| {
            let mut best: Option<(usize, f32)> = None;
            for (idx, prev) in previous.iter().enumerate() {
                if claimed[idx] || prev.class_id != det.class_id {
                    continue;
                }
                let dist = center_distance_sq(det, prev);
                if best.map_or(true, |(_, best_dist)| dist < best_dist) {
                    best = Some((idx, dist));
                }
            }
            let (idx, _) = best?;
            claimed[idx] = true;
            Some(idx)
        })
        .collect()
}
