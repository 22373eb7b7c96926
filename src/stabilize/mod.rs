//! Inter-frame box smoothing for streaming mode.
//!
//! The stabilizer owns exactly one piece of state: the previous frame's
//! detection set. When the current frame carries the same labels, each box is
//! blended toward its previous position; any change in labels passes the
//! current frame through untouched so identity changes show up immediately.

mod matching;

use crate::detection::{Detection, DetectionSet};
use crate::geometry::BoundingBox;
use crate::util::math::lerp;

/// Exponential box smoother keyed on label-set equality.
#[derive(Clone, Debug)]
pub struct TemporalStabilizer {
    alpha: f32,
    previous: Option<DetectionSet>,
    smoothed_last: bool,
}

impl TemporalStabilizer {
    /// Creates a stabilizer; `alpha` is the weight of the current frame.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            previous: None,
            smoothed_last: false,
        }
    }

    /// Returns the smoothing factor.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Returns the stored previous set.
    pub fn previous(&self) -> Option<&DetectionSet> {
        self.previous.as_ref()
    }

    /// Returns true when the last call blended at least one box.
    pub fn smoothed_last(&self) -> bool {
        self.smoothed_last
    }

    /// Forgets the previous set.
    pub fn reset(&mut self) {
        self.previous = None;
        self.smoothed_last = false;
    }

    /// Smooths `current` against the previous frame and stores the result as
    /// the new previous frame.
    pub fn stabilize(&mut self, current: DetectionSet) -> DetectionSet {
        let output = match self.previous.as_ref() {
            Some(previous)
                if !current.is_empty() && current.label_multiset() == previous.label_multiset() =>
            {
                self.smoothed_last = true;
                self.blend(&current, previous)
            }
            _ => {
                self.smoothed_last = false;
                current
            }
        };
        self.previous = Some(output.clone());
        output
    }

    fn blend(&self, current: &DetectionSet, previous: &DetectionSet) -> DetectionSet {
        let pairs = matching::pair_by_label(current.as_slice(), previous.as_slice());
        let blended: Vec<Detection> = current
            .iter()
            .zip(pairs)
            .map(|(det, pair)| match pair {
                Some(idx) => det.with_bbox(blend_box(
                    &previous.as_slice()[idx].bbox,
                    &det.bbox,
                    self.alpha,
                )),
                None => det.clone(),
            })
            .collect();
        // Confidences are untouched, so the order still holds.
        DetectionSet::from_sorted(blended)
    }
}

fn blend_box(previous: &BoundingBox, current: &BoundingBox, alpha: f32) -> BoundingBox {
    BoundingBox::new(
        lerp(previous.left, current.left, alpha),
        lerp(previous.top, current.top, alpha),
        lerp(previous.right, current.right, alpha),
        lerp(previous.bottom, current.bottom, alpha),
    )
}
