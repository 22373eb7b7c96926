//! Per-frame counters for offline threshold tuning.

use crate::gate::GateTally;
use crate::geometry::CoordinateSystem;

/// Counts of what each stage kept and dropped in one frame.
///
/// This is a diagnostic side channel; detections never depend on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Anchors in the output tensor.
    pub total_anchors: usize,
    /// Confidence gate counts (candidates with a nonzero best score).
    pub gate: GateTally,
    /// Gated candidates dropped by the geometry checks.
    pub rejected_by_geometry: usize,
    /// Detections entering NMS.
    pub accepted_pre_nms: usize,
    /// Detections returned after NMS and the cap.
    pub accepted_post_nms: usize,
    /// Encoding chosen for this frame's boxes; `None` when no candidate
    /// passed the confidence gate.
    pub coordinate_system: Option<CoordinateSystem>,
    /// Whether the stabilizer blended this frame (streaming only).
    pub smoothed: bool,
}

impl FrameStats {
    /// Candidates rejected by the per-class floor.
    pub fn rejected_by_floor(&self) -> usize {
        self.gate.rejected_by_floor
    }

    /// Candidates rejected by the ambiguity gap.
    pub fn rejected_by_gap(&self) -> usize {
        self.gate.rejected_by_gap
    }
}

/// Running totals across frames of a streaming session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionTotals {
    /// Frames that ran the pipeline.
    pub frames: u64,
    /// Frames skipped because the cadence interval had not elapsed.
    pub skipped_too_soon: u64,
    /// Frames skipped because a previous frame was still in flight.
    pub skipped_in_flight: u64,
    /// Frames where the stabilizer blended boxes.
    pub smoothed_frames: u64,
    pub candidates: u64,
    pub rejected_by_floor: u64,
    pub rejected_by_gap: u64,
    pub rejected_by_geometry: u64,
    pub accepted_pre_nms: u64,
    pub accepted_post_nms: u64,
}

impl SessionTotals {
    pub(crate) fn absorb(&mut self, stats: &FrameStats) {
        self.frames += 1;
        self.smoothed_frames += u64::from(stats.smoothed);
        self.candidates += stats.gate.total as u64;
        self.rejected_by_floor += stats.gate.rejected_by_floor as u64;
        self.rejected_by_gap += stats.gate.rejected_by_gap as u64;
        self.rejected_by_geometry += stats.rejected_by_geometry as u64;
        self.accepted_pre_nms += stats.accepted_pre_nms as u64;
        self.accepted_post_nms += stats.accepted_post_nms as u64;
    }
}
