//! Pipeline, model and streaming configuration.

use crate::geometry::{GeometryLimits, ImageSize};
use crate::util::math::{is_positive, is_unit};
use crate::util::{DetectError, DetectResult};
use std::collections::BTreeMap;
use std::time::Duration;

/// Tuning knobs for the decode-and-stabilize pipeline.
///
/// Loaded once and immutable for the lifetime of a [`DetectionPipeline`].
///
/// [`DetectionPipeline`]: crate::DetectionPipeline
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Confidence floor for classes without an override.
    pub confidence_threshold: f32,
    /// Per-label confidence floors (label -> floor).
    pub class_thresholds: BTreeMap<String, f32>,
    /// Minimum margin between the best and runner-up class scores.
    pub min_confidence_gap: f32,
    /// Enables the ambiguity gap rule.
    pub gap_check: bool,
    /// IoU above which a lower-confidence box is suppressed.
    pub nms_iou_threshold: f32,
    /// Minimum box width/height as a fraction of the image.
    pub min_box_fraction: f32,
    /// Maximum box width/height as a fraction of the image.
    pub max_box_fraction: f32,
    /// Minimum box width/height in destination pixels.
    pub min_box_pixels: f32,
    /// Minimum width / height.
    pub min_aspect_ratio: f32,
    /// Maximum width / height.
    pub max_aspect_ratio: f32,
    /// Maximum detections returned per frame.
    pub max_detections: usize,
    /// Weight of the current frame when smoothing boxes.
    pub smoothing_alpha: f32,
    /// Upper bound on raw attributes for a frame to count as normalized.
    pub normalized_coord_bound: f32,
    /// Candidates sampled to decide the coordinate system.
    pub coord_sample_size: usize,
    /// Decode anchors in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            class_thresholds: BTreeMap::new(),
            min_confidence_gap: 0.15,
            gap_check: true,
            nms_iou_threshold: 0.45,
            min_box_fraction: 0.01,
            max_box_fraction: 0.95,
            min_box_pixels: 20.0,
            min_aspect_ratio: 0.1,
            max_aspect_ratio: 10.0,
            max_detections: 5,
            smoothing_alpha: 0.7,
            normalized_coord_bound: 1.5,
            coord_sample_size: 32,
            parallel: false,
        }
    }
}

impl PipelineConfig {
    /// Validates ranges; per-class labels are checked against the vocabulary
    /// when the pipeline is built.
    pub fn validate(&self) -> DetectResult<()> {
        if !is_unit(self.confidence_threshold) {
            return Err(DetectError::InvalidConfig(
                "confidence_threshold must be within [0, 1]",
            ));
        }
        if self.class_thresholds.values().any(|&v| !is_unit(v)) {
            return Err(DetectError::InvalidConfig(
                "class threshold overrides must be within [0, 1]",
            ));
        }
        if !is_unit(self.min_confidence_gap) {
            return Err(DetectError::InvalidConfig(
                "min_confidence_gap must be within [0, 1]",
            ));
        }
        if !is_unit(self.nms_iou_threshold) {
            return Err(DetectError::InvalidConfig(
                "nms_iou_threshold must be within [0, 1]",
            ));
        }
        if !is_unit(self.min_box_fraction)
            || !is_unit(self.max_box_fraction)
            || self.min_box_fraction > self.max_box_fraction
        {
            return Err(DetectError::InvalidConfig(
                "box fractions must satisfy 0 <= min <= max <= 1",
            ));
        }
        if !self.min_box_pixels.is_finite() || self.min_box_pixels < 0.0 {
            return Err(DetectError::InvalidConfig(
                "min_box_pixels must be finite and non-negative",
            ));
        }
        if !is_positive(self.min_aspect_ratio)
            || !is_positive(self.max_aspect_ratio)
            || self.min_aspect_ratio > self.max_aspect_ratio
        {
            return Err(DetectError::InvalidConfig(
                "aspect ratios must satisfy 0 < min <= max",
            ));
        }
        if self.max_detections == 0 {
            return Err(DetectError::InvalidConfig("max_detections must be >= 1"));
        }
        if !is_positive(self.smoothing_alpha) || self.smoothing_alpha > 1.0 {
            return Err(DetectError::InvalidConfig(
                "smoothing_alpha must be within (0, 1]",
            ));
        }
        if !is_positive(self.normalized_coord_bound) {
            return Err(DetectError::InvalidConfig(
                "normalized_coord_bound must be > 0",
            ));
        }
        if self.coord_sample_size == 0 {
            return Err(DetectError::InvalidConfig("coord_sample_size must be >= 1"));
        }
        Ok(())
    }

    pub(crate) fn geometry_limits(&self) -> GeometryLimits {
        GeometryLimits {
            min_box_fraction: self.min_box_fraction,
            max_box_fraction: self.max_box_fraction,
            min_box_pixels: self.min_box_pixels,
            min_aspect_ratio: self.min_aspect_ratio,
            max_aspect_ratio: self.max_aspect_ratio,
        }
    }
}

/// Static description of the detector model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSpec {
    /// Output tensor shape, `[1, attrs, anchors]` or `[1, anchors, attrs]`.
    pub output_shape: Vec<usize>,
    /// Model input tensor size, used to scale pixel-space boxes.
    pub input_size: ImageSize,
}

impl ModelSpec {
    pub fn new(output_shape: impl Into<Vec<usize>>, input_size: ImageSize) -> Self {
        Self {
            output_shape: output_shape.into(),
            input_size,
        }
    }
}

/// Streaming cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// Minimum time between the starts of two admitted frames.
    pub min_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(250),
        }
    }
}
