//! Coordinate-system detection, scale-back and box sanity checks.
//!
//! Models emit center-format boxes either normalized to `[0, 1]` or in pixels
//! of the model input. The encoding is decided once per frame from a sample of
//! candidates, then every box is mapped into destination image pixels,
//! clamped, and checked for size and shape. Confidence alone does not remove
//! zero-area or wildly elongated anchors; these checks do.

use crate::candidate::Candidate;
use crate::detection::Detection;
use crate::geometry::{BoundingBox, ImageSize};
use crate::labels::LabelVocabulary;

/// Encoding of raw box attributes for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// Attributes are fractions of the input size.
    Normalized,
    /// Attributes are pixels of the model input tensor.
    Pixel,
}

/// Why a box failed the geometry checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryRejection {
    /// Non-finite, zero-area or inverted after clamping.
    Degenerate,
    /// Width or height fraction of the image is outside the allowed range.
    SizeFraction,
    /// Width or height in pixels is below the minimum.
    TooSmall,
    /// Width over height is outside the allowed range.
    AspectRatio,
}

/// Size and shape bounds a box must satisfy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryLimits {
    pub min_box_fraction: f32,
    pub max_box_fraction: f32,
    pub min_box_pixels: f32,
    pub min_aspect_ratio: f32,
    pub max_aspect_ratio: f32,
}

impl GeometryLimits {
    fn check(&self, bbox: &BoundingBox, image: ImageSize) -> Result<(), GeometryRejection> {
        let width = bbox.right - bbox.left;
        let height = bbox.bottom - bbox.top;
        if !(width > 0.0 && height > 0.0) {
            return Err(GeometryRejection::Degenerate);
        }

        let fraction_ok = |fraction: f32| {
            fraction >= self.min_box_fraction && fraction <= self.max_box_fraction
        };
        if !fraction_ok(width / image.width_f32()) || !fraction_ok(height / image.height_f32()) {
            return Err(GeometryRejection::SizeFraction);
        }
        if width < self.min_box_pixels || height < self.min_box_pixels {
            return Err(GeometryRejection::TooSmall);
        }
        let aspect = width / height;
        if aspect < self.min_aspect_ratio || aspect > self.max_aspect_ratio {
            return Err(GeometryRejection::AspectRatio);
        }
        Ok(())
    }
}

/// Maps raw candidate boxes into validated destination-image boxes.
#[derive(Clone, Debug)]
pub struct BoxNormalizer {
    limits: GeometryLimits,
    model_input: ImageSize,
    normalized_bound: f32,
    sample_size: usize,
}

impl BoxNormalizer {
    /// Creates a normalizer for a model with input size `model_input`.
    ///
    /// A frame is treated as normalized when every attribute of up to
    /// `sample_size` sampled candidates is at most `normalized_bound`.
    pub fn new(
        limits: GeometryLimits,
        model_input: ImageSize,
        normalized_bound: f32,
        sample_size: usize,
    ) -> Self {
        Self {
            limits,
            model_input,
            normalized_bound,
            sample_size: sample_size.max(1),
        }
    }

    /// Returns the configured limits.
    pub fn limits(&self) -> &GeometryLimits {
        &self.limits
    }

    /// Decides the frame's encoding from evenly spaced candidates.
    pub fn detect_coordinate_system(&self, candidates: &[Candidate]) -> CoordinateSystem {
        let stride = (candidates.len() / self.sample_size).max(1);
        let all_small = candidates
            .iter()
            .step_by(stride)
            .take(self.sample_size)
            .all(|c| c.raw_box.iter().all(|&v| v <= self.normalized_bound));
        if all_small {
            CoordinateSystem::Normalized
        } else {
            CoordinateSystem::Pixel
        }
    }

    /// Converts one raw `xc, yc, w, h` box into a clamped image box.
    pub fn to_image_box(
        &self,
        raw_box: [f32; 4],
        system: CoordinateSystem,
        image: ImageSize,
    ) -> Result<BoundingBox, GeometryRejection> {
        if raw_box.iter().any(|v| !v.is_finite()) {
            return Err(GeometryRejection::Degenerate);
        }
        let (scale_x, scale_y) = match system {
            CoordinateSystem::Normalized => (image.width_f32(), image.height_f32()),
            CoordinateSystem::Pixel => (
                image.width_f32() / self.model_input.width_f32(),
                image.height_f32() / self.model_input.height_f32(),
            ),
        };
        let [xc, yc, w, h] = raw_box;
        let half_w = w * 0.5;
        let half_h = h * 0.5;
        let bbox = BoundingBox::new(
            ((xc - half_w) * scale_x).clamp(0.0, image.width_f32()),
            ((yc - half_h) * scale_y).clamp(0.0, image.height_f32()),
            ((xc + half_w) * scale_x).clamp(0.0, image.width_f32()),
            ((yc + half_h) * scale_y).clamp(0.0, image.height_f32()),
        );
        self.limits.check(&bbox, image)?;
        Ok(bbox)
    }

    /// Builds detections from gated candidates, counting geometry rejections.
    ///
    /// Candidates whose class has no label are dropped as degenerate.
    pub fn normalize(
        &self,
        candidates: &[Candidate],
        labels: &LabelVocabulary,
        image: ImageSize,
        rejected: &mut usize,
    ) -> (CoordinateSystem, Vec<Detection>) {
        let system = self.detect_coordinate_system(candidates);
        let mut out = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let Some(label) = labels.get(candidate.best_class) else {
                *rejected += 1;
                continue;
            };
            match self.to_image_box(candidate.raw_box, system, image) {
                Ok(bbox) => out.push(Detection {
                    class_id: candidate.best_class,
                    label: label.clone(),
                    confidence: candidate.best_score,
                    bbox,
                }),
                Err(_) => *rejected += 1,
            }
        }
        (system, out)
    }
}
