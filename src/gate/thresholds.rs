//! Per-class confidence floors resolved against the label vocabulary.

use crate::labels::LabelVocabulary;
use crate::util::math::is_unit;
use crate::util::{DetectError, DetectResult};

/// Confidence floor for every class index.
///
/// Overrides are keyed by label in configuration and resolved to indices once,
/// so the gate does a single indexed load per candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassThresholds {
    floors: Vec<f32>,
}

impl ClassThresholds {
    /// Uses `global` for every class.
    pub fn uniform(global: f32, num_classes: usize) -> Self {
        Self {
            floors: vec![global; num_classes],
        }
    }

    /// Resolves `(label, floor)` overrides on top of `global`.
    pub fn resolve<'a, I>(global: f32, overrides: I, labels: &LabelVocabulary) -> DetectResult<Self>
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        if !is_unit(global) {
            return Err(DetectError::InvalidConfig(
                "confidence_threshold must be within [0, 1]",
            ));
        }
        let mut out = Self::uniform(global, labels.len());
        for (label, floor) in overrides {
            if !is_unit(floor) {
                return Err(DetectError::InvalidConfig(
                    "class threshold overrides must be within [0, 1]",
                ));
            }
            let class = labels
                .index_of(label)
                .ok_or_else(|| DetectError::UnknownLabel {
                    label: label.to_string(),
                })?;
            out.floors[class] = floor;
        }
        Ok(out)
    }

    /// Returns the floor for `class`; unknown indices get the strictest floor.
    #[inline]
    pub fn floor(&self, class: usize) -> f32 {
        self.floors.get(class).copied().unwrap_or(f32::INFINITY)
    }

    /// Returns the number of classes covered.
    pub fn len(&self) -> usize {
        self.floors.len()
    }

    /// Returns true when no classes are covered.
    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }
}
