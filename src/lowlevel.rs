//! Low-level building blocks for custom pipelines.
//!
//! These expose the individual stages behind `DetectionPipeline` for callers
//! that need to reorder them, inspect candidates, or swap one stage out. Most
//! users should prefer `DetectionPipeline` and `StreamSession`.

pub use crate::candidate::decode::decode_candidates;
#[cfg(feature = "rayon")]
pub use crate::candidate::decode::decode_candidates_par;
pub use crate::candidate::Candidate;
pub use crate::gate::{ClassThresholds, ConfidenceGate, GateTally, GateVerdict};
pub use crate::geometry::{BoxNormalizer, GeometryLimits, GeometryRejection};
pub use crate::suppress::nms::nms_boxes;
pub use crate::suppress::Suppressor;
pub use crate::tensor::{AnchorLayout, TensorElement, TensorLayout, TensorView, BOX_ATTRS};
