//! stabledet turns raw object-detector output into short, stable, labeled
//! box lists.
//!
//! One forward pass of a detector (a `[1, 4 + C, N]` or `[1, N, 4 + C]`
//! tensor, float or affine-quantized) is decoded into per-anchor candidates,
//! gated on per-class confidence floors and a best-vs-runner-up ambiguity
//! gap, mapped into destination image pixels with size and shape checks,
//! de-duplicated with greedy NMS and capped. In streaming mode a temporal
//! stabilizer smooths boxes between frames whose labels did not change, and a
//! throttle bounds the processing cadence.
//!
//! Parallel anchor decoding is available via the `rayon` feature; tracing
//! spans and per-frame counters via the `tracing` feature.

pub mod candidate;
pub mod detection;
pub mod gate;
pub mod geometry;
#[cfg(feature = "image-io")]
pub mod io;
pub mod labels;
pub mod lowlevel;
pub mod pipeline;
pub mod stabilize;
pub mod suppress;
pub mod tensor;
mod trace;
pub mod util;

pub use detection::{Detection, DetectionSet};
pub use geometry::{BoundingBox, CoordinateSystem, ImageSize};
pub use labels::LabelVocabulary;
pub use pipeline::{
    DetectionPipeline, Frame, FrameStats, FrameThrottle, InFlightGuard, ModelSpec,
    PipelineConfig, SessionTotals, SkipReason, StreamConfig, StreamOutcome, StreamSession,
};
pub use stabilize::TemporalStabilizer;
pub use tensor::{Quantization, TensorData};
pub use util::{DetectError, DetectResult};
