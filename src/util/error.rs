//! Error types for stabledet.

use thiserror::Error;

/// Result alias for stabledet operations.
pub type DetectResult<T> = std::result::Result<T, DetectError>;

/// Errors that can occur when building or running a detection pipeline.
///
/// [`DetectError::BufferSizeMismatch`], [`DetectError::InvalidQuantization`],
/// [`DetectError::InvalidImageSize`] and [`DetectError::ForeignGuard`] reject
/// a single frame; the rest are load-time configuration errors.
/// A frame with nothing in it is never an error; it yields an empty set.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DetectError {
    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    /// The output tensor does not have rank 3.
    #[error("output tensor must have rank 3, got rank {rank}")]
    InvalidTensorRank { rank: usize },
    /// The output tensor batch dimension is not 1.
    #[error("output tensor batch must be 1, got {batch}")]
    InvalidBatch { batch: usize },
    /// Neither non-batch axis has the expected attribute count.
    #[error("no axis of {dims:?} matches {expected} attributes (4 box + classes)")]
    AttributeAxisNotFound { dims: [usize; 2], expected: usize },
    /// The label vocabulary size differs from the model's class count.
    #[error("label vocabulary has {labels} entries but model emits {model_classes} classes")]
    ClassCountMismatch { labels: usize, model_classes: usize },
    /// The tensor buffer length does not match the resolved shape.
    #[error("tensor buffer too small or too large: needed {needed}, got {got}")]
    BufferSizeMismatch { needed: usize, got: usize },
    /// The quantization scale is not a positive finite number.
    #[error("invalid quantization scale {scale}")]
    InvalidQuantization { scale: f32 },
    /// Image dimensions are zero.
    #[error("invalid image size {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },
    /// The label vocabulary is empty.
    #[error("label vocabulary is empty")]
    EmptyVocabulary,
    /// A label appears more than once in the vocabulary.
    #[error("duplicate label {label:?} in vocabulary")]
    DuplicateLabel { label: String },
    /// A per-class threshold names a label outside the vocabulary.
    #[error("threshold override for unknown label {label:?}")]
    UnknownLabel { label: String },
    /// A streaming frame was admitted by a different session's throttle.
    #[error("in-flight guard was issued by another stream session")]
    ForeignGuard,
    /// Reading an asset from disk failed.
    #[error("failed to read {what}: {reason}")]
    Io { what: &'static str, reason: String },
    /// Image decoding failed.
    #[cfg(feature = "image-io")]
    #[error("image I/O error: {reason}")]
    ImageIo { reason: String },
}
