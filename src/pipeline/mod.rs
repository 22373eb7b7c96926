//! End-to-end decode pipeline and its streaming wrapper.
//!
//! `DetectionPipeline` is built once from the label vocabulary, the model
//! description and a `PipelineConfig`; all load-time validation happens in
//! `DetectionPipeline::new`. Per-frame calls are `&self` and stateless, so one
//! pipeline can serve on-demand captures from any thread. Streaming mode adds
//! the temporal stabilizer and cadence control in `StreamSession`.

mod config;
mod stats;
mod stream;

pub use config::{ModelSpec, PipelineConfig, StreamConfig};
pub use stats::{FrameStats, SessionTotals};
pub use stream::{FrameThrottle, InFlightGuard, SkipReason, StreamOutcome, StreamSession};

#[cfg(feature = "rayon")]
use crate::candidate::decode::decode_candidates_par;
use crate::candidate::decode::decode_candidates;
use crate::candidate::Candidate;
use crate::detection::DetectionSet;
use crate::gate::{ClassThresholds, ConfidenceGate};
use crate::geometry::{BoxNormalizer, ImageSize};
use crate::labels::LabelVocabulary;
use crate::suppress::Suppressor;
use crate::tensor::{TensorData, TensorElement, TensorLayout, TensorView};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{DetectError, DetectResult};

/// One forward pass plus the size of the image it should be mapped onto.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    /// Raw output tensor.
    pub tensor: TensorData<'a>,
    /// Destination image size (may differ from the model input size).
    pub image: ImageSize,
}

impl<'a> Frame<'a> {
    pub fn new(tensor: TensorData<'a>, image: ImageSize) -> Self {
        Self { tensor, image }
    }
}

/// Stateless decode → gate → normalize → suppress pipeline.
#[derive(Clone, Debug)]
pub struct DetectionPipeline {
    config: PipelineConfig,
    labels: LabelVocabulary,
    layout: TensorLayout,
    gate: ConfidenceGate,
    normalizer: BoxNormalizer,
    suppressor: Suppressor,
}

impl DetectionPipeline {
    /// Validates the configuration against the model and vocabulary.
    ///
    /// Any mismatch here is fatal: the pipeline refuses to decode rather than
    /// produce garbage labels.
    pub fn new(
        labels: LabelVocabulary,
        model: &ModelSpec,
        config: PipelineConfig,
    ) -> DetectResult<Self> {
        config.validate()?;
        let input = model.input_size;
        if input.width == 0 || input.height == 0 {
            return Err(DetectError::InvalidImageSize {
                width: input.width,
                height: input.height,
            });
        }

        let layout = TensorLayout::resolve(&model.output_shape, labels.len())?;
        let thresholds = ClassThresholds::resolve(
            config.confidence_threshold,
            config
                .class_thresholds
                .iter()
                .map(|(label, &floor)| (label.as_str(), floor)),
            &labels,
        )?;
        let gate = ConfidenceGate::new(thresholds, config.min_confidence_gap, config.gap_check);
        let normalizer = BoxNormalizer::new(
            config.geometry_limits(),
            input,
            config.normalized_coord_bound,
            config.coord_sample_size,
        );
        let suppressor = Suppressor::new(config.nms_iou_threshold, config.max_detections);

        if config.parallel && !cfg!(feature = "rayon") {
            trace_warn!("parallel decode requested but the rayon feature is disabled");
        }

        Ok(Self {
            config,
            labels,
            layout,
            gate,
            normalizer,
            suppressor,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the label vocabulary.
    pub fn labels(&self) -> &LabelVocabulary {
        &self.labels
    }

    /// Returns the resolved output layout.
    pub fn layout(&self) -> &TensorLayout {
        &self.layout
    }

    /// Runs the pipeline on one frame.
    ///
    /// An empty set is the normal "nothing detected" result; errors only
    /// signal a malformed frame (buffer size, quantization, image size).
    pub fn detect(&self, frame: Frame<'_>) -> DetectResult<DetectionSet> {
        self.detect_with_stats(frame).map(|(set, _)| set)
    }

    /// Runs the pipeline on one frame and returns the stage counters.
    pub fn detect_with_stats(&self, frame: Frame<'_>) -> DetectResult<(DetectionSet, FrameStats)> {
        let image = frame.image;
        if image.width == 0 || image.height == 0 {
            return Err(DetectError::InvalidImageSize {
                width: image.width,
                height: image.height,
            });
        }
        match frame.tensor {
            TensorData::F32(data) => {
                let view = TensorView::new(data, self.layout, Default::default())?;
                Ok(self.run(&view, image))
            }
            TensorData::U8 { data, quant } => {
                let view = TensorView::new(data, self.layout, quant)?;
                Ok(self.run(&view, image))
            }
            TensorData::I8 { data, quant } => {
                let view = TensorView::new(data, self.layout, quant)?;
                Ok(self.run(&view, image))
            }
        }
    }

    fn decode<T: TensorElement>(&self, view: &TensorView<'_, T>) -> Vec<Candidate> {
        #[cfg(feature = "rayon")]
        if self.config.parallel {
            return decode_candidates_par(view);
        }
        decode_candidates(view)
    }

    fn run<T: TensorElement>(
        &self,
        view: &TensorView<'_, T>,
        image: ImageSize,
    ) -> (DetectionSet, FrameStats) {
        let _span = trace_span!(
            "detect_frame",
            anchors = view.num_anchors(),
            classes = view.num_classes()
        )
        .entered();

        let mut stats = FrameStats {
            total_anchors: view.num_anchors(),
            ..FrameStats::default()
        };

        let candidates = self.decode(view);
        let gated = self.gate.apply(candidates, &mut stats.gate);
        let (system, detections) = self.normalizer.normalize(
            &gated,
            &self.labels,
            image,
            &mut stats.rejected_by_geometry,
        );
        stats.coordinate_system = (!gated.is_empty()).then_some(system);
        stats.accepted_pre_nms = detections.len();

        let kept = self.suppressor.apply(detections);
        stats.accepted_post_nms = kept.len();

        trace_event!(
            "frame_stats",
            anchors = stats.total_anchors,
            candidates = stats.gate.total,
            rejected_by_floor = stats.gate.rejected_by_floor,
            rejected_by_gap = stats.gate.rejected_by_gap,
            rejected_by_geometry = stats.rejected_by_geometry,
            accepted_pre_nms = stats.accepted_pre_nms,
            accepted_post_nms = stats.accepted_post_nms,
        );

        (DetectionSet::from_sorted(kept), stats)
    }

    /// Wraps the pipeline in a streaming session with its own stabilizer.
    pub fn into_stream(self, cfg: StreamConfig) -> StreamSession {
        StreamSession::new(self, cfg)
    }
}
