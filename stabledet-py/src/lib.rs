//! Python bindings for the stabledet decode-and-stabilize pipeline.
//!
//! Tensors are passed as 3D numpy arrays matching the model output shape.

use numpy::{PyReadonlyArray3, PyUntypedArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use stabledet::{
    CoordinateSystem, DetectError, Detection as RustDetection,
    DetectionPipeline as RustPipeline, DetectionSet, Frame, FrameStats as RustFrameStats,
    ImageSize, LabelVocabulary, ModelSpec, PipelineConfig as RustPipelineConfig, Quantization,
    StreamConfig, StreamOutcome, StreamSession as RustStreamSession, TensorData,
};

/// Convert a load-time DetectError to a Python ValueError.
fn to_value_err(err: DetectError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Convert a per-frame DetectError to a Python RuntimeError.
fn to_py_err(err: DetectError) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

fn check_shape(shape: &[usize], expected: &[usize]) -> PyResult<()> {
    if shape != expected {
        return Err(PyValueError::new_err(format!(
            "tensor shape {shape:?} does not match model output shape {expected:?}"
        )));
    }
    Ok(())
}

/// A labeled box in destination image pixels.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    #[pyo3(get)]
    pub label: String,
    #[pyo3(get)]
    pub class_id: usize,
    /// Winning class score in (0, 1].
    #[pyo3(get)]
    pub confidence: f32,
    #[pyo3(get)]
    pub left: f32,
    #[pyo3(get)]
    pub top: f32,
    #[pyo3(get)]
    pub right: f32,
    #[pyo3(get)]
    pub bottom: f32,
}

#[pymethods]
impl Detection {
    fn __repr__(&self) -> String {
        format!(
            "Detection(label='{}', confidence={:.3}, box=({:.1}, {:.1}, {:.1}, {:.1}))",
            self.label, self.confidence, self.left, self.top, self.right, self.bottom
        )
    }
}

impl From<&RustDetection> for Detection {
    fn from(d: &RustDetection) -> Self {
        Self {
            label: d.label.to_string(),
            class_id: d.class_id,
            confidence: d.confidence,
            left: d.bbox.left,
            top: d.bbox.top,
            right: d.bbox.right,
            bottom: d.bbox.bottom,
        }
    }
}

fn detections(set: &DetectionSet) -> Vec<Detection> {
    set.iter().map(Detection::from).collect()
}

/// Per-frame stage counters.
#[pyclass]
#[derive(Clone)]
pub struct FrameStats {
    #[pyo3(get)]
    pub total_anchors: usize,
    #[pyo3(get)]
    pub candidates: usize,
    #[pyo3(get)]
    pub rejected_by_floor: usize,
    #[pyo3(get)]
    pub rejected_by_gap: usize,
    #[pyo3(get)]
    pub rejected_by_geometry: usize,
    #[pyo3(get)]
    pub accepted_pre_nms: usize,
    #[pyo3(get)]
    pub accepted_post_nms: usize,
    /// "normalized", "pixel" or None when no candidate passed the gate.
    #[pyo3(get)]
    pub coordinate_system: Option<String>,
    #[pyo3(get)]
    pub smoothed: bool,
}

#[pymethods]
impl FrameStats {
    fn __repr__(&self) -> String {
        format!(
            "FrameStats(anchors={}, candidates={}, floor={}, gap={}, geometry={}, kept={})",
            self.total_anchors,
            self.candidates,
            self.rejected_by_floor,
            self.rejected_by_gap,
            self.rejected_by_geometry,
            self.accepted_post_nms
        )
    }
}

impl From<RustFrameStats> for FrameStats {
    fn from(s: RustFrameStats) -> Self {
        Self {
            total_anchors: s.total_anchors,
            candidates: s.gate.total,
            rejected_by_floor: s.rejected_by_floor(),
            rejected_by_gap: s.rejected_by_gap(),
            rejected_by_geometry: s.rejected_by_geometry,
            accepted_pre_nms: s.accepted_pre_nms,
            accepted_post_nms: s.accepted_post_nms,
            coordinate_system: s.coordinate_system.map(|c| {
                match c {
                    CoordinateSystem::Normalized => "normalized",
                    CoordinateSystem::Pixel => "pixel",
                }
                .to_string()
            }),
            smoothed: s.smoothed,
        }
    }
}

/// Pipeline tuning knobs.
#[pyclass]
#[derive(Clone)]
pub struct PipelineConfig {
    inner: RustPipelineConfig,
}

#[pymethods]
impl PipelineConfig {
    /// Create a new PipelineConfig.
    ///
    /// Args:
    ///     confidence_threshold: Global confidence floor (default: 0.5)
    ///     class_thresholds: Per-label floors, e.g. {"person": 0.6} (default: {})
    ///     min_confidence_gap: Best vs runner-up margin (default: 0.15)
    ///     gap_check: Enable the ambiguity gap rule (default: True)
    ///     nms_iou_threshold: IoU above which boxes are suppressed (default: 0.45)
    ///     min_box_fraction: Minimum box side as image fraction (default: 0.01)
    ///     max_box_fraction: Maximum box side as image fraction (default: 0.95)
    ///     min_box_pixels: Minimum box side in pixels (default: 20.0)
    ///     min_aspect_ratio: Minimum width / height (default: 0.1)
    ///     max_aspect_ratio: Maximum width / height (default: 10.0)
    ///     max_detections: Detections returned per frame (default: 5)
    ///     smoothing_alpha: Current-frame weight when smoothing (default: 0.7)
    ///     parallel: Decode anchors in parallel (default: False)
    #[new]
    #[pyo3(signature = (
        confidence_threshold = 0.5,
        class_thresholds = None,
        min_confidence_gap = 0.15,
        gap_check = true,
        nms_iou_threshold = 0.45,
        min_box_fraction = 0.01,
        max_box_fraction = 0.95,
        min_box_pixels = 20.0,
        min_aspect_ratio = 0.1,
        max_aspect_ratio = 10.0,
        max_detections = 5,
        smoothing_alpha = 0.7,
        parallel = false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        confidence_threshold: f32,
        class_thresholds: Option<BTreeMap<String, f32>>,
        min_confidence_gap: f32,
        gap_check: bool,
        nms_iou_threshold: f32,
        min_box_fraction: f32,
        max_box_fraction: f32,
        min_box_pixels: f32,
        min_aspect_ratio: f32,
        max_aspect_ratio: f32,
        max_detections: usize,
        smoothing_alpha: f32,
        parallel: bool,
    ) -> PyResult<Self> {
        let inner = RustPipelineConfig {
            confidence_threshold,
            class_thresholds: class_thresholds.unwrap_or_default(),
            min_confidence_gap,
            gap_check,
            nms_iou_threshold,
            min_box_fraction,
            max_box_fraction,
            min_box_pixels,
            min_aspect_ratio,
            max_aspect_ratio,
            max_detections,
            smoothing_alpha,
            parallel,
            ..RustPipelineConfig::default()
        };
        inner.validate().map_err(to_value_err)?;
        Ok(Self { inner })
    }

    /// Validate the configuration.
    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_value_err)
    }

    #[getter]
    fn confidence_threshold(&self) -> f32 {
        self.inner.confidence_threshold
    }

    #[getter]
    fn class_thresholds(&self) -> BTreeMap<String, f32> {
        self.inner.class_thresholds.clone()
    }

    #[getter]
    fn max_detections(&self) -> usize {
        self.inner.max_detections
    }

    fn __repr__(&self) -> String {
        format!(
            "PipelineConfig(confidence_threshold={}, gap_check={}, \
             nms_iou_threshold={}, max_detections={})",
            self.inner.confidence_threshold,
            self.inner.gap_check,
            self.inner.nms_iou_threshold,
            self.inner.max_detections
        )
    }
}

/// Stateless detection pipeline for one model and label vocabulary.
#[pyclass]
pub struct Pipeline {
    inner: RustPipeline,
    output_shape: Vec<usize>,
}

impl Pipeline {
    fn build(
        labels: LabelVocabulary,
        output_shape: Vec<usize>,
        input_width: u32,
        input_height: u32,
        config: Option<PipelineConfig>,
    ) -> PyResult<Self> {
        let input = ImageSize::new(input_width, input_height).map_err(to_value_err)?;
        let model = ModelSpec::new(output_shape.clone(), input);
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        let inner = RustPipeline::new(labels, &model, cfg).map_err(to_value_err)?;
        Ok(Self {
            inner,
            output_shape,
        })
    }
}

#[pymethods]
impl Pipeline {
    /// Create a pipeline.
    ///
    /// Args:
    ///     labels: Class labels in model output order
    ///     output_shape: Model output shape, [1, 4 + C, N] or [1, N, 4 + C]
    ///     input_width: Model input width in pixels
    ///     input_height: Model input height in pixels
    ///     config: PipelineConfig (default: PipelineConfig())
    #[new]
    #[pyo3(signature = (labels, output_shape, input_width, input_height, config = None))]
    fn new(
        labels: Vec<String>,
        output_shape: Vec<usize>,
        input_width: u32,
        input_height: u32,
        config: Option<PipelineConfig>,
    ) -> PyResult<Self> {
        let labels = LabelVocabulary::new(labels).map_err(to_value_err)?;
        Self::build(labels, output_shape, input_width, input_height, config)
    }

    /// Create a pipeline with labels read from a text file, one per line.
    #[staticmethod]
    #[pyo3(signature = (labels_path, output_shape, input_width, input_height, config = None))]
    fn from_label_file(
        labels_path: &str,
        output_shape: Vec<usize>,
        input_width: u32,
        input_height: u32,
        config: Option<PipelineConfig>,
    ) -> PyResult<Self> {
        let labels = LabelVocabulary::from_path(labels_path).map_err(to_value_err)?;
        Self::build(labels, output_shape, input_width, input_height, config)
    }

    #[getter]
    fn labels(&self) -> Vec<String> {
        self.inner.labels().iter().map(str::to_string).collect()
    }

    /// Decode a float32 output tensor.
    ///
    /// Args:
    ///     tensor: 3D float32 numpy array with the model output shape
    ///     image_width: Destination image width
    ///     image_height: Destination image height
    ///
    /// Returns:
    ///     (list of Detection sorted by confidence, FrameStats)
    fn detect(
        &self,
        tensor: PyReadonlyArray3<'_, f32>,
        image_width: u32,
        image_height: u32,
    ) -> PyResult<(Vec<Detection>, FrameStats)> {
        check_shape(tensor.shape(), &self.output_shape)?;
        let image = ImageSize::new(image_width, image_height).map_err(to_py_err)?;
        let frame = Frame::new(TensorData::F32(tensor.as_slice()?), image);
        let (set, stats) = self.inner.detect_with_stats(frame).map_err(to_py_err)?;
        Ok((detections(&set), stats.into()))
    }

    /// Decode an affine-quantized uint8 output tensor.
    ///
    /// Real values are `scale * (q - zero_point)`.
    #[pyo3(signature = (tensor, image_width, image_height, scale, zero_point = 0))]
    fn detect_quantized(
        &self,
        tensor: PyReadonlyArray3<'_, u8>,
        image_width: u32,
        image_height: u32,
        scale: f32,
        zero_point: i32,
    ) -> PyResult<(Vec<Detection>, FrameStats)> {
        check_shape(tensor.shape(), &self.output_shape)?;
        let image = ImageSize::new(image_width, image_height).map_err(to_py_err)?;
        let frame = Frame::new(
            TensorData::U8 {
                data: tensor.as_slice()?,
                quant: Quantization::new(scale, zero_point),
            },
            image,
        );
        let (set, stats) = self.inner.detect_with_stats(frame).map_err(to_py_err)?;
        Ok((detections(&set), stats.into()))
    }

    /// Start a streaming session with temporal smoothing.
    #[pyo3(signature = (min_interval_ms = 250))]
    fn stream(&self, min_interval_ms: u64) -> StreamSession {
        StreamSession {
            inner: self.inner.clone().into_stream(StreamConfig {
                min_interval: Duration::from_millis(min_interval_ms),
            }),
            output_shape: self.output_shape.clone(),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Pipeline(classes={}, output_shape={:?})",
            self.inner.labels().len(),
            self.output_shape
        )
    }
}

/// Streaming session: throttled, temporally smoothed detection.
#[pyclass]
pub struct StreamSession {
    inner: RustStreamSession,
    output_shape: Vec<usize>,
}

impl StreamSession {
    fn offer(&mut self, frame: Frame<'_>) -> PyResult<Option<(Vec<Detection>, FrameStats)>> {
        match self.inner.process(Instant::now(), frame).map_err(to_py_err)? {
            StreamOutcome::Processed { detections: set, stats } => {
                Ok(Some((detections(&set), stats.into())))
            }
            StreamOutcome::Skipped(_) => Ok(None),
        }
    }
}

#[pymethods]
impl StreamSession {
    /// Offer a float32 frame; returns None when the frame was skipped.
    fn process(
        &mut self,
        tensor: PyReadonlyArray3<'_, f32>,
        image_width: u32,
        image_height: u32,
    ) -> PyResult<Option<(Vec<Detection>, FrameStats)>> {
        check_shape(tensor.shape(), &self.output_shape)?;
        let image = ImageSize::new(image_width, image_height).map_err(to_py_err)?;
        self.offer(Frame::new(TensorData::F32(tensor.as_slice()?), image))
    }

    /// Offer a quantized uint8 frame; returns None when the frame was skipped.
    #[pyo3(signature = (tensor, image_width, image_height, scale, zero_point = 0))]
    fn process_quantized(
        &mut self,
        tensor: PyReadonlyArray3<'_, u8>,
        image_width: u32,
        image_height: u32,
        scale: f32,
        zero_point: i32,
    ) -> PyResult<Option<(Vec<Detection>, FrameStats)>> {
        check_shape(tensor.shape(), &self.output_shape)?;
        let image = ImageSize::new(image_width, image_height).map_err(to_py_err)?;
        self.offer(Frame::new(
            TensorData::U8 {
                data: tensor.as_slice()?,
                quant: Quantization::new(scale, zero_point),
            },
            image,
        ))
    }

    /// Clear the stabilizer and the cadence clock.
    fn reset(&mut self) {
        self.inner.reset();
    }

    /// Running totals as a dict.
    fn totals(&self) -> BTreeMap<&'static str, u64> {
        let t = self.inner.totals();
        BTreeMap::from([
            ("frames", t.frames),
            ("skipped_too_soon", t.skipped_too_soon),
            ("skipped_in_flight", t.skipped_in_flight),
            ("smoothed_frames", t.smoothed_frames),
            ("candidates", t.candidates),
            ("rejected_by_floor", t.rejected_by_floor),
            ("rejected_by_gap", t.rejected_by_gap),
            ("rejected_by_geometry", t.rejected_by_geometry),
            ("accepted_pre_nms", t.accepted_pre_nms),
            ("accepted_post_nms", t.accepted_post_nms),
        ])
    }

    fn __repr__(&self) -> String {
        format!("StreamSession(frames={})", self.inner.totals().frames)
    }
}

/// Python module for stabledet.
#[pymodule]
fn _stabledet(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<FrameStats>()?;
    m.add_class::<PipelineConfig>()?;
    m.add_class::<Pipeline>()?;
    m.add_class::<StreamSession>()?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
