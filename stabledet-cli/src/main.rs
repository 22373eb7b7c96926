use clap::Parser;
use serde::{Deserialize, Serialize};
use stabledet::io::image_size;
use stabledet::{
    CoordinateSystem, Detection, DetectionPipeline, Frame, FrameStats, ImageSize,
    LabelVocabulary, ModelSpec, PipelineConfig, Quantization, SessionTotals, SkipReason,
    StreamConfig, StreamOutcome, TensorData,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "stabledet CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output (spans and per-frame counters).
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ElementType {
    F32,
    U8,
    I8,
}

#[derive(Debug, Deserialize)]
struct ModelJson {
    output_shape: Vec<usize>,
    input_width: u32,
    input_height: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TensorJson {
    dtype: ElementType,
    scale: f32,
    zero_point: i32,
}

impl Default for TensorJson {
    fn default() -> Self {
        let quant = Quantization::default();
        Self {
            dtype: ElementType::F32,
            scale: quant.scale,
            zero_point: quant.zero_point,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImageSizeJson {
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PipelineConfigJson {
    confidence_threshold: f32,
    class_thresholds: BTreeMap<String, f32>,
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
    normalized_coord_bound: f32,
    coord_sample_size: usize,
    parallel: bool,
}

impl Default for PipelineConfigJson {
    fn default() -> Self {
        let cfg = PipelineConfig::default();
        Self {
            confidence_threshold: cfg.confidence_threshold,
            class_thresholds: cfg.class_thresholds,
            min_confidence_gap: cfg.min_confidence_gap,
            gap_check: cfg.gap_check,
            nms_iou_threshold: cfg.nms_iou_threshold,
            min_box_fraction: cfg.min_box_fraction,
            max_box_fraction: cfg.max_box_fraction,
            min_box_pixels: cfg.min_box_pixels,
            min_aspect_ratio: cfg.min_aspect_ratio,
            max_aspect_ratio: cfg.max_aspect_ratio,
            max_detections: cfg.max_detections,
            smoothing_alpha: cfg.smoothing_alpha,
            normalized_coord_bound: cfg.normalized_coord_bound,
            coord_sample_size: cfg.coord_sample_size,
            parallel: cfg.parallel,
        }
    }
}

impl From<PipelineConfigJson> for PipelineConfig {
    fn from(value: PipelineConfigJson) -> Self {
        Self {
            confidence_threshold: value.confidence_threshold,
            class_thresholds: value.class_thresholds,
            min_confidence_gap: value.min_confidence_gap,
            gap_check: value.gap_check,
            nms_iou_threshold: value.nms_iou_threshold,
            min_box_fraction: value.min_box_fraction,
            max_box_fraction: value.max_box_fraction,
            min_box_pixels: value.min_box_pixels,
            min_aspect_ratio: value.min_aspect_ratio,
            max_aspect_ratio: value.max_aspect_ratio,
            max_detections: value.max_detections,
            smoothing_alpha: value.smoothing_alpha,
            normalized_coord_bound: value.normalized_coord_bound,
            coord_sample_size: value.coord_sample_size,
            parallel: value.parallel,
        }
    }
}

/// Replays the tensor files as a stream with a fixed arrival spacing.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct StreamJson {
    min_interval_ms: u64,
    frame_spacing_ms: u64,
}

impl Default for StreamJson {
    fn default() -> Self {
        Self {
            min_interval_ms: StreamConfig::default().min_interval.as_millis() as u64,
            frame_spacing_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Config {
    labels_path: String,
    model: ModelJson,
    #[serde(default)]
    tensor: TensorJson,
    tensor_paths: Vec<String>,
    #[serde(default)]
    image: Option<ImageSizeJson>,
    #[serde(default)]
    image_path: Option<String>,
    #[serde(default)]
    pipeline: PipelineConfigJson,
    #[serde(default)]
    stream: Option<StreamJson>,
    #[serde(default)]
    output_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    label: String,
    class_id: usize,
    confidence: f32,
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl From<&Detection> for DetectionRecord {
    fn from(value: &Detection) -> Self {
        Self {
            label: value.label.to_string(),
            class_id: value.class_id,
            confidence: value.confidence,
            left: value.bbox.left,
            top: value.bbox.top,
            right: value.bbox.right,
            bottom: value.bbox.bottom,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatsRecord {
    total_anchors: usize,
    candidates: usize,
    rejected_by_floor: usize,
    rejected_by_gap: usize,
    rejected_by_geometry: usize,
    accepted_pre_nms: usize,
    accepted_post_nms: usize,
    coordinate_system: Option<&'static str>,
    smoothed: bool,
}

impl From<FrameStats> for StatsRecord {
    fn from(value: FrameStats) -> Self {
        Self {
            total_anchors: value.total_anchors,
            candidates: value.gate.total,
            rejected_by_floor: value.rejected_by_floor(),
            rejected_by_gap: value.rejected_by_gap(),
            rejected_by_geometry: value.rejected_by_geometry,
            accepted_pre_nms: value.accepted_pre_nms,
            accepted_post_nms: value.accepted_post_nms,
            coordinate_system: value.coordinate_system.map(|system| match system {
                CoordinateSystem::Normalized => "normalized",
                CoordinateSystem::Pixel => "pixel",
            }),
            smoothed: value.smoothed,
        }
    }
}

#[derive(Debug, Serialize)]
struct FrameRecord {
    tensor_path: String,
    skipped: Option<&'static str>,
    detections: Vec<DetectionRecord>,
    stats: Option<StatsRecord>,
}

#[derive(Debug, Serialize)]
struct TotalsRecord {
    frames: u64,
    skipped_too_soon: u64,
    skipped_in_flight: u64,
    smoothed_frames: u64,
    candidates: u64,
    rejected_by_floor: u64,
    rejected_by_gap: u64,
    rejected_by_geometry: u64,
    accepted_pre_nms: u64,
    accepted_post_nms: u64,
}

impl From<SessionTotals> for TotalsRecord {
    fn from(value: SessionTotals) -> Self {
        Self {
            frames: value.frames,
            skipped_too_soon: value.skipped_too_soon,
            skipped_in_flight: value.skipped_in_flight,
            smoothed_frames: value.smoothed_frames,
            candidates: value.candidates,
            rejected_by_floor: value.rejected_by_floor,
            rejected_by_gap: value.rejected_by_gap,
            rejected_by_geometry: value.rejected_by_geometry,
            accepted_pre_nms: value.accepted_pre_nms,
            accepted_post_nms: value.accepted_post_nms,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    image_width: u32,
    image_height: u32,
    frames: Vec<FrameRecord>,
    totals: Option<TotalsRecord>,
}

/// Raw little-endian tensor bytes in the element type the model emits.
enum TensorBuffer {
    F32(Vec<f32>),
    U8(Vec<u8>),
    I8(Vec<i8>),
}

impl TensorBuffer {
    fn read(path: &str, dtype: ElementType) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = fs::read(path)?;
        Ok(match dtype {
            ElementType::F32 => {
                if bytes.len() % 4 != 0 {
                    let len = bytes.len();
                    return Err(format!("{path}: length {len} is not a multiple of 4").into());
                }
                TensorBuffer::F32(
                    bytes
                        .chunks_exact(4)
                        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                        .collect(),
                )
            }
            ElementType::U8 => TensorBuffer::U8(bytes),
            ElementType::I8 => TensorBuffer::I8(bytes.into_iter().map(|b| b as i8).collect()),
        })
    }

    fn as_data(&self, quant: Quantization) -> TensorData<'_> {
        match self {
            TensorBuffer::F32(data) => TensorData::F32(data),
            TensorBuffer::U8(data) => TensorData::U8 { data, quant },
            TensorBuffer::I8(data) => TensorData::I8 { data, quant },
        }
    }
}

fn resolve_image_size(config: &Config) -> Result<ImageSize, Box<dyn std::error::Error>> {
    match (&config.image, &config.image_path) {
        (Some(size), _) => Ok(ImageSize::new(size.width, size.height)?),
        (None, Some(path)) => Ok(image_size(path)?),
        (None, None) => Err("either image or image_path must be set in the config".into()),
    }
}

fn skip_name(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::TooSoon => "too_soon",
        SkipReason::InFlight => "in_flight",
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("stabledet=debug".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.labels_path.is_empty() {
        return Err("labels_path must be set in the config".into());
    }
    if config.tensor_paths.is_empty() {
        return Err("tensor_paths must list at least one file".into());
    }

    let labels = LabelVocabulary::from_path(&config.labels_path)?;
    let model = ModelSpec::new(
        config.model.output_shape.clone(),
        ImageSize::new(config.model.input_width, config.model.input_height)?,
    );
    let image = resolve_image_size(&config)?;
    let quant = Quantization::new(config.tensor.scale, config.tensor.zero_point);
    let dtype = config.tensor.dtype;
    let Config {
        pipeline: pipeline_cfg,
        stream,
        tensor_paths,
        output_path,
        ..
    } = config;

    let pipeline = DetectionPipeline::new(labels, &model, pipeline_cfg.into())?;
    let mut frames = Vec::with_capacity(tensor_paths.len());

    let totals = match stream {
        None => {
            for path in tensor_paths {
                let buffer = TensorBuffer::read(&path, dtype)?;
                let (set, stats) =
                    pipeline.detect_with_stats(Frame::new(buffer.as_data(quant), image))?;
                frames.push(FrameRecord {
                    tensor_path: path,
                    skipped: None,
                    detections: set.iter().map(DetectionRecord::from).collect(),
                    stats: Some(stats.into()),
                });
            }
            None
        }
        Some(schedule) => {
            let mut session = pipeline.into_stream(StreamConfig {
                min_interval: Duration::from_millis(schedule.min_interval_ms),
            });
            let start = Instant::now();
            let spacing = Duration::from_millis(schedule.frame_spacing_ms);
            for (i, path) in tensor_paths.into_iter().enumerate() {
                let buffer = TensorBuffer::read(&path, dtype)?;
                let now = start + spacing * i as u32;
                let frame = Frame::new(buffer.as_data(quant), image);
                let record = match session.process(now, frame)? {
                    StreamOutcome::Processed { detections, stats } => FrameRecord {
                        tensor_path: path,
                        skipped: None,
                        detections: detections.iter().map(DetectionRecord::from).collect(),
                        stats: Some(stats.into()),
                    },
                    StreamOutcome::Skipped(reason) => FrameRecord {
                        tensor_path: path,
                        skipped: Some(skip_name(reason)),
                        detections: Vec::new(),
                        stats: None,
                    },
                };
                frames.push(record);
            }
            Some(session.totals())
        }
    };

    tracing::info!(frames = frames.len(), "decode finished");

    let output = Output {
        image_width: image.width,
        image_height: image.height,
        frames,
        totals: totals.map(TotalsRecord::from),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
