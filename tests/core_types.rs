use stabledet::lowlevel::{AnchorLayout, TensorLayout};
use stabledet::{
    DetectError, DetectionPipeline, Frame, ImageSize, LabelVocabulary, ModelSpec, PipelineConfig,
    Quantization, TensorData,
};

fn coco_like(n: usize) -> LabelVocabulary {
    LabelVocabulary::new((0..n).map(|i| format!("class{i}"))).unwrap()
}

fn model(shape: &[usize]) -> ModelSpec {
    ModelSpec::new(shape.to_vec(), ImageSize::new(640, 640).unwrap())
}

#[test]
fn pipeline_resolves_both_layouts_at_load_time() {
    let p = DetectionPipeline::new(coco_like(80), &model(&[1, 84, 8400]), PipelineConfig::default())
        .unwrap();
    assert_eq!(p.layout().layout(), AnchorLayout::AttrsFirst);
    assert_eq!(p.layout().num_anchors(), 8400);

    let p = DetectionPipeline::new(coco_like(80), &model(&[1, 8400, 84]), PipelineConfig::default())
        .unwrap();
    assert_eq!(p.layout().layout(), AnchorLayout::AnchorsFirst);
}

#[test]
fn vocabulary_size_mismatch_is_fatal() {
    let err = DetectionPipeline::new(
        coco_like(3),
        &model(&[1, 84, 8400]),
        PipelineConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        DetectError::ClassCountMismatch {
            labels: 3,
            model_classes: 80,
        }
    );
}

#[test]
fn unknown_override_label_is_fatal() {
    let mut cfg = PipelineConfig::default();
    cfg.class_thresholds.insert("giraffe".to_string(), 0.8);
    let err = DetectionPipeline::new(coco_like(2), &model(&[1, 6, 100]), cfg).unwrap_err();
    assert_eq!(
        err,
        DetectError::UnknownLabel {
            label: "giraffe".to_string(),
        }
    );
}

#[test]
fn invalid_config_is_fatal() {
    let cfg = PipelineConfig {
        nms_iou_threshold: 1.5,
        ..PipelineConfig::default()
    };
    let err = DetectionPipeline::new(coco_like(2), &model(&[1, 6, 100]), cfg).unwrap_err();
    assert_eq!(
        err,
        DetectError::InvalidConfig("nms_iou_threshold must be within [0, 1]")
    );
}

#[test]
fn malformed_frames_are_errors() {
    let p = DetectionPipeline::new(coco_like(2), &model(&[1, 6, 10]), PipelineConfig::default())
        .unwrap();
    let image = ImageSize::new(640, 480).unwrap();

    let short = vec![0.0f32; 59];
    let err = p.detect(Frame::new(TensorData::F32(&short), image)).unwrap_err();
    assert_eq!(err, DetectError::BufferSizeMismatch { needed: 60, got: 59 });

    let bytes = vec![0u8; 60];
    let err = p
        .detect(Frame::new(
            TensorData::U8 {
                data: &bytes,
                quant: Quantization::new(-1.0, 0),
            },
            image,
        ))
        .unwrap_err();
    assert_eq!(err, DetectError::InvalidQuantization { scale: -1.0 });

    let zero = ImageSize {
        width: 0,
        height: 480,
    };
    let ok = vec![0.0f32; 60];
    let err = p.detect(Frame::new(TensorData::F32(&ok), zero)).unwrap_err();
    assert_eq!(
        err,
        DetectError::InvalidImageSize {
            width: 0,
            height: 480,
        }
    );
}

#[test]
fn all_zero_tensor_detects_nothing() {
    let p = DetectionPipeline::new(coco_like(2), &model(&[1, 10, 6]), PipelineConfig::default())
        .unwrap();
    let data = vec![0i8; 60];
    let (set, stats) = p
        .detect_with_stats(Frame::new(
            TensorData::I8 {
                data: &data,
                quant: Quantization::new(0.01, 0),
            },
            ImageSize::new(640, 480).unwrap(),
        ))
        .unwrap();
    assert!(set.is_empty());
    assert_eq!(stats.total_anchors, 10);
    assert_eq!(stats.gate.total, 0);
    assert_eq!(stats.coordinate_system, None);
}

#[test]
fn tensor_layout_reports_sizes() {
    let layout = TensorLayout::resolve(&[1, 25200, 85], 81).unwrap();
    assert_eq!(layout.num_attrs(), 85);
    assert_eq!(layout.len(), 85 * 25200);
}

#[test]
fn errors_render_readable_messages() {
    let err = DetectError::ClassCountMismatch {
        labels: 3,
        model_classes: 80,
    };
    assert_eq!(
        err.to_string(),
        "label vocabulary has 3 entries but model emits 80 classes"
    );
}
