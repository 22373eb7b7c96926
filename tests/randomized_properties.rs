use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stabledet::lowlevel::nms_boxes;
use stabledet::{
    BoundingBox, Detection, DetectionPipeline, Frame, ImageSize, LabelVocabulary, ModelSpec,
    PipelineConfig, TensorData,
};
use std::sync::Arc;

const NUM_CLASSES: usize = 3;
const NUM_ANCHORS: usize = 300;

fn random_tensor(rng: &mut StdRng) -> Vec<f32> {
    let n = NUM_ANCHORS;
    let mut data = vec![0.0f32; (4 + NUM_CLASSES) * n];
    for i in 0..n {
        data[i] = rng.random_range(0.05..0.95);
        data[n + i] = rng.random_range(0.05..0.95);
        data[2 * n + i] = rng.random_range(0.02..0.4);
        data[3 * n + i] = rng.random_range(0.02..0.4);
        // Mostly one dominant class, sometimes a close runner-up.
        let best = rng.random_range(0..NUM_CLASSES);
        data[(4 + best) * n + i] = rng.random_range(0.0..1.0);
        if rng.random_bool(0.3) {
            let other = (best + 1) % NUM_CLASSES;
            data[(4 + other) * n + i] = rng.random_range(0.0..0.6);
        }
    }
    data
}

fn pipeline(cfg: PipelineConfig) -> DetectionPipeline {
    let labels = LabelVocabulary::new(["person", "chair", "cup"]).unwrap();
    let model = ModelSpec::new(
        vec![1, 4 + NUM_CLASSES, NUM_ANCHORS],
        ImageSize::new(640, 640).unwrap(),
    );
    DetectionPipeline::new(labels, &model, cfg).unwrap()
}

#[test]
fn raising_a_class_threshold_never_adds_detections_of_that_class() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let image = ImageSize::new(1280, 720).unwrap();

    for _ in 0..20 {
        let data = random_tensor(&mut rng);
        for max_detections in [5usize, 50] {
            let mut previous = usize::MAX;
            for floor in [0.0f32, 0.3, 0.5, 0.7, 0.9, 1.0] {
                let mut cfg = PipelineConfig {
                    max_detections,
                    ..PipelineConfig::default()
                };
                cfg.class_thresholds.insert("chair".to_string(), floor);
                let set = pipeline(cfg)
                    .detect(Frame::new(TensorData::F32(&data), image))
                    .unwrap();
                let chairs = set.iter().filter(|d| &*d.label == "chair").count();
                assert!(
                    chairs <= previous,
                    "floor {floor}: {chairs} chairs after {previous}"
                );
                previous = chairs;
            }
        }
    }
}

fn random_detections(rng: &mut StdRng, count: usize) -> Vec<Detection> {
    (0..count)
        .map(|_| {
            let left = rng.random_range(0.0..900.0f32);
            let top = rng.random_range(0.0..900.0f32);
            let w = rng.random_range(10.0..200.0f32);
            let h = rng.random_range(10.0..200.0f32);
            let class_id = rng.random_range(0..NUM_CLASSES);
            Detection {
                class_id,
                label: Arc::from(format!("class{class_id}")),
                confidence: rng.random_range(0.01..1.0),
                bbox: BoundingBox::new(left, top, left + w, top + h),
            }
        })
        .collect()
}

#[test]
fn nms_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..50 {
        let detections = random_detections(&mut rng, 60);
        for threshold in [0.1f32, 0.45, 0.8] {
            let once = nms_boxes(detections.clone(), threshold, 100);
            let twice = nms_boxes(once.clone(), threshold, 100);
            assert_eq!(once, twice);

            for (i, a) in once.iter().enumerate() {
                for b in &once[i + 1..] {
                    assert!(a.bbox.iou(&b.bbox) <= threshold);
                }
            }
        }
    }
}

#[test]
fn every_output_box_satisfies_the_geometry_invariants() {
    let mut rng = StdRng::seed_from_u64(7);
    let image = ImageSize::new(1000, 2000).unwrap();
    let cfg = PipelineConfig {
        gap_check: false,
        confidence_threshold: 0.1,
        max_detections: 20,
        ..PipelineConfig::default()
    };
    let p = pipeline(cfg.clone());

    for _ in 0..20 {
        let data = random_tensor(&mut rng);
        let set = p.detect(Frame::new(TensorData::F32(&data), image)).unwrap();
        for det in &set {
            let b = det.bbox;
            assert!(b.right > b.left && b.bottom > b.top);
            assert!(b.left >= 0.0 && b.top >= 0.0);
            assert!(b.right <= 1000.0 && b.bottom <= 2000.0);
            assert!(b.width() >= cfg.min_box_pixels && b.height() >= cfg.min_box_pixels);
            let aspect = b.width() / b.height();
            assert!(aspect >= cfg.min_aspect_ratio && aspect <= cfg.max_aspect_ratio);
            assert!(det.confidence > 0.0 && det.confidence <= 1.0);
        }
    }
}
