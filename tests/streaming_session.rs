use stabledet::{
    DetectError, DetectionPipeline, DetectionSet, Frame, ImageSize, LabelVocabulary, ModelSpec,
    PipelineConfig, SkipReason, StreamConfig, StreamOutcome, StreamSession, TensorData,
};
use std::time::{Duration, Instant};

const IMAGE: u32 = 1000;

/// `[1, 4 + 2, N]` tensor from `(class, score, [xc, yc, w, h])` anchors.
fn tensor(anchors: &[(usize, f32, [f32; 4])]) -> Vec<f32> {
    let n = anchors.len();
    let mut data = vec![0.0f32; 6 * n];
    for (i, &(class, score, raw_box)) in anchors.iter().enumerate() {
        for (attr, v) in raw_box.into_iter().enumerate() {
            data[attr * n + i] = v;
        }
        data[(4 + class) * n + i] = score;
    }
    data
}

fn session(num_anchors: usize, alpha: f32) -> StreamSession {
    let labels = LabelVocabulary::new(["chair", "cup"]).unwrap();
    let model = ModelSpec::new(vec![1, 6, num_anchors], ImageSize::new(IMAGE, IMAGE).unwrap());
    let cfg = PipelineConfig {
        smoothing_alpha: alpha,
        ..PipelineConfig::default()
    };
    DetectionPipeline::new(labels, &model, cfg).unwrap().into_stream(StreamConfig {
        min_interval: Duration::from_millis(200),
    })
}

fn frame(data: &[f32]) -> Frame<'_> {
    Frame::new(
        TensorData::F32(data),
        ImageSize::new(IMAGE, IMAGE).unwrap(),
    )
}

fn processed(outcome: StreamOutcome) -> DetectionSet {
    match outcome {
        StreamOutcome::Processed { detections, .. } => detections,
        StreamOutcome::Skipped(reason) => panic!("frame skipped: {reason:?}"),
    }
}

#[test]
fn stable_labels_blend_boxes_between_frames() {
    let mut s = session(1, 0.7);
    let t0 = Instant::now();

    // Pixel-space boxes on a 1000px model: (0,0,100,100) then (0,0,110,110).
    let first = tensor(&[(0, 0.9, [50.0, 50.0, 100.0, 100.0])]);
    let second = tensor(&[(0, 0.8, [55.0, 55.0, 110.0, 110.0])]);

    processed(s.process(t0, frame(&first)).unwrap());
    let out = processed(
        s.process(t0 + Duration::from_millis(250), frame(&second))
            .unwrap(),
    );

    let det = &out.as_slice()[0];
    let [l, t, r, b] = det.bbox.to_array();
    assert!(l.abs() < 1e-3 && t.abs() < 1e-3);
    assert!((r - 107.0).abs() < 1e-3, "right {r}");
    assert!((b - 107.0).abs() < 1e-3, "bottom {b}");
    assert_eq!(det.confidence, 0.8);
    assert!(s.stabilizer().smoothed_last());
}

#[test]
fn label_change_returns_the_unsmoothed_frame() {
    let mut s = session(1, 0.7);
    let t0 = Instant::now();
    let first = tensor(&[(0, 0.9, [50.0, 50.0, 100.0, 100.0])]);
    let second = tensor(&[(1, 0.8, [55.0, 55.0, 110.0, 110.0])]);

    processed(s.process(t0, frame(&first)).unwrap());
    let expected = s.pipeline().detect(frame(&second)).unwrap();
    let out = processed(
        s.process(t0 + Duration::from_millis(250), frame(&second))
            .unwrap(),
    );
    assert_eq!(out, expected);
    assert!(!s.stabilizer().smoothed_last());
}

#[test]
fn frames_inside_the_interval_are_dropped_without_touching_state() {
    let mut s = session(1, 0.7);
    let t0 = Instant::now();
    let first = tensor(&[(0, 0.9, [50.0, 50.0, 100.0, 100.0])]);
    let second = tensor(&[(1, 0.9, [500.0, 500.0, 100.0, 100.0])]);

    let kept = processed(s.process(t0, frame(&first)).unwrap());
    let outcome = s
        .process(t0 + Duration::from_millis(100), frame(&second))
        .unwrap();
    assert_eq!(outcome, StreamOutcome::Skipped(SkipReason::TooSoon));
    assert_eq!(s.stabilizer().previous(), Some(&kept));

    let totals = s.totals();
    assert_eq!(totals.frames, 1);
    assert_eq!(totals.skipped_too_soon, 1);
}

#[test]
fn ticks_during_an_in_flight_frame_are_skipped() {
    let mut s = session(1, 0.7);
    let t0 = Instant::now();
    let data = tensor(&[(0, 0.9, [50.0, 50.0, 100.0, 100.0])]);

    let throttle = s.throttle();
    let guard = throttle.try_acquire(t0).unwrap();
    let outcome = s
        .process(t0 + Duration::from_secs(1), frame(&data))
        .unwrap();
    assert_eq!(outcome, StreamOutcome::Skipped(SkipReason::InFlight));

    let (set, stats) = s.process_admitted(guard, frame(&data)).unwrap();
    assert_eq!(set.len(), 1);
    assert!(!stats.smoothed);
    assert!(!throttle.is_in_flight());
    assert_eq!(s.totals().skipped_in_flight, 1);
}

#[test]
fn same_label_objects_keep_their_own_smoothing_targets() {
    let mut s = session(2, 0.5);
    let t0 = Instant::now();
    // Two chairs far apart; the right one is more confident in frame two.
    let first = tensor(&[
        (0, 0.9, [100.0, 100.0, 100.0, 100.0]),
        (0, 0.8, [700.0, 100.0, 100.0, 100.0]),
    ]);
    let second = tensor(&[
        (0, 0.7, [110.0, 100.0, 100.0, 100.0]),
        (0, 0.95, [710.0, 100.0, 100.0, 100.0]),
    ]);

    processed(s.process(t0, frame(&first)).unwrap());
    let out = processed(
        s.process(t0 + Duration::from_millis(300), frame(&second))
            .unwrap(),
    );
    assert_eq!(out.len(), 2);
    // Each box moved halfway from its own previous position.
    assert_eq!(out.as_slice()[0].bbox.left, 655.0);
    assert_eq!(out.as_slice()[1].bbox.left, 55.0);
}

#[test]
fn reset_clears_previous_frame_and_cadence() {
    let mut s = session(1, 0.7);
    let t0 = Instant::now();
    let data = tensor(&[(0, 0.9, [50.0, 50.0, 100.0, 100.0])]);

    processed(s.process(t0, frame(&data)).unwrap());
    s.reset();
    assert!(s.stabilizer().previous().is_none());
    processed(s.process(t0 + Duration::from_millis(1), frame(&data)).unwrap());
    assert!(!s.stabilizer().smoothed_last());
}

#[test]
fn frames_stamped_before_the_session_follow_the_cadence() {
    let t0 = Instant::now();
    let mut s = session(1, 0.7);
    let early = t0.checked_sub(Duration::from_secs(5)).unwrap_or(t0);
    let data = tensor(&[(0, 0.9, [50.0, 50.0, 100.0, 100.0])]);

    processed(s.process(early, frame(&data)).unwrap());
    processed(
        s.process(early + Duration::from_millis(1000), frame(&data))
            .unwrap(),
    );
    assert_eq!(s.totals().frames, 2);
    assert_eq!(s.totals().skipped_too_soon, 0);
}

#[test]
fn guard_from_another_session_is_rejected() {
    let mut s = session(1, 0.7);
    let other = session(1, 0.7);
    let t0 = Instant::now();
    let data = tensor(&[(0, 0.9, [50.0, 50.0, 100.0, 100.0])]);

    let foreign = other.throttle().try_acquire(t0).unwrap();
    let err = s.process_admitted(foreign, frame(&data)).unwrap_err();
    assert_eq!(err, DetectError::ForeignGuard);
    assert!(s.stabilizer().previous().is_none());
    assert!(!other.throttle().is_in_flight());
    assert_eq!(s.totals().frames, 0);
}
