use criterion::{criterion_group, criterion_main, Criterion};
use stabledet::lowlevel::{decode_candidates, TensorLayout, TensorView};
use stabledet::{
    DetectionPipeline, Frame, ImageSize, LabelVocabulary, ModelSpec, PipelineConfig,
    Quantization, StreamConfig, TensorData,
};
use std::hint::black_box;
use std::time::{Duration, Instant};

const NUM_CLASSES: usize = 80;
const NUM_ANCHORS: usize = 8400;

/// Deterministic YOLO-like head output: pixel boxes, sparse class scores.
fn make_tensor() -> Vec<f32> {
    let n = NUM_ANCHORS;
    let mut data = vec![0.0f32; (4 + NUM_CLASSES) * n];
    for i in 0..n {
        let h = (i * 2654435761) & 0xFFFF;
        data[i] = 16.0 + (h % 600) as f32;
        data[n + i] = 16.0 + ((h / 7) % 600) as f32;
        data[2 * n + i] = 20.0 + (h % 180) as f32;
        data[3 * n + i] = 20.0 + ((h / 3) % 180) as f32;
        let class = h % NUM_CLASSES;
        data[(4 + class) * n + i] = ((h % 1000) as f32) / 1000.0;
        data[(4 + (class + 1) % NUM_CLASSES) * n + i] = ((h % 300) as f32) / 1000.0;
    }
    data
}

fn bench_pipeline(c: &mut Criterion) {
    let data = make_tensor();
    let quantized: Vec<u8> = data
        .iter()
        .map(|v| (v * 255.0).clamp(0.0, 255.0) as u8)
        .collect();
    let labels = LabelVocabulary::new((0..NUM_CLASSES).map(|i| format!("class{i}"))).unwrap();
    let model = ModelSpec::new(
        vec![1, 4 + NUM_CLASSES, NUM_ANCHORS],
        ImageSize::new(640, 640).unwrap(),
    );
    let image = ImageSize::new(1920, 1080).unwrap();

    let layout = TensorLayout::resolve(&model.output_shape, NUM_CLASSES).unwrap();
    let view = TensorView::new(&data, layout, Quantization::default()).unwrap();
    c.bench_function("decode_8400x80_f32", |b| {
        b.iter(|| black_box(decode_candidates(&view)));
    });

    let pipeline =
        DetectionPipeline::new(labels.clone(), &model, PipelineConfig::default()).unwrap();
    c.bench_function("pipeline_8400x80_f32", |b| {
        b.iter(|| {
            black_box(
                pipeline
                    .detect(Frame::new(TensorData::F32(&data), image))
                    .unwrap(),
            )
        });
    });

    c.bench_function("pipeline_8400x80_u8", |b| {
        b.iter(|| {
            black_box(
                pipeline
                    .detect(Frame::new(
                        TensorData::U8 {
                            data: &quantized,
                            quant: Quantization::new(1.0 / 255.0, 0),
                        },
                        image,
                    ))
                    .unwrap(),
            )
        });
    });

    let mut session = pipeline.clone().into_stream(StreamConfig {
        min_interval: Duration::ZERO,
    });
    c.bench_function("stream_8400x80_f32", |b| {
        b.iter(|| {
            black_box(
                session
                    .process(Instant::now(), Frame::new(TensorData::F32(&data), image))
                    .unwrap(),
            )
        });
    });

    #[cfg(feature = "rayon")]
    {
        let parallel = DetectionPipeline::new(
            labels,
            &model,
            PipelineConfig {
                parallel: true,
                ..PipelineConfig::default()
            },
        )
        .unwrap();
        c.bench_function("pipeline_8400x80_f32_parallel", |b| {
            b.iter(|| {
                black_box(
                    parallel
                        .detect(Frame::new(TensorData::F32(&data), image))
                        .unwrap(),
                )
            });
        });
    }
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
