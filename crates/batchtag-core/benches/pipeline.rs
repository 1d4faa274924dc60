//! Benchmarks for the batchtag tagging pipeline.
//!
//! Run with: cargo bench -p batchtag-core

use batchtag_core::pipeline::{compose, preprocess};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};

/// Edge of the v3 tagger family.
const EDGE: u32 = 448;

/// Roughly the size of a WD v3 label file.
const LABEL_COUNT: usize = 10_861;

fn benchmark_prepare(c: &mut Criterion) {
    let landscape = RgbImage::from_pixel(1920, 1080, Rgb([120, 80, 40]));
    let square = RgbImage::from_pixel(EDGE, EDGE, Rgb([120, 80, 40]));

    c.bench_function("prepare_1920x1080", |b| {
        b.iter(|| {
            let _ = preprocess::prepare(black_box(&landscape), EDGE);
        })
    });

    c.bench_function("prepare_448_no_resize", |b| {
        b.iter(|| {
            let _ = preprocess::prepare(black_box(&square), EDGE);
        })
    });
}

fn benchmark_compose(c: &mut Criterion) {
    let labels: Vec<String> = (0..LABEL_COUNT).map(|i| format!("label_{i}")).collect();
    let probabilities: Vec<f32> = (0..LABEL_COUNT)
        .map(|i| (i % 100) as f32 / 100.0)
        .collect();

    c.bench_function("compose_wd_v3_labels", |b| {
        b.iter(|| {
            compose(
                black_box(&labels),
                black_box(&probabilities),
                0.35,
                "label_1, label_2, label_3",
                true,
                "studio",
            )
        })
    });
}

criterion_group!(benches, benchmark_prepare, benchmark_compose);
criterion_main!(benches);
