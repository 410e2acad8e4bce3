use criterion::{black_box, criterion_group, criterion_main, Criterion};
use voxel_subsample::processors::batch::batch_offsets;
use voxel_subsample::{subsample, subsample_batch, subsample_batch_with, Array, SubsampleConfig};

fn synthetic_points(n: usize) -> Vec<[f32; 3]> {
    (0..n)
        .map(|i| {
            let f = i as f32;
            [(f * 0.37) % 50.0, (f * 0.11) % 20.0, (f * 0.53) % 5.0]
        })
        .collect()
}

fn bench_subsample_single(c: &mut Criterion) {
    let n = 200_000usize;
    let points = Array::from_points(&synthetic_points(n));
    let features = Array::from_f32(vec![n, 4], (0..n * 4).map(|i| (i % 97) as f32).collect())
        .expect("valid features");
    let labels = Array::from_i32_vec((0..n).map(|i| (i % 13) as i32).collect());

    c.bench_function("subsample_200k_points_only", |b| {
        b.iter(|| {
            let out = subsample(Some(black_box(&points)), 0.2, None, None).expect("subsample");
            black_box(out);
        });
    });

    c.bench_function("subsample_200k_features_labels", |b| {
        b.iter(|| {
            let out = subsample(
                Some(black_box(&points)),
                0.2,
                Some(&features),
                Some(&labels),
            )
            .expect("subsample");
            black_box(out);
        });
    });
}

fn bench_subsample_batch(c: &mut Criterion) {
    let clouds = 16usize;
    let per_cloud = 25_000usize;
    let points = Array::from_points(&synthetic_points(clouds * per_cloud));
    let sizes = Array::from_i32_vec(vec![per_cloud as i32; clouds]);
    let labels = Array::from_i32_vec((0..clouds * per_cloud).map(|i| (i % 7) as i32).collect());

    c.bench_function("subsample_batch_16x25k_parallel", |b| {
        b.iter(|| {
            let out = subsample_batch(Some(black_box(&points)), Some(&sizes), 0.2, None, Some(&labels))
                .expect("subsample_batch");
            black_box(out);
        });
    });

    let sequential = SubsampleConfig {
        cell_size: 0.2,
        parallel_batches: false,
    };
    c.bench_function("subsample_batch_16x25k_sequential", |b| {
        b.iter(|| {
            let out = subsample_batch_with(
                Some(black_box(&points)),
                Some(&sizes),
                None,
                Some(&labels),
                &sequential,
            )
            .expect("subsample_batch");
            black_box(out);
        });
    });
}

fn bench_batch_offsets(c: &mut Criterion) {
    let sizes: Vec<usize> = (0..1_000_000).map(|i| i % 1000).collect();

    c.bench_function("batch_offsets_1m", |b| {
        b.iter(|| {
            let offsets = batch_offsets(black_box(&sizes));
            black_box(offsets);
        });
    });
}

criterion_group!(
    benches,
    bench_subsample_single,
    bench_subsample_batch,
    bench_batch_offsets
);
criterion_main!(benches);
