//! Benchmarks for the facades' batch paths and input adapters.
//!
//! Run with: cargo bench --bench batch_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vecbind::buffer::BufferView;
use vecbind::distance::MetricKind;
use vecbind::index::{Accuracy, DenseIndex, DenseParams, HashIndex, HashParams};
use vecbind::sets::validate_set;

const DIM: usize = 64;

/// Generate random row-major vectors for benchmarking.
fn generate_vectors(count: usize, dim: usize) -> Vec<f32> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..count * dim).map(|_| rng.gen::<f32>()).collect()
}

fn dense_index(dtype: Accuracy) -> DenseIndex {
    DenseIndex::new(
        DenseParams::new(DIM)
            .with_dtype(dtype)
            .with_metric(MetricKind::L2Squared),
    )
    .unwrap()
}

/// Batch insertion against the same rows added one at a time.
fn bench_dense_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("dense_add");
    group.sample_size(10);

    for size in [500, 2000] {
        let vectors = generate_vectors(size, DIM);
        let labels: Vec<i64> = (0..size as i64).collect();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("batch", size), &size, |b, &size| {
            b.iter(|| {
                let mut index = dense_index(Accuracy::F32);
                index
                    .add_batch(
                        &BufferView::from_slice(&labels),
                        &BufferView::from_matrix(black_box(&vectors), size, DIM).unwrap(),
                        true,
                    )
                    .unwrap();
                index
            });
        });

        group.bench_with_input(BenchmarkId::new("sequential", size), &size, |b, _| {
            b.iter(|| {
                let mut index = dense_index(Accuracy::F32);
                for (label, row) in vectors.chunks_exact(DIM).enumerate() {
                    index
                        .add(label as i64, &BufferView::from_slice(black_box(row)), true)
                        .unwrap();
                }
                index
            });
        });
    }

    group.finish();
}

/// Batch search with f32 queries against each storage accuracy.
fn bench_dense_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("dense_search");
    let size = 5000;
    let queries = 256;
    let vectors = generate_vectors(size, DIM);
    let labels: Vec<i64> = (0..size as i64).collect();
    let query_data = generate_vectors(queries, DIM);

    for dtype in [Accuracy::F16, Accuracy::F32, Accuracy::F64] {
        let mut index = dense_index(dtype);
        index
            .add_batch(
                &BufferView::from_slice(&labels),
                &BufferView::from_matrix(&vectors, size, DIM).unwrap(),
                true,
            )
            .unwrap();

        group.throughput(Throughput::Elements(queries as u64));
        group.bench_function(BenchmarkId::from_parameter(dtype), |b| {
            let batch = BufferView::from_matrix(&query_data, queries, DIM).unwrap();
            b.iter(|| index.search(black_box(&batch), 10).unwrap());
        });
    }

    group.finish();
}

fn bench_sketch(c: &mut Criterion) {
    let mut group = c.benchmark_group("sketch");

    for len in [16usize, 256, 4096] {
        let values: Vec<u64> = (0..len as u64).map(|v| v * 7919).collect();
        let mut index = HashIndex::new(HashParams::new(1024)).unwrap();
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                let words = index.hash(&BufferView::from_slice(black_box(&values))).unwrap();
                words[0]
            });
        });
    }

    group.finish();
}

fn bench_set_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_validation");

    for len in [64u32, 4096] {
        let set: Vec<u32> = (0..len).map(|v| v * 3).collect();
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| validate_set(&BufferView::from_slice(black_box(&set))).unwrap().len());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_dense_add,
    bench_dense_search,
    bench_sketch,
    bench_set_validation
);
criterion_main!(benches);
