//! Backing file benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serieslog_bench::utils::random_data;
use serieslog_storage::{BackingFile, FileBackend, InMemoryBackend, NULL_REF};
use tempfile::TempDir;

/// Benchmark linked allocations, the operation behind every node and page.
fn bench_allocate_linked(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_linked");

    for size in [64usize, 1024, 16 * 1024].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut backend = InMemoryBackend::new();
            let mut prev = NULL_REF;

            b.iter(|| {
                prev = backend.allocate_linked(black_box(size), prev).unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark in-place writes of record-sized slots.
fn bench_write_slot(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_slot");

    for size in [8usize, 16, 64].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut backend = InMemoryBackend::new();
            let node = backend.allocate(size * 1024).unwrap();
            let data = random_data(size);
            let mut slot = 0u64;

            b.iter(|| {
                let at = node + (slot % 1024) * size as u64;
                backend.write_at(black_box(at), black_box(&data)).unwrap();
                slot += 1;
            });
        });
    }

    group.finish();
}

/// Benchmark the same writes against a real file.
fn bench_file_write_slot(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_write_slot");
    group.sample_size(20);

    let temp_dir = TempDir::new().unwrap();
    let mut backend = FileBackend::open(&temp_dir.path().join("bench.dat")).unwrap();
    let node = backend.allocate(64 * 1024).unwrap();
    let data = random_data(64);
    let mut slot = 0u64;

    group.throughput(Throughput::Bytes(64));
    group.bench_function("64", |b| {
        b.iter(|| {
            let at = node + (slot % 1024) * 64;
            backend.write_at(black_box(at), black_box(&data)).unwrap();
            slot += 1;
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_allocate_linked,
    bench_write_slot,
    bench_file_write_slot
);
criterion_main!(benches);
