//! Series record throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serieslog_bench::utils::{random_prices, slow_counter};
use serieslog_core::{LogFile, Series, SeriesConfig};
use tempfile::TempDir;

const VALUES: usize = 4096;

/// Benchmark raw records across batch sizes.
fn bench_raw_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("raw_record");
    let prices = random_prices(VALUES);

    for batch in [64usize, 1024, 10_000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(batch), batch, |b, &batch| {
            let file = LogFile::open_in_memory().unwrap();
            let series =
                Series::<(u64, f64)>::with_config(&file, "ticks", SeriesConfig::raw(batch))
                    .unwrap();
            let mut i = 0usize;

            b.iter(|| {
                let tick = (i as u64, prices[i % VALUES]);
                series.record(black_box(&tick), false).unwrap();
                i += 1;
            });
        });
    }

    group.finish();
}

/// Benchmark compressed records of a slowly moving counter.
fn bench_compressed_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("compressed_record");
    let counter = slow_counter(VALUES);

    for batch in [256usize, 4096].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(batch), batch, |b, &batch| {
            let file = LogFile::open_in_memory().unwrap();
            let series =
                Series::<u64>::with_config(&file, "seq", SeriesConfig::compressed(batch)).unwrap();
            let mut i = 0usize;

            b.iter(|| {
                series.record(black_box(&counter[i % VALUES]), false).unwrap();
                i += 1;
            });
        });
    }

    group.finish();
}

/// Benchmark the cost of signalling a subscribed reader.
fn bench_signal_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_overhead");
    group.throughput(Throughput::Elements(1));

    for signal in [false, true].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(signal), signal, |b, &signal| {
            let file = LogFile::open_in_memory().unwrap();
            let events = file.subscribe();
            let series = Series::<u64>::with_config(&file, "v", SeriesConfig::raw(1024)).unwrap();
            let mut i = 0u64;

            b.iter(|| {
                series.record(black_box(&i), signal).unwrap();
                i += 1;
                // Keep the channel from growing without bound
                while events.try_recv().is_ok() {}
            });
        });
    }

    group.finish();
}

/// Benchmark raw records into a file-backed log.
fn bench_file_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_record");
    group.sample_size(20);
    group.throughput(Throughput::Elements(1));

    group.bench_function("raw_u64", |b| {
        let temp_dir = TempDir::new().unwrap();
        let file = LogFile::open(&temp_dir.path().join("bench.slog")).unwrap();
        let series = Series::<u64>::with_config(&file, "v", SeriesConfig::raw(4096)).unwrap();
        let mut i = 0u64;

        b.iter(|| {
            series.record(black_box(&i), false).unwrap();
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_raw_record,
    bench_compressed_record,
    bench_signal_overhead,
    bench_file_record
);
criterion_main!(benches);
