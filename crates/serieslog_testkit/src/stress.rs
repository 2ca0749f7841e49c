//! Stress tests for serieslog.
//!
//! These helpers record from many threads into one log file while a
//! reader tails the signal channel, then read every series back.

use crate::inspect::{read_compressed, read_raw};
use serieslog_codec::models::DeltaModel;
use serieslog_core::{EventKind, LogFile, Series, SeriesConfig, StorageMode};
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total records attempted.
    pub total_ops: usize,
    /// Records that succeeded.
    pub successful_ops: usize,
    /// Records that failed.
    pub failed_ops: usize,
    /// Append signals the tailing reader received.
    pub signals_seen: usize,
    /// Whether every series read back exactly as recorded.
    pub verified: bool,
    /// Total duration.
    pub duration: Duration,
    /// Records per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    fn new(
        successful: usize,
        failed: usize,
        signals_seen: usize,
        verified: bool,
        duration: Duration,
    ) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            signals_seen,
            verified,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total records: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Signals seen: {}", self.signals_seen);
        println!("Verified: {}", self.verified);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} records/sec", self.ops_per_second);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of series, each recorded by its own thread.
    pub series: usize,
    /// Records per series.
    pub records_per_series: u64,
    /// Batch size of every series.
    pub batch_size: usize,
    /// Storage mode of every series.
    pub mode: StorageMode,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            series: 4,
            records_per_series: 10_000,
            batch_size: 256,
            mode: StorageMode::Raw,
        }
    }
}

/// Name of the `index`th stress series.
pub fn stress_series_name(index: usize) -> String {
    format!("stress.{index}")
}

/// Records `0..records_per_series` into each series from its own thread
/// while one reader counts append signals, then reads everything back.
pub fn stress_concurrent_series(file: &LogFile, config: &StressConfig) -> StressTestResult {
    let events = file.subscribe();
    let expected_signals = config.series * config.records_per_series as usize;

    let reader = thread::spawn(move || {
        let mut seen = 0usize;
        while seen < expected_signals {
            match events.recv_timeout(Duration::from_secs(5)) {
                Ok(event) if event.kind == EventKind::Appended => seen += 1,
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }
        seen
    });

    let start = Instant::now();
    let writers: Vec<_> = (0..config.series)
        .map(|index| {
            let file = file.clone();
            let series_config = SeriesConfig::new()
                .batch_size(config.batch_size)
                .mode(config.mode);
            let records = config.records_per_series;
            thread::spawn(move || {
                let series = match Series::<u64>::with_config(
                    &file,
                    &stress_series_name(index),
                    series_config,
                ) {
                    Ok(series) => series,
                    Err(_) => return (0, records as usize),
                };
                let mut successful = 0usize;
                let mut failed = 0usize;
                for value in 0..records {
                    match series.call(&value) {
                        Ok(()) => successful += 1,
                        Err(_) => failed += 1,
                    }
                }
                (successful, failed)
            })
        })
        .collect();

    let mut successful = 0usize;
    let mut failed = 0usize;
    for writer in writers {
        let (ok, err) = writer.join().unwrap_or((0, 0));
        successful += ok;
        failed += err;
    }
    let duration = start.elapsed();
    let signals_seen = reader.join().unwrap_or(0);

    let expected: Vec<u64> = (0..config.records_per_series).collect();
    let verified = (0..config.series).all(|index| {
        let name = stress_series_name(index);
        let values = match config.mode {
            StorageMode::Raw => read_raw::<u64>(file, &name),
            StorageMode::Compressed => {
                read_compressed::<u64>(file, &name, DeltaModel::<u64>::decode)
            }
        };
        values.map(|v| v == expected).unwrap_or(false)
    });

    debug!(
        successful,
        failed,
        signals_seen,
        verified,
        elapsed_ms = duration.as_millis() as u64,
        "stress run finished"
    );
    StressTestResult::new(successful, failed, signals_seen, verified, duration)
}
