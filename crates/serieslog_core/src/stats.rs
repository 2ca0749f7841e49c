//! Per-series recording statistics.
//!
//! # Usage
//!
//! ```rust
//! use serieslog_core::{LogFile, Series};
//!
//! let file = LogFile::open_in_memory().unwrap();
//! let ticks = Series::<i64>::new(&file, "ticks").unwrap();
//! ticks.call(&42).unwrap();
//!
//! let stats = ticks.stats();
//! assert_eq!(stats.records, 1);
//! assert_eq!(stats.bytes, 8);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by one series writer.
///
/// All counters are atomic and can be read while the writer is recording.
/// They cover this writer's lifetime only and are not persisted.
#[derive(Debug, Default)]
pub struct SeriesStats {
    /// Records accepted.
    records: AtomicU64,
    /// Encoded bytes produced.
    bytes: AtomicU64,
    /// Batch nodes allocated, including the first.
    nodes_allocated: AtomicU64,
    /// Compressed regions retired.
    regions_retired: AtomicU64,
    /// Clears performed.
    clears: AtomicU64,
    /// Signals sent to readers.
    signals: AtomicU64,
}

impl SeriesStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, bytes: u64) {
        self.records.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn node_allocated(&self) {
        self.nodes_allocated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn region_retired(&self) {
        self.regions_retired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn signal(&self) {
        self.signals.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of records accepted.
    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    /// Returns the number of encoded bytes produced.
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Returns the number of batch nodes allocated.
    pub fn nodes_allocated(&self) -> u64 {
        self.nodes_allocated.load(Ordering::Relaxed)
    }

    /// Returns the number of regions retired.
    pub fn regions_retired(&self) -> u64 {
        self.regions_retired.load(Ordering::Relaxed)
    }

    /// Returns the number of clears.
    pub fn clears(&self) -> u64 {
        self.clears.load(Ordering::Relaxed)
    }

    /// Returns the number of signals sent.
    pub fn signals(&self) -> u64 {
        self.signals.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            records: self.records(),
            bytes: self.bytes(),
            nodes_allocated: self.nodes_allocated(),
            regions_retired: self.regions_retired(),
            clears: self.clears(),
            signals: self.signals(),
        }
    }
}

/// A point-in-time copy of [`SeriesStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Records accepted.
    pub records: u64,
    /// Encoded bytes produced.
    pub bytes: u64,
    /// Batch nodes allocated.
    pub nodes_allocated: u64,
    /// Compressed regions retired.
    pub regions_retired: u64,
    /// Clears performed.
    pub clears: u64,
    /// Signals sent.
    pub signals: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        assert_eq!(SeriesStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_counts_bytes() {
        let stats = SeriesStats::new();
        stats.record(8);
        stats.record(8);
        stats.add_bytes(3);
        stats.signal();

        let snap = stats.snapshot();
        assert_eq!(snap.records, 2);
        assert_eq!(snap.bytes, 19);
        assert_eq!(snap.signals, 1);
    }

    #[test]
    fn concurrent_readers_see_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(SeriesStats::new());
        let writer = {
            let s = Arc::clone(&stats);
            thread::spawn(move || {
                for _ in 0..1000 {
                    s.record(1);
                }
            })
        };
        while stats.records() < 1000 {
            thread::yield_now();
        }
        writer.join().unwrap();
        assert_eq!(stats.bytes(), 1000);
    }
}
