//! The shared, typed series handle.

use crate::binding::{bind_recorder, Environment};
use crate::config::SeriesConfig;
use crate::error::CoreResult;
use crate::file::LogFile;
use crate::series::StoredSeries;
use crate::stats::StatsSnapshot;
use crate::types::{FileRef, StorageMode};
use parking_lot::Mutex;
use serieslog_codec::{Storable, TypeDesc};
use std::fmt;
use std::sync::Arc;

/// A named series of `T` values in a log file.
///
/// This is the handle most programs hold: construct it once at startup,
/// then record through it for the life of the process. Clones share one
/// writer, and a bound capability keeps that writer alive on its own.
///
/// # Example
///
/// ```rust
/// use serieslog_core::{LogFile, Series, SeriesConfig};
///
/// let file = LogFile::open_in_memory().unwrap();
///
/// let trades = Series::<(u64, f64)>::new(&file, "trades").unwrap();
/// trades.call(&(1, 99.5)).unwrap();
///
/// let seqs = Series::<u64>::with_config(&file, "seqs", SeriesConfig::compressed(1024)).unwrap();
/// seqs.record(&1, false).unwrap();
/// assert!(seqs.write_position().is_err());
/// ```
pub struct Series<T> {
    inner: Arc<Mutex<StoredSeries<T>>>,
}

impl<T: Storable> Series<T> {
    /// Creates or resumes a raw series with the default batch size.
    ///
    /// # Errors
    ///
    /// Returns the writer's construction error.
    pub fn new(file: &LogFile, name: &str) -> CoreResult<Self> {
        Self::with_config(file, name, SeriesConfig::default())
    }

    /// Creates or resumes a series with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns the writer's construction error.
    pub fn with_config(file: &LogFile, name: &str, config: SeriesConfig) -> CoreResult<Self> {
        Ok(Self::from_stored(StoredSeries::new(file, name, &config)?))
    }
}

impl<T> Series<T> {
    /// Wraps an already constructed writer.
    pub fn from_stored(series: StoredSeries<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(series)),
        }
    }

    /// Records one value, signalling readers if `signal` is set.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn record(&self, value: &T, signal: bool) -> CoreResult<()> {
        self.inner.lock().record(value, signal)
    }

    /// Records one value and signals readers.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn call(&self, value: &T) -> CoreResult<()> {
        self.record(value, true)
    }

    /// Starts a fresh chain (raw series only).
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::ModeMismatch`] for a compressed series.
    pub fn clear(&self, signal: bool) -> CoreResult<()> {
        self.inner.lock().clear(signal)
    }

    /// Returns the file offset of the next record (raw series only).
    ///
    /// Another clone recording in between invalidates the offset. Use
    /// [`Series::record_with_ref`] when the handle is shared.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::ModeMismatch`] for a compressed series.
    pub fn write_position(&self) -> CoreResult<u64> {
        self.inner.lock().write_position()
    }

    /// Records one value and returns a reference to it (raw series only).
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::ModeMismatch`] for a compressed series.
    pub fn record_with_ref(&self, value: &T, signal: bool) -> CoreResult<FileRef<T>> {
        self.inner.lock().record_with_ref(value, signal)
    }

    /// The series name.
    pub fn name(&self) -> String {
        self.inner.lock().name().to_string()
    }

    /// The storage mode.
    pub fn mode(&self) -> StorageMode {
        self.inner.lock().mode()
    }

    /// The persisted type.
    pub fn storage_type(&self) -> TypeDesc {
        self.inner.lock().storage_type()
    }

    /// A snapshot of the writer's statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.lock().stats().snapshot()
    }

    /// Runs `f` with exclusive access to the underlying writer.
    pub fn with_stored<R>(&self, f: impl FnOnce(&mut StoredSeries<T>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<T: 'static> Series<T> {
    /// Exposes [`Series::call`] in `env` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::BindingFailure`] if the environment
    /// refuses the name.
    pub fn bind_as(&self, env: &Environment, name: &str) -> CoreResult<()> {
        bind_recorder::<T, _>(Arc::clone(&self.inner), env, name)
    }
}

impl<T> Clone for Series<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Series<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Series").field(&*self.inner.lock()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BATCH_SIZE;
    use crate::error::CoreError;
    use std::thread;

    #[test]
    fn default_series_is_raw_with_default_batch() {
        let file = LogFile::open_in_memory().unwrap();
        let series = Series::<i64>::new(&file, "ticks").unwrap();
        assert_eq!(series.mode(), StorageMode::Raw);
        series.with_stored(|s| assert_eq!(s.batch_size(), DEFAULT_BATCH_SIZE));
        assert_eq!(series.name(), "ticks");
        assert_eq!(file.descriptor("ticks").unwrap().batch_size, 10_000);
    }

    #[test]
    fn clones_share_one_writer() {
        let file = LogFile::open_in_memory().unwrap();
        let series = Series::<u32>::with_config(&file, "a", SeriesConfig::raw(16)).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let series = series.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        series.call(&(t * 100 + i)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let stats = series.stats();
        assert_eq!(stats.records, 100);
        assert_eq!(stats.nodes_allocated, 7);
    }

    #[test]
    fn binding_outlives_the_handle() {
        let file = LogFile::open_in_memory().unwrap();
        let env = Environment::new();
        {
            let series = Series::<u8>::with_config(&file, "a", SeriesConfig::raw(4)).unwrap();
            series.bind_as(&env, "a").unwrap();
        }
        // The writer slot is still held by the binding
        assert!(file.has_writer("a"));
        env.invoke("a", &1u8).unwrap();

        env.unbind("a");
        assert!(!file.has_writer("a"));
    }

    #[test]
    fn compressed_handle_rejects_positions() {
        let file = LogFile::open_in_memory().unwrap();
        let series = Series::<u64>::with_config(&file, "a", SeriesConfig::compressed(8)).unwrap();
        series.call(&1).unwrap();
        assert!(matches!(
            series.write_position(),
            Err(CoreError::ModeMismatch { .. })
        ));
        assert!(matches!(series.clear(true), Err(CoreError::ModeMismatch { .. })));
    }
}
