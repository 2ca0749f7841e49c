//! Test fixtures and log file helpers.
//!
//! Provides convenience functions for setting up log files and common
//! recording scenarios.

use serieslog_core::{Config, LogFile, Series, SeriesConfig, Storable};
use serieslog_storage::InMemoryBackend;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LOG_NAME: &str = "test.slog";

/// A test log file with automatic cleanup.
pub struct TestLog {
    /// The log file.
    pub file: LogFile,
    path: Option<PathBuf>,
    _temp_dir: Option<TempDir>,
}

impl TestLog {
    /// Creates a new in-memory test log.
    pub fn memory() -> Self {
        Self {
            file: LogFile::open_in_memory().expect("Failed to open in-memory log"),
            path: None,
            _temp_dir: None,
        }
    }

    /// Creates an in-memory test log that refuses to grow past `limit` bytes.
    pub fn memory_with_limit(limit: u64) -> Self {
        let file = LogFile::open_with_backend(
            Box::new(InMemoryBackend::with_limit(limit)),
            Config::default(),
        )
        .expect("Failed to open limited log");
        Self {
            file,
            path: None,
            _temp_dir: None,
        }
    }

    /// Creates a new log in a temporary directory.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a new log in a temporary directory with `config`.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(LOG_NAME);
        let file = LogFile::open_with_config(&path, config).expect("Failed to open file log");

        Self {
            file,
            path: Some(path),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the log path if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Closes and reopens a file-based log.
    ///
    /// Every other handle to the log, series included, must already be
    /// dropped so the file lock is released.
    pub fn reopen(self) -> Self {
        let Self {
            file,
            path,
            _temp_dir,
        } = self;
        let config = file.config().clone();
        drop(file);

        let path = path.expect("Only file-based logs can be reopened");
        let file = LogFile::open_with_config(&path, config).expect("Failed to reopen log");
        Self {
            file,
            path: Some(path),
            _temp_dir,
        }
    }

    /// Returns every byte of the log.
    pub fn snapshot(&self) -> Vec<u8> {
        let size = self.file.size().expect("Failed to size log");
        self.file
            .read_at(0, size as usize)
            .expect("Failed to read log")
    }
}

impl std::ops::Deref for TestLog {
    type Target = LogFile;

    fn deref(&self) -> &Self::Target {
        &self.file
    }
}

/// Runs a test with a temporary in-memory log.
///
/// # Example
///
/// ```rust
/// use serieslog_testkit::with_temp_log;
///
/// with_temp_log(|log| {
///     assert!(log.series_names().is_empty());
/// });
/// ```
pub fn with_temp_log<F, R>(f: F) -> R
where
    F: FnOnce(&LogFile) -> R,
{
    let log = TestLog::memory();
    f(&log.file)
}

/// Runs a test with a temporary file-based log.
pub fn with_file_log<F, R>(f: F) -> R
where
    F: FnOnce(&LogFile, &Path) -> R,
{
    let log = TestLog::file();
    let path = log.path().expect("File log should have a path").to_path_buf();
    f(&log.file, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a log holding one raw `u64` series with `count` records `0..count`.
    pub fn populated_raw(name: &str, batch_size: usize, count: u64) -> TestLog {
        let log = TestLog::memory();
        record_all::<u64>(&log, name, SeriesConfig::raw(batch_size), 0..count);
        log
    }

    /// Creates a log holding one compressed `u64` series with `count` records `0..count`.
    ///
    /// The writer is dropped before returning, which retires any partial region.
    pub fn populated_compressed(name: &str, batch_size: usize, count: u64) -> TestLog {
        let log = TestLog::memory();
        record_all::<u64>(&log, name, SeriesConfig::compressed(batch_size), 0..count);
        log
    }

    /// Records every value of `values` into a fresh series, then drops the writer.
    pub fn record_all<T: Storable>(
        file: &LogFile,
        name: &str,
        config: SeriesConfig,
        values: impl IntoIterator<Item = T>,
    ) {
        let series = Series::<T>::with_config(file, name, config).expect("Failed to create series");
        for value in values {
            series.call(&value).expect("Failed to record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_log_starts_empty() {
        let log = TestLog::memory();
        assert!(log.series_names().is_empty());
        assert!(log.path().is_none());
    }

    #[test]
    fn file_log_survives_reopen() {
        let log = TestLog::file();
        scenarios::record_all::<u32>(&log, "a", SeriesConfig::raw(4), 0..3);

        let log = log.reopen();
        assert_eq!(log.series_names(), vec!["a"]);
    }

    #[test]
    fn snapshot_covers_the_whole_file() {
        let log = scenarios::populated_raw("a", 4, 9);
        assert_eq!(log.snapshot().len() as u64, log.size().unwrap());
    }
}
