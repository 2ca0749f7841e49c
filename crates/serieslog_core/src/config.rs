//! Log file and series configuration.

use crate::error::{CoreError, CoreResult};
use crate::layout::MIN_PAGE_SIZE;
use crate::types::{RetirePolicy, StorageMode};

/// Records per batch when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Region page size when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Configuration for opening a log file.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the file if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to sync the file after each compressed region retires.
    pub sync_on_retire: bool,

    /// Whether to sync the file after a raw series is cleared.
    pub sync_on_clear: bool,

    /// Growth limit for the backing file, in bytes.
    pub max_file_size: Option<u64>,

    /// Format version to use for new files.
    pub format_version: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_retire: true,
            sync_on_clear: false,
            max_file_size: None,
            format_version: 1,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the file if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync after a region retires.
    #[must_use]
    pub const fn sync_on_retire(mut self, value: bool) -> Self {
        self.sync_on_retire = value;
        self
    }

    /// Sets whether to sync after a clear.
    #[must_use]
    pub const fn sync_on_clear(mut self, value: bool) -> Self {
        self.sync_on_clear = value;
        self
    }

    /// Sets the backing file growth limit.
    #[must_use]
    pub const fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = Some(size);
        self
    }
}

/// Configuration for a single series.
#[derive(Debug, Clone)]
pub struct SeriesConfig {
    /// Records per batch node (raw) or per region (compressed).
    pub batch_size: usize,

    /// Storage mode, fixed for the life of the series.
    pub mode: StorageMode,

    /// When compressed regions retire.
    pub retire_policy: RetirePolicy,

    /// Size of the pages that hold a region's encoded bytes.
    pub region_page_size: usize,

    /// Whether an existing series with the same name may be resumed.
    pub resume: bool,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            mode: StorageMode::Raw,
            retire_policy: RetirePolicy::RecordCount,
            region_page_size: DEFAULT_PAGE_SIZE,
            resume: true,
        }
    }
}

impl SeriesConfig {
    /// Creates a new series configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a raw series with the given batch size.
    #[must_use]
    pub fn raw(batch_size: usize) -> Self {
        Self::default().batch_size(batch_size)
    }

    /// Shorthand for a compressed series with the given batch size.
    #[must_use]
    pub fn compressed(batch_size: usize) -> Self {
        Self::default()
            .mode(StorageMode::Compressed)
            .batch_size(batch_size)
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn batch_size(mut self, value: usize) -> Self {
        self.batch_size = value;
        self
    }

    /// Sets the storage mode.
    #[must_use]
    pub const fn mode(mut self, value: StorageMode) -> Self {
        self.mode = value;
        self
    }

    /// Sets the retire policy.
    #[must_use]
    pub const fn retire_policy(mut self, value: RetirePolicy) -> Self {
        self.retire_policy = value;
        self
    }

    /// Sets the region page size.
    #[must_use]
    pub const fn region_page_size(mut self, value: usize) -> Self {
        self.region_page_size = value;
        self
    }

    /// Sets whether an existing series may be resumed.
    #[must_use]
    pub const fn resume(mut self, value: bool) -> Self {
        self.resume = value;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] for a zero batch size or a
    /// page size that is too small or not a multiple of 8.
    pub fn validate(&self) -> CoreResult<()> {
        if self.batch_size == 0 {
            return Err(CoreError::invalid_operation("batch size must be at least 1"));
        }
        if self.region_page_size < MIN_PAGE_SIZE || self.region_page_size % 8 != 0 {
            return Err(CoreError::invalid_operation(format!(
                "region page size {} must be a multiple of 8 and at least {MIN_PAGE_SIZE}",
                self.region_page_size
            )));
        }
        Ok(())
    }
}
