//! Error types for serieslog core.

use crate::types::StorageMode;
use serieslog_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while recording series.
///
/// Every error surfaces synchronously to the caller. Nothing in this crate
/// retries.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Backing file error outside of an allocation.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Encoder or model error.
    #[error("codec error: {0}")]
    Codec(#[from] serieslog_codec::CodecError),

    /// The backing file could not satisfy a node, region or model allocation.
    #[error("allocation of {size} bytes for series '{series}' failed: {source}")]
    AllocationFailure {
        /// Series that requested the allocation.
        series: String,
        /// Requested size in bytes.
        size: usize,
        /// Underlying backing file error.
        #[source]
        source: StorageError,
    },

    /// The operation has no meaning for the series' storage mode.
    #[error("{operation} is not supported by {mode} series")]
    ModeMismatch {
        /// The rejected operation.
        operation: String,
        /// The series' storage mode.
        mode: StorageMode,
    },

    /// The environment refused a binding.
    #[error("cannot bind '{name}': {reason}")]
    BindingFailure {
        /// Binding name.
        name: String,
        /// Why the binding was refused.
        reason: String,
    },

    /// A series with this name exists with an incompatible descriptor.
    #[error("series '{name}' cannot be resumed: {message}")]
    SeriesMismatch {
        /// Series name.
        name: String,
        /// What differs.
        message: String,
    },

    /// Another writer for this series is still alive.
    #[error("series '{name}' already has a live writer")]
    SeriesInUse {
        /// Series name.
        name: String,
    },

    /// The file contents are not a valid log file.
    #[error("invalid log file format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Operation not permitted with the given arguments.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an allocation failure error.
    pub fn allocation_failure(series: impl Into<String>, size: usize, source: StorageError) -> Self {
        Self::AllocationFailure {
            series: series.into(),
            size,
            source,
        }
    }

    /// Creates a mode mismatch error.
    pub fn mode_mismatch(operation: impl Into<String>, mode: StorageMode) -> Self {
        Self::ModeMismatch {
            operation: operation.into(),
            mode,
        }
    }

    /// Creates a binding failure error.
    pub fn binding_failure(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BindingFailure {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a series mismatch error.
    pub fn series_mismatch(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SeriesMismatch {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a series in use error.
    pub fn series_in_use(name: impl Into<String>) -> Self {
        Self::SeriesInUse { name: name.into() }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for [`CoreError::ModeMismatch`].
    pub fn is_mode_mismatch(&self) -> bool {
        matches!(self, Self::ModeMismatch { .. })
    }

    /// Returns true for [`CoreError::AllocationFailure`].
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Self::AllocationFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_mismatch_names_operation_and_mode() {
        let err = CoreError::mode_mismatch("write_position", StorageMode::Compressed);
        assert!(err.is_mode_mismatch());
        assert_eq!(
            err.to_string(),
            "write_position is not supported by compressed series"
        );
    }

    #[test]
    fn allocation_failure_keeps_source() {
        let err = CoreError::allocation_failure(
            "ticks",
            4096,
            StorageError::LimitExceeded {
                requested: 8192,
                limit: 4096,
            },
        );
        assert!(err.is_allocation_failure());
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("ticks"));
    }
}
