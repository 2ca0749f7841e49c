//! Error types for backing file operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of the file.
    #[error("read beyond end of file: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current file size.
        size: u64,
    },

    /// Attempted to write outside any allocated region.
    #[error("write beyond end of file: offset {offset}, len {len}, size {size}")]
    WritePastEnd {
        /// The requested write offset.
        offset: u64,
        /// The requested write length.
        len: usize,
        /// The current file size.
        size: u64,
    },

    /// An allocation request could not be satisfied.
    #[error("allocation of {size} bytes failed: {reason}")]
    AllocationFailed {
        /// The requested allocation size.
        size: usize,
        /// Why the allocation failed.
        reason: String,
    },

    /// The file would grow past its configured limit.
    #[error("file growth limit exceeded: requested end {requested}, limit {limit}")]
    LimitExceeded {
        /// The file size the allocation would have produced.
        requested: u64,
        /// The configured maximum file size.
        limit: u64,
    },

    /// Another process holds the writer lock on this file.
    #[error("file locked: another writer has exclusive access")]
    Locked,

    /// The file was opened read-only.
    #[error("file is read-only")]
    ReadOnly,

    /// The file is corrupted.
    #[error("file corrupted: {0}")]
    Corrupted(String),
}

impl StorageError {
    /// Creates an allocation failed error.
    pub fn allocation_failed(size: usize, reason: impl Into<String>) -> Self {
        Self::AllocationFailed {
            size,
            reason: reason.into(),
        }
    }

    /// Returns true if this error means the file could not grow.
    #[must_use]
    pub fn is_allocation_failure(&self) -> bool {
        matches!(
            self,
            Self::AllocationFailed { .. } | Self::LimitExceeded { .. }
        )
    }
}
