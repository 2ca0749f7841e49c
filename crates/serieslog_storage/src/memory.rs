//! In-memory backing file for testing.

use crate::backend::{align_up, BackingFile};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// An in-memory backing file.
///
/// This backend keeps the whole log in a `Vec<u8>` and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral logs that don't need persistence
///
/// An optional size limit simulates a file that cannot grow any further,
/// which is how allocation failures are exercised in tests.
///
/// # Example
///
/// ```rust
/// use serieslog_storage::{BackingFile, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let first = backend.allocate(5).unwrap();
/// let second = backend.allocate(8).unwrap();
/// assert_eq!(first, 0);
/// assert_eq!(second, 8);
/// assert_eq!(backend.size().unwrap(), 16);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
    max_size: Option<u64>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory backend that refuses to grow past `max_size` bytes.
    #[must_use]
    pub fn with_limit(max_size: u64) -> Self {
        Self {
            data: RwLock::new(Vec::new()),
            max_size: Some(max_size),
        }
    }

    /// Creates a new in-memory backend with pre-existing data.
    ///
    /// Useful for testing resume scenarios.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
            max_size: None,
        }
    }

    /// Returns a copy of all data in the backend.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl BackingFile for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[offset as usize..end as usize].to_vec())
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        let end = offset.saturating_add(bytes.len() as u64);

        if offset > size || end > size {
            return Err(StorageError::WritePastEnd {
                offset,
                len: bytes.len(),
                size,
            });
        }

        data[offset as usize..end as usize].copy_from_slice(bytes);
        Ok(())
    }

    fn allocate(&mut self, size: usize) -> StorageResult<u64> {
        if size == 0 {
            return Err(StorageError::allocation_failed(0, "zero-sized allocation"));
        }

        let mut data = self.data.write();
        let offset = align_up(data.len() as u64);
        let end = offset + size as u64;

        if let Some(limit) = self.max_size {
            if end > limit {
                return Err(StorageError::LimitExceeded {
                    requested: end,
                    limit,
                });
            }
        }

        data.resize(end as usize, 0);
        Ok(offset)
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn flush(&mut self) -> StorageResult<()> {
        // Nothing is buffered
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }
}
