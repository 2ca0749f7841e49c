//! File-based backing file for persistent logs.

use crate::backend::{align_up, BackingFile};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-based backing file.
///
/// This backend stores the log in a regular OS file. Data survives
/// process restarts.
///
/// # Writers and readers
///
/// - [`FileBackend::open`] takes an exclusive advisory lock, so at most one
///   process records into a file at a time.
/// - [`FileBackend::open_read_only`] takes no lock. Tailing readers use it
///   while a writer is active and see the file grow as they read.
///
/// # Allocation
///
/// Growth goes through `fs2::FileExt::allocate`, so a full disk is reported
/// when the region is allocated rather than later, when it is written.
///
/// # Example
///
/// ```no_run
/// use serieslog_storage::{BackingFile, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("events.log")).unwrap();
/// let offset = backend.allocate(64).unwrap();
/// backend.write_u64(offset, 7).unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
    read_only: bool,
    max_size: Option<u64>,
}

impl FileBackend {
    /// Opens or creates a file for writing and takes the writer lock.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another writer holds the file,
    /// or an I/O error if it cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                return Err(StorageError::Locked);
            }
            return Err(StorageError::Io(e));
        }

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
            read_only: false,
            max_size: None,
        })
    }

    /// Opens or creates a file for writing, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Opens an existing file for reading only, without taking any lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
            read_only: true,
            max_size: None,
        })
    }

    /// Caps the file at `max_size` bytes; allocations beyond it fail.
    #[must_use]
    pub fn with_limit(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if this handle cannot allocate or write.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Re-reads the file length. Readers call this to observe writer growth.
    fn refresh_size(&self) -> StorageResult<u64> {
        let len = self.file.read().metadata()?.len();
        let mut size = self.size.write();
        if len > *size {
            *size = len;
        }
        Ok(*size)
    }
}

impl BackingFile for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut size = *self.size.read();
        let end = offset.saturating_add(len as u64);

        if end > size && self.read_only {
            size = self.refresh_size()?;
        }

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }

        let size = *self.size.read();
        let end = offset.saturating_add(data.len() as u64);
        if offset > size || end > size {
            return Err(StorageError::WritePastEnd {
                offset,
                len: data.len(),
                size,
            });
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        Ok(())
    }

    fn allocate(&mut self, len: usize) -> StorageResult<u64> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        if len == 0 {
            return Err(StorageError::allocation_failed(0, "zero-sized allocation"));
        }

        let file = self.file.write();
        let mut size = self.size.write();

        let offset = align_up(*size);
        let end = offset + len as u64;

        if let Some(limit) = self.max_size {
            if end > limit {
                return Err(StorageError::LimitExceeded {
                    requested: end,
                    limit,
                });
            }
        }

        file.allocate(end)
            .map_err(|e| StorageError::allocation_failed(len, e.to_string()))?;
        if file.metadata()?.len() < end {
            file.set_len(end)?;
        }
        *size = end;

        Ok(offset)
    }

    fn size(&self) -> StorageResult<u64> {
        if self.read_only {
            return self.refresh_size();
        }
        Ok(*self.size.read())
    }

    fn flush(&mut self) -> StorageResult<()> {
        let mut file = self.file.write();
        file.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.read_only {
            return Ok(());
        }
        let file = self.file.write();
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn file_allocate_write_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let mut backend = FileBackend::open(&path).unwrap();

        let a = backend.allocate(5).unwrap();
        let b = backend.allocate(16).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 8);
        assert_eq!(backend.size().unwrap(), 24);

        backend.write_at(b, b"hello world").unwrap();
        assert_eq!(backend.read_at(b, 11).unwrap(), b"hello world");
        assert_eq!(backend.read_at(b + 11, 5).unwrap(), vec![0u8; 5]);
    }

    #[test]
    fn file_write_past_end_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.allocate(8).unwrap();

        let result = backend.write_at(4, b"overflow");
        assert!(matches!(result, Err(StorageError::WritePastEnd { .. })));
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            let offset = backend.allocate(16).unwrap();
            backend.write_u64(offset + 8, 99).unwrap();
            backend.sync().unwrap();
        }

        {
            let backend = FileBackend::open(&path).unwrap();
            assert_eq!(backend.size().unwrap(), 16);
            assert_eq!(backend.read_u64(8).unwrap(), 99);
        }
    }

    #[test]
    fn file_second_writer_is_locked_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let _writer = FileBackend::open(&path).unwrap();
        let second = FileBackend::open(&path);
        assert!(matches!(second, Err(StorageError::Locked)));
    }

    #[test]
    fn file_reader_sees_writer_growth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let mut writer = FileBackend::open(&path).unwrap();
        writer.allocate(8).unwrap();

        let reader = FileBackend::open_read_only(&path).unwrap();
        assert_eq!(reader.size().unwrap(), 8);

        let offset = writer.allocate(8).unwrap();
        writer.write_u64(offset, 1234).unwrap();
        writer.flush().unwrap();

        assert_eq!(reader.read_u64(offset).unwrap(), 1234);
    }

    #[test]
    fn file_read_only_rejects_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");
        {
            let mut writer = FileBackend::open(&path).unwrap();
            writer.allocate(8).unwrap();
        }

        let mut reader = FileBackend::open_read_only(&path).unwrap();
        assert!(reader.is_read_only());
        assert!(matches!(reader.allocate(8), Err(StorageError::ReadOnly)));
        assert!(matches!(reader.write_u64(0, 1), Err(StorageError::ReadOnly)));
    }

    #[test]
    fn file_limit_rejects_growth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");

        let mut backend = FileBackend::open(&path).unwrap().with_limit(16);
        backend.allocate(16).unwrap();

        let result = backend.allocate(1);
        assert!(matches!(result, Err(StorageError::LimitExceeded { .. })));
        assert_eq!(backend.size().unwrap(), 16);
    }

    #[test]
    fn file_create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("path").join("test.log");

        let backend = FileBackend::open_with_create_dirs(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
        assert_eq!(backend.path(), path);
    }
}
