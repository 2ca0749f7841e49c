//! The shared log file.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::layout::{
    entry_size, link_offset, FileHeader, DIRECTORY_HEAD, ENTRY_DESCRIPTOR, ENTRY_DESCRIPTOR_LEN,
    ENTRY_ROOT, FILE_HEADER_SIZE, FORMAT_VERSION,
};
use crate::signal::{SeriesEvent, SignalHub};
use crate::types::SeriesDescriptor;
use parking_lot::{Mutex, RwLock};
use serieslog_codec::{from_cbor, to_cbor};
use serieslog_storage::{BackingFile, FileBackend, InMemoryBackend, StorageResult, NULL_REF};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, info};

/// A directory entry loaded from the file.
#[derive(Debug, Clone)]
pub(crate) struct DirectoryEntry {
    pub root: u64,
    pub descriptor: SeriesDescriptor,
}

struct LogFileInner {
    backend: RwLock<Box<dyn BackingFile>>,
    directory: RwLock<HashMap<String, DirectoryEntry>>,
    writers: Mutex<HashSet<String>>,
    signals: SignalHub,
    config: Config,
    path: Option<PathBuf>,
}

/// A structured log file shared by any number of series.
///
/// `LogFile` is a cheap handle: clones share the same backing file, series
/// directory and signal hub. Series writers allocate from it and readers
/// read from it concurrently.
///
/// # Example
///
/// ```rust
/// use serieslog_core::{LogFile, Series};
///
/// let file = LogFile::open_in_memory().unwrap();
/// let prices = Series::<f64>::new(&file, "prices").unwrap();
/// prices.call(&101.25).unwrap();
/// assert_eq!(file.series_names(), vec!["prices".to_string()]);
/// ```
#[derive(Clone)]
pub struct LogFile {
    inner: Arc<LogFileInner>,
}

impl LogFile {
    /// Opens or creates a log file at `path` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is locked by another
    /// writer, or is not a valid log file.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens or creates a log file at `path`.
    ///
    /// The backing file is locked for exclusive writing until every handle
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing and `create_if_missing` is
    /// false, cannot be opened or locked, or is not a valid log file.
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        if !config.create_if_missing && !path.exists() {
            return Err(CoreError::invalid_operation(format!(
                "log file {} does not exist and create_if_missing is false",
                path.display()
            )));
        }

        let mut backend = FileBackend::open_with_create_dirs(path)?;
        if let Some(limit) = config.max_file_size {
            backend = backend.with_limit(limit);
        }
        Self::initialize(Box::new(backend), config, Some(path.to_path_buf()))
    }

    /// Opens an existing log file for reading only.
    ///
    /// No lock is taken, so this works while another process writes the
    /// file. The series directory is the one present at open time.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a valid log file.
    pub fn open_read_only(path: &Path) -> CoreResult<Self> {
        let backend = FileBackend::open_read_only(path)?;
        let config = Config::default().create_if_missing(false);
        Self::initialize(Box::new(backend), config, Some(path.to_path_buf()))
    }

    /// Opens a log file over an arbitrary backing file.
    ///
    /// An empty backend is formatted as a new log file.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend holds something other than a log file.
    pub fn open_with_backend(backend: Box<dyn BackingFile>, config: Config) -> CoreResult<Self> {
        Self::initialize(backend, config, None)
    }

    /// Opens a fresh in-memory log file.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_in_memory_with_config(Config::default())
    }

    /// Opens a fresh in-memory log file with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn open_in_memory_with_config(config: Config) -> CoreResult<Self> {
        let backend = match config.max_file_size {
            Some(limit) => InMemoryBackend::with_limit(limit),
            None => InMemoryBackend::new(),
        };
        Self::initialize(Box::new(backend), config, None)
    }

    fn initialize(
        mut backend: Box<dyn BackingFile>,
        config: Config,
        path: Option<PathBuf>,
    ) -> CoreResult<Self> {
        let directory = if backend.size()? == 0 {
            if !config.create_if_missing {
                return Err(CoreError::invalid_format("log file is empty"));
            }
            let offset = backend.allocate(FILE_HEADER_SIZE)?;
            if offset != 0 {
                return Err(CoreError::invalid_format(format!(
                    "file header allocated at {offset}, expected 0"
                )));
            }
            backend.write_at(0, &FileHeader::new(config.format_version).to_bytes())?;
            backend.sync()?;
            info!(path = ?path, version = config.format_version, "created log file");
            HashMap::new()
        } else {
            let header = FileHeader::from_bytes(&backend.read_at(0, FILE_HEADER_SIZE)?)?;
            if header.version != config.format_version || header.version > FORMAT_VERSION {
                return Err(CoreError::invalid_format(format!(
                    "incompatible format version: file is v{}, expected v{}",
                    header.version, config.format_version
                )));
            }
            let directory = load_directory(backend.as_ref(), header.directory_head)?;
            info!(
                path = ?path,
                version = header.version,
                series = directory.len(),
                "opened log file"
            );
            directory
        };

        Ok(Self {
            inner: Arc::new(LogFileInner {
                backend: RwLock::new(backend),
                directory: RwLock::new(directory),
                writers: Mutex::new(HashSet::new()),
                signals: SignalHub::new(),
                config,
                path,
            }),
        })
    }

    /// The configuration the file was opened with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The file's path, if it is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Returns the names of all series in the directory, sorted.
    pub fn series_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.directory.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the descriptor of a series.
    pub fn descriptor(&self, name: &str) -> Option<SeriesDescriptor> {
        self.inner
            .directory
            .read()
            .get(name)
            .map(|entry| entry.descriptor.clone())
    }

    /// Returns the offset of a series root (`[first][head]`).
    pub fn series_root(&self, name: &str) -> Option<u64> {
        self.inner.directory.read().get(name).map(|entry| entry.root)
    }

    /// Returns true if the series currently has a live writer on this handle.
    pub fn has_writer(&self, name: &str) -> bool {
        self.inner.writers.lock().contains(name)
    }

    /// The file's signal hub.
    pub fn signals(&self) -> &SignalHub {
        &self.inner.signals
    }

    /// Subscribes to events from every series in this file.
    pub fn subscribe(&self) -> Receiver<SeriesEvent> {
        self.inner.signals.subscribe()
    }

    /// Reads `len` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range lies outside the file.
    pub fn read_at(&self, offset: u64, len: usize) -> CoreResult<Vec<u8>> {
        Ok(self.inner.backend.read().read_at(offset, len)?)
    }

    /// Reads a `u64` word at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the word lies outside the file.
    pub fn read_u64(&self, offset: u64) -> CoreResult<u64> {
        Ok(self.inner.backend.read().read_u64(offset)?)
    }

    /// Returns the current file size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.inner.backend.read().size()?)
    }

    /// Syncs the backing file to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&self) -> CoreResult<()> {
        Ok(self.inner.backend.write().sync()?)
    }

    pub(crate) fn write_at(&self, offset: u64, data: &[u8]) -> CoreResult<()> {
        Ok(self.inner.backend.write().write_at(offset, data)?)
    }

    pub(crate) fn write_u64(&self, offset: u64, value: u64) -> CoreResult<()> {
        Ok(self.inner.backend.write().write_u64(offset, value)?)
    }

    /// Allocates on behalf of `series`, mapping failures to `AllocationFailure`.
    pub(crate) fn allocate_for(&self, series: &str, size: usize, next: u64) -> CoreResult<u64> {
        let result: StorageResult<u64> = self.inner.backend.write().allocate_linked(size, next);
        result.map_err(|source| CoreError::allocation_failure(series, size, source))
    }

    pub(crate) fn entry(&self, name: &str) -> Option<DirectoryEntry> {
        self.inner.directory.read().get(name).cloned()
    }

    /// Writes a directory entry for a new series whose root is initialised.
    ///
    /// The entry is complete before the directory head points at it.
    pub(crate) fn publish_series(&self, descriptor: &SeriesDescriptor, root: u64) -> CoreResult<()> {
        let encoded = to_cbor(descriptor)?;
        let size = entry_size(encoded.len());

        let mut directory = self.inner.directory.write();
        if directory.contains_key(&descriptor.name) {
            return Err(CoreError::series_mismatch(
                &descriptor.name,
                "series already exists",
            ));
        }

        let previous = self.read_u64(DIRECTORY_HEAD)?;
        let entry = self.allocate_for(&descriptor.name, size, previous)?;
        self.write_u64(entry + ENTRY_ROOT, root)?;
        self.write_u64(entry + ENTRY_DESCRIPTOR_LEN, encoded.len() as u64)?;
        self.write_at(entry + ENTRY_DESCRIPTOR, &encoded)?;
        self.write_u64(DIRECTORY_HEAD, entry)?;

        directory.insert(
            descriptor.name.clone(),
            DirectoryEntry {
                root,
                descriptor: descriptor.clone(),
            },
        );
        debug!(series = %descriptor.name, entry, root, "published series");
        Ok(())
    }

    /// Claims the single writer slot for `name`.
    pub(crate) fn claim_writer(&self, name: &str) -> CoreResult<WriterClaim> {
        if name.is_empty() {
            return Err(CoreError::invalid_operation("series name must not be empty"));
        }
        let mut writers = self.inner.writers.lock();
        if !writers.insert(name.to_string()) {
            return Err(CoreError::series_in_use(name));
        }
        Ok(WriterClaim {
            file: self.clone(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Debug for LogFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFile")
            .field("path", &self.inner.path)
            .field("series", &self.inner.directory.read().len())
            .finish()
    }
}

/// Holds a series' writer slot until dropped.
pub(crate) struct WriterClaim {
    file: LogFile,
    name: String,
}

impl WriterClaim {
    pub(crate) fn file(&self) -> &LogFile {
        &self.file
    }
}

impl Drop for WriterClaim {
    fn drop(&mut self) {
        self.file.inner.writers.lock().remove(&self.name);
    }
}

fn load_directory(
    backend: &dyn BackingFile,
    mut entry: u64,
) -> CoreResult<HashMap<String, DirectoryEntry>> {
    let mut directory = HashMap::new();
    let file_size = backend.size()?;

    while entry != NULL_REF {
        if entry >= file_size {
            return Err(CoreError::invalid_format(format!(
                "directory entry at {entry} lies past the end of the file"
            )));
        }
        let root = backend.read_u64(entry + ENTRY_ROOT)?;
        let len = usize::try_from(backend.read_u64(entry + ENTRY_DESCRIPTOR_LEN)?)
            .map_err(|_| CoreError::invalid_format("descriptor length overflows"))?;
        let bytes = backend.read_at(entry + ENTRY_DESCRIPTOR, len)?;
        let descriptor: SeriesDescriptor = from_cbor(&bytes)?;
        let next = backend.read_u64(link_offset(entry, entry_size(len)))?;

        // Newest entry wins if a name ever appears twice
        directory
            .entry(descriptor.name.clone())
            .or_insert(DirectoryEntry { root, descriptor });
        entry = next;
    }
    Ok(directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StorageMode;
    use serieslog_codec::TypeDesc;
    use tempfile::tempdir;

    fn descriptor(name: &str) -> SeriesDescriptor {
        SeriesDescriptor {
            name: name.to_string(),
            logical_type: TypeDesc::U32,
            storage_type: TypeDesc::U32,
            mode: StorageMode::Raw,
            batch_size: 4,
            page_size: 0,
            format_version: 1,
        }
    }

    #[test]
    fn new_file_has_header() {
        let file = LogFile::open_in_memory().unwrap();
        assert_eq!(file.size().unwrap(), FILE_HEADER_SIZE as u64);
        let header = FileHeader::from_bytes(&file.read_at(0, FILE_HEADER_SIZE).unwrap()).unwrap();
        assert_eq!(header, FileHeader::new(1));
    }

    #[test]
    fn publish_and_reload_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.slog");

        {
            let file = LogFile::open(&path).unwrap();
            let root = file.allocate_for("a", 16, NULL_REF).unwrap();
            file.publish_series(&descriptor("a"), root).unwrap();
            let root = file.allocate_for("b", 16, NULL_REF).unwrap();
            file.publish_series(&descriptor("b"), root).unwrap();
            assert_eq!(file.series_names(), vec!["a", "b"]);
        }

        let file = LogFile::open(&path).unwrap();
        assert_eq!(file.series_names(), vec!["a", "b"]);
        assert_eq!(file.descriptor("a").unwrap(), descriptor("a"));
        assert!(file.series_root("b").unwrap() > 0);
        assert!(file.descriptor("c").is_none());
    }

    #[test]
    fn duplicate_publish_is_rejected() {
        let file = LogFile::open_in_memory().unwrap();
        file.publish_series(&descriptor("a"), 64).unwrap();
        let err = file.publish_series(&descriptor("a"), 64).unwrap_err();
        assert!(matches!(err, CoreError::SeriesMismatch { .. }));
    }

    #[test]
    fn writer_claim_is_exclusive_until_dropped() {
        let file = LogFile::open_in_memory().unwrap();
        let claim = file.claim_writer("a").unwrap();
        assert!(file.has_writer("a"));
        assert!(matches!(
            file.claim_writer("a"),
            Err(CoreError::SeriesInUse { .. })
        ));
        drop(claim);
        assert!(!file.has_writer("a"));
        file.claim_writer("a").unwrap();
    }

    #[test]
    fn allocation_failure_names_series() {
        let file = LogFile::open_in_memory_with_config(Config::default().max_file_size(64)).unwrap();
        let err = file.allocate_for("ticks", 128, NULL_REF).unwrap_err();
        match err {
            CoreError::AllocationFailure { series, size, .. } => {
                assert_eq!(series, "ticks");
                assert_eq!(size, 128);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_without_create_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.slog");
        let err = LogFile::open_with_config(&path, Config::default().create_if_missing(false));
        assert!(err.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn garbage_file_is_rejected() {
        let backend = InMemoryBackend::with_data(vec![0xFF; 64]);
        let err = LogFile::open_with_backend(Box::new(backend), Config::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormat { .. }));
    }

    #[test]
    fn second_writer_process_is_locked_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locked.slog");
        let _file = LogFile::open(&path).unwrap();
        assert!(matches!(
            LogFile::open(&path),
            Err(CoreError::Storage(serieslog_storage::StorageError::Locked))
        ));
        LogFile::open_read_only(&path).unwrap();
    }
}
