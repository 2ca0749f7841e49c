//! Core types: storage modes, series descriptors and file references.

use serde::{Deserialize, Serialize};
use serieslog_codec::{CodecResult, Fixed, Storable, TypeDesc, FILE_REF_SIZE};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// How a series lays out its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageMode {
    /// Fixed-size slots in linked batch nodes.
    #[default]
    Raw,
    /// Variable-length output of an adaptive model, one region per batch.
    Compressed,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::Compressed => f.write_str("compressed"),
        }
    }
}

/// When a compressed region is retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RetirePolicy {
    /// After exactly `batch_size` records.
    #[default]
    RecordCount,
    /// After `batch_size` records, or earlier once the model reports saturation.
    RecordCountOrSaturation,
}

/// What the file's series directory remembers about a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    /// Series name, unique within the file.
    pub name: String,
    /// Type callers record.
    pub logical_type: TypeDesc,
    /// Type persisted per record (raw) or model/sequence pair (compressed).
    pub storage_type: TypeDesc,
    /// Storage mode.
    pub mode: StorageMode,
    /// Records per batch node or region.
    pub batch_size: u64,
    /// Page size of compressed regions; zero for raw series.
    #[serde(default)]
    pub page_size: u64,
    /// File format version the series was created with.
    pub format_version: u16,
}

impl SeriesDescriptor {
    /// Describes the first difference between two descriptors for the same name.
    ///
    /// Returns `None` when a writer described by `other` may resume this series.
    #[must_use]
    pub fn conflict(&self, other: &Self) -> Option<String> {
        if self.mode != other.mode {
            return Some(format!("stored as {}, opened as {}", self.mode, other.mode));
        }
        if self.logical_type != other.logical_type {
            return Some(format!(
                "records {}, opened for {}",
                self.logical_type, other.logical_type
            ));
        }
        if self.storage_type != other.storage_type {
            return Some(format!(
                "stores {}, opened with {}",
                self.storage_type, other.storage_type
            ));
        }
        if self.batch_size != other.batch_size {
            return Some(format!(
                "batch size {}, opened with {}",
                self.batch_size, other.batch_size
            ));
        }
        if self.page_size != other.page_size {
            return Some(format!(
                "page size {}, opened with {}",
                self.page_size, other.page_size
            ));
        }
        None
    }
}

/// A stable reference to a record in a raw-mode series.
///
/// A file reference is just a file offset tagged with the record type.
/// Offsets never move, so a reference stays valid after the series rolls
/// over to new nodes or is cleared. References are minted by
/// [`crate::RawSeries::record_with_ref`] or read back from a series that
/// records them.
pub struct FileRef<T> {
    offset: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FileRef<T> {
    pub(crate) const fn new(offset: u64) -> Self {
        Self {
            offset,
            _marker: PhantomData,
        }
    }

    /// The file offset of the referenced record.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }
}

impl<T> Clone for FileRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FileRef<T> {}

impl<T> PartialEq for FileRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl<T> Eq for FileRef<T> {}

impl<T> Hash for FileRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.offset.hash(state);
    }
}

impl<T: Fixed> fmt::Debug for FileRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileRef<{}>({:#x})", T::type_desc(), self.offset)
    }
}

impl<T: Fixed> Fixed for FileRef<T> {
    const SIZE: usize = FILE_REF_SIZE;

    fn type_desc() -> TypeDesc {
        TypeDesc::file_ref(T::type_desc())
    }

    fn write_to(&self, dst: &mut [u8]) {
        self.offset.write_to(dst);
    }

    fn read_from(src: &[u8]) -> CodecResult<Self> {
        Ok(Self::new(u64::read_from(src)?))
    }
}

impl<T: Storable> Storable for FileRef<T> {}
