//! Backing file trait definition.

use crate::error::{StorageError, StorageResult};

/// Alignment of every allocation, in bytes.
pub const ALIGNMENT: u64 = 8;

/// The null file reference.
///
/// Offset zero is never handed out to a linked structure: the log file
/// header always occupies it, so `0` doubles as the "no next" sentinel.
pub const NULL_REF: u64 = 0;

/// Size of a trailing link field, in bytes.
pub const LINK_SIZE: usize = 8;

/// Rounds `n` up to the next multiple of [`ALIGNMENT`].
#[must_use]
pub const fn align_up(n: u64) -> u64 {
    (n + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// A backing file for a structured log.
///
/// Backing files are **opaque allocators**. They hand out aligned,
/// zero-filled regions and let callers read and rewrite bytes inside
/// regions they already own. They know nothing about series, batch nodes
/// or compression regions.
///
/// # Invariants
///
/// - `allocate` returns an offset aligned to [`ALIGNMENT`]
/// - Allocated bytes read as zero until written
/// - An allocation either fully succeeds or leaves the file size unchanged
/// - `read_at` returns exactly the bytes previously written at that offset
/// - Offsets never move once returned
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait BackingFile: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read would extend beyond the current size
    /// or an I/O error occurs.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Overwrites bytes inside an existing allocation.
    ///
    /// Writes never grow the file; use [`BackingFile::allocate`] for that.
    ///
    /// # Errors
    ///
    /// Returns an error if the write would extend beyond the current size
    /// or an I/O error occurs.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Allocates `size` zero-filled bytes at the end of the file.
    ///
    /// Returns the aligned offset of the new region.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero, the backend's growth limit
    /// would be exceeded, or the file cannot grow.
    fn allocate(&mut self, size: usize) -> StorageResult<u64>;

    /// Allocates a region whose trailing [`LINK_SIZE`] bytes already hold `next`.
    ///
    /// The link is written before the offset is returned, so the caller
    /// can publish the region without a separate link write.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` cannot hold a link field, or if the
    /// allocation itself fails.
    fn allocate_linked(&mut self, size: usize, next: u64) -> StorageResult<u64> {
        if size < LINK_SIZE {
            return Err(StorageError::allocation_failed(
                size,
                format!("region of {size} bytes cannot hold a {LINK_SIZE}-byte link"),
            ));
        }
        let offset = self.allocate(size)?;
        if next != NULL_REF {
            self.write_u64(offset + (size - LINK_SIZE) as u64, next)?;
        }
        Ok(offset)
    }

    /// Reads a little-endian `u64` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn read_u64(&self, offset: u64) -> StorageResult<u64> {
        let bytes = self.read_at(offset, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Writes a little-endian `u64` at `offset`.
    ///
    /// This is the single-word store used to publish head references.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write_u64(&mut self, offset: u64, value: u64) -> StorageResult<()> {
        self.write_at(offset, &value.to_le_bytes())
    }

    /// Returns the current size of the file in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Flushes pending writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// This is a stronger guarantee than `flush`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_eight() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), 8);
        assert_eq!(align_up(8), 8);
        assert_eq!(align_up(9), 16);
        assert_eq!(align_up(31), 32);
    }
}
