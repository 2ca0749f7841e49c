//! On-disk layout of a log file.
//!
//! Every structure is a run of little-endian `u64` words inside one
//! allocation. Linked structures keep their link in the trailing word, so
//! the backing file can initialise it during `allocate_linked`.
//!
//! ```text
//! file header   [magic "SLOG"][version u16][reserved u16][directory_head][reserved; 16]
//! dir entry     [root][descriptor_len][descriptor CBOR, padded][next]
//! series root   [first][head]
//! batch node    [len][records, padded][next]
//! region header [region_id][first_page][model][count][bytes][crc u32][state u32][next]
//! region page   [used][data][next]
//! ```
//!
//! Readers walk these structures with the offsets below. Nothing here
//! performs I/O.

use crate::error::{CoreError, CoreResult};
use serieslog_storage::{align_up, LINK_SIZE};

/// Magic bytes at offset 0.
pub const MAGIC: [u8; 4] = *b"SLOG";

/// Current file format version.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the file header at offset 0.
pub const FILE_HEADER_SIZE: usize = 32;

/// Offset of the directory head inside the file header.
pub const DIRECTORY_HEAD: u64 = 8;

/// Directory entry: offset of the series root.
pub const ENTRY_ROOT: u64 = 0;
/// Directory entry: length of the CBOR descriptor.
pub const ENTRY_DESCRIPTOR_LEN: u64 = 8;
/// Directory entry: start of the CBOR descriptor.
pub const ENTRY_DESCRIPTOR: u64 = 16;

/// Size of a series root.
pub const ROOT_SIZE: usize = 16;
/// Series root: oldest node or region of the current chain.
pub const ROOT_FIRST: u64 = 0;
/// Series root: node or region accepting writes.
pub const ROOT_HEAD: u64 = 8;

/// Batch node: records filled so far.
pub const NODE_LEN: u64 = 0;
/// Batch node: first record slot.
pub const NODE_RECORDS: u64 = 8;

/// Size of a compressed region header.
pub const REGION_HEADER_SIZE: usize = 56;
/// Region header: region id, increasing by one per region.
pub const REGION_ID: u64 = 0;
/// Region header: first data page.
pub const REGION_FIRST_PAGE: u64 = 8;
/// Region header: model state allocation.
pub const REGION_MODEL: u64 = 16;
/// Region header: records encoded into the region.
pub const REGION_COUNT: u64 = 24;
/// Region header: encoded bytes in the region.
pub const REGION_BYTES: u64 = 32;
/// Region header: CRC32 of the encoded bytes (`u32`).
pub const REGION_CRC: u64 = 40;
/// Region header: region state (`u32`).
pub const REGION_STATE: u64 = 44;
/// Region header: next region.
pub const REGION_NEXT: u64 = 48;

/// Region state while records are still being encoded.
pub const REGION_OPEN: u32 = 0;
/// Region state once its bytes are final.
pub const REGION_RETIRED: u32 = 1;

/// Page: bytes of data in use.
pub const PAGE_USED: u64 = 0;
/// Page: first data byte.
pub const PAGE_DATA: u64 = 8;
/// Bytes of a page not available for data.
pub const PAGE_OVERHEAD: usize = 8 + LINK_SIZE;
/// Smallest accepted region page size.
pub const MIN_PAGE_SIZE: usize = 64;

/// Rounds `n` up to a multiple of 8.
#[must_use]
pub const fn pad8(n: usize) -> usize {
    align_up(n as u64) as usize
}

/// Size of a batch node holding `batch_size` records of `storage_size` bytes.
#[must_use]
pub const fn node_size(storage_size: usize, batch_size: usize) -> usize {
    8 + pad8(storage_size * batch_size) + LINK_SIZE
}

/// Offset of the trailing link of a structure of `size` bytes at `at`.
#[must_use]
pub const fn link_offset(at: u64, size: usize) -> u64 {
    at + (size - LINK_SIZE) as u64
}

/// Size of a directory entry holding a descriptor of `descriptor_len` bytes.
#[must_use]
pub const fn entry_size(descriptor_len: usize) -> usize {
    ENTRY_DESCRIPTOR as usize + pad8(descriptor_len) + LINK_SIZE
}

/// Data bytes one page of `page_size` bytes holds.
#[must_use]
pub const fn page_capacity(page_size: usize) -> usize {
    page_size - PAGE_OVERHEAD
}

/// The fixed header at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Format version.
    pub version: u16,
    /// Newest directory entry, or 0.
    pub directory_head: u64,
}

impl FileHeader {
    /// Creates a header for an empty file.
    #[must_use]
    pub const fn new(version: u16) -> Self {
        Self {
            version,
            directory_head: 0,
        }
    }

    /// Serializes the header.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.directory_head.to_le_bytes());
        buf
    }

    /// Parses a header.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if the bytes are short or the
    /// magic does not match.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() < FILE_HEADER_SIZE {
            return Err(CoreError::invalid_format(format!(
                "file header needs {FILE_HEADER_SIZE} bytes, found {}",
                bytes.len()
            )));
        }
        if bytes[0..4] != MAGIC {
            return Err(CoreError::invalid_format("bad magic: not a serieslog file"));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        let mut head = [0u8; 8];
        head.copy_from_slice(&bytes[8..16]);
        Ok(Self {
            version,
            directory_head: u64::from_le_bytes(head),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_sizes_are_padded() {
        assert_eq!(node_size(8, 4), 16 + 32);
        assert_eq!(node_size(3, 3), 16 + 16);
        assert_eq!(node_size(0, 10), 16);
        assert_eq!(link_offset(64, node_size(8, 4)), 64 + 40);
    }

    #[test]
    fn region_header_fields_fit() {
        assert_eq!(REGION_NEXT as usize + LINK_SIZE, REGION_HEADER_SIZE);
        assert_eq!(REGION_STATE, REGION_CRC + 4);
    }

    #[test]
    fn entry_and_page_sizes() {
        assert_eq!(entry_size(0), 24);
        assert_eq!(entry_size(13), 40);
        assert_eq!(page_capacity(64), 48);
    }

    #[test]
    fn header_bytes() {
        let header = FileHeader {
            version: 1,
            directory_head: 0x40,
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"SLOG");
        assert_eq!(FileHeader::from_bytes(&bytes).unwrap(), header);

        let mut bad = bytes;
        bad[0] = b'X';
        assert!(FileHeader::from_bytes(&bad).is_err());
        assert!(FileHeader::from_bytes(&bytes[..16]).is_err());
    }
}
