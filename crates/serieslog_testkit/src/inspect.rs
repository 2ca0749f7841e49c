//! Readers for the structures a log file holds.
//!
//! Writers in `serieslog_core` never read their own output back. These
//! helpers walk raw chains and compressed regions through the public
//! [`serieslog_core::layout`] offsets, the same way an external reader
//! process would.

use serieslog_codec::{crc32, CodecResult, Fixed};
use serieslog_core::layout::{
    link_offset, node_size, NODE_LEN, NODE_RECORDS, PAGE_DATA, PAGE_USED, REGION_BYTES,
    REGION_COUNT, REGION_CRC, REGION_FIRST_PAGE, REGION_HEADER_SIZE, REGION_ID, REGION_NEXT,
    REGION_RETIRED, REGION_STATE, ROOT_FIRST, ROOT_HEAD,
};
use serieslog_core::{CoreError, CoreResult, FileRef, LogFile, SeriesDescriptor, StorageMode};
use serieslog_storage::NULL_REF;

/// Decodes `count` records from a retired region's bytes.
pub type DecodeFn<T> = fn(&[u8], usize) -> CodecResult<Vec<T>>;

/// One batch node of a raw chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeView {
    /// Offset of the node.
    pub offset: u64,
    /// Records written to the node.
    pub len: u64,
    /// Link to the next node, or null.
    pub next: u64,
}

/// One region of a compressed series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionView {
    /// Offset of the region header.
    pub offset: u64,
    /// Region id.
    pub id: u64,
    /// Records in the region. Zero until retired.
    pub count: u64,
    /// Encoded byte length recorded in the header. Zero until retired.
    pub bytes: u64,
    /// CRC32 recorded in the header.
    pub crc: u32,
    /// Whether the region has been retired.
    pub retired: bool,
    /// Bytes gathered from the region's pages.
    pub data: Vec<u8>,
}

impl RegionView {
    /// Checks the gathered bytes against the header.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] for an open region, a length
    /// mismatch or a checksum mismatch.
    pub fn verify(&self) -> CoreResult<()> {
        if !self.retired {
            return Err(CoreError::invalid_format(format!(
                "region {} is still open",
                self.id
            )));
        }
        if self.data.len() as u64 != self.bytes {
            return Err(CoreError::invalid_format(format!(
                "region {} holds {} bytes, header says {}",
                self.id,
                self.data.len(),
                self.bytes
            )));
        }
        let actual = crc32(&self.data);
        if actual != self.crc {
            return Err(CoreError::invalid_format(format!(
                "region {} checksum mismatch: expected {:08x}, got {actual:08x}",
                self.id, self.crc
            )));
        }
        Ok(())
    }

    /// Decodes the region's records.
    ///
    /// # Errors
    ///
    /// Returns the verification error or the decoder's error.
    pub fn decode<T>(&self, decode: DecodeFn<T>) -> CoreResult<Vec<T>> {
        self.verify()?;
        Ok(decode(&self.data, self.count as usize)?)
    }
}

fn descriptor(file: &LogFile, name: &str, mode: StorageMode) -> CoreResult<SeriesDescriptor> {
    let descriptor = file
        .descriptor(name)
        .ok_or_else(|| CoreError::invalid_operation(format!("no series named '{name}'")))?;
    if descriptor.mode != mode {
        return Err(CoreError::mode_mismatch("inspect", descriptor.mode));
    }
    Ok(descriptor)
}

fn root(file: &LogFile, name: &str) -> CoreResult<u64> {
    file.series_root(name)
        .ok_or_else(|| CoreError::invalid_operation(format!("no series named '{name}'")))
}

/// Returns the first node of the series' current chain.
///
/// # Errors
///
/// Returns an error if the series does not exist or cannot be read.
pub fn raw_first(file: &LogFile, name: &str) -> CoreResult<u64> {
    file.read_u64(root(file, name)? + ROOT_FIRST)
}

/// Returns the node currently accepting records.
///
/// # Errors
///
/// Returns an error if the series does not exist or cannot be read.
pub fn raw_head(file: &LogFile, name: &str) -> CoreResult<u64> {
    file.read_u64(root(file, name)? + ROOT_HEAD)
}

/// Walks a raw chain starting at `first`.
///
/// # Errors
///
/// Returns an error if the series is not raw, or a node is unreadable or
/// claims more records than a batch holds.
pub fn chain_nodes_from(file: &LogFile, name: &str, first: u64) -> CoreResult<Vec<NodeView>> {
    let descriptor = descriptor(file, name, StorageMode::Raw)?;
    let storage_size = storage_size(&descriptor)?;
    let size = node_size(storage_size, descriptor.batch_size as usize);
    let limit = file.size()?;

    let mut nodes = Vec::new();
    let mut at = first;
    while at != NULL_REF {
        if at >= limit || nodes.len() as u64 > limit {
            return Err(CoreError::invalid_format(format!(
                "chain of '{name}' leaves the file at {at}"
            )));
        }
        let len = file.read_u64(at + NODE_LEN)?;
        if len > descriptor.batch_size {
            return Err(CoreError::invalid_format(format!(
                "node at {at} holds {len} records, batch size is {}",
                descriptor.batch_size
            )));
        }
        let next = file.read_u64(link_offset(at, size))?;
        nodes.push(NodeView {
            offset: at,
            len,
            next,
        });
        at = next;
    }
    Ok(nodes)
}

/// Walks the series' current raw chain.
///
/// # Errors
///
/// See [`chain_nodes_from`].
pub fn chain_nodes(file: &LogFile, name: &str) -> CoreResult<Vec<NodeView>> {
    chain_nodes_from(file, name, raw_first(file, name)?)
}

/// Reads every record of a raw chain starting at `first`, in order.
///
/// # Errors
///
/// Returns an error if `T` does not match the persisted record size, or
/// see [`chain_nodes_from`].
pub fn read_raw_from<T: Fixed>(file: &LogFile, name: &str, first: u64) -> CoreResult<Vec<T>> {
    let descriptor = descriptor(file, name, StorageMode::Raw)?;
    let storage_size = storage_size(&descriptor)?;
    if storage_size != T::SIZE {
        return Err(CoreError::invalid_operation(format!(
            "'{name}' stores {storage_size}-byte records, reader expects {}",
            T::SIZE
        )));
    }

    let mut values = Vec::new();
    for node in chain_nodes_from(file, name, first)? {
        let bytes = file.read_at(node.offset + NODE_RECORDS, node.len as usize * T::SIZE)?;
        for slot in bytes.chunks_exact(T::SIZE) {
            values.push(T::read_from(slot)?);
        }
    }
    Ok(values)
}

/// Reads every record of the series' current raw chain, in order.
///
/// # Errors
///
/// See [`read_raw_from`].
pub fn read_raw<T: Fixed>(file: &LogFile, name: &str) -> CoreResult<Vec<T>> {
    read_raw_from(file, name, raw_first(file, name)?)
}

/// Loads the record a [`FileRef`] points at.
///
/// # Errors
///
/// Returns an error if the slot cannot be read or decoded.
pub fn load_ref<T: Fixed>(file: &LogFile, reference: FileRef<T>) -> CoreResult<T> {
    let bytes = file.read_at(reference.offset(), T::SIZE)?;
    Ok(T::read_from(&bytes)?)
}

fn storage_size(descriptor: &SeriesDescriptor) -> CoreResult<usize> {
    descriptor.storage_type.fixed_size().ok_or_else(|| {
        CoreError::invalid_format(format!(
            "'{}' has unsized storage type {}",
            descriptor.name, descriptor.storage_type
        ))
    })
}

/// Walks every region of a compressed series, oldest first.
///
/// Pages are walked with the page size recorded in the series directory.
///
/// # Errors
///
/// Returns an error if the series is not compressed or a structure is
/// unreadable.
pub fn regions(file: &LogFile, name: &str) -> CoreResult<Vec<RegionView>> {
    let page_size = descriptor(file, name, StorageMode::Compressed)?.page_size as usize;
    if page_size <= PAGE_DATA as usize + 8 {
        return Err(CoreError::invalid_format(format!(
            "'{name}' records page size {page_size}"
        )));
    }
    let limit = file.size()?;

    let mut regions = Vec::new();
    let mut at = file.read_u64(root(file, name)? + ROOT_FIRST)?;
    while at != NULL_REF {
        if at + REGION_HEADER_SIZE as u64 > limit {
            return Err(CoreError::invalid_format(format!(
                "region chain of '{name}' leaves the file at {at}"
            )));
        }
        let header = file.read_at(at, REGION_HEADER_SIZE)?;
        let word = |offset: u64| {
            let start = offset as usize;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&header[start..start + 8]);
            u64::from_le_bytes(buf)
        };
        let half = |offset: u64| {
            let start = offset as usize;
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&header[start..start + 4]);
            u32::from_le_bytes(buf)
        };

        regions.push(RegionView {
            offset: at,
            id: word(REGION_ID),
            count: word(REGION_COUNT),
            bytes: word(REGION_BYTES),
            crc: half(REGION_CRC),
            retired: half(REGION_STATE) == REGION_RETIRED,
            data: read_pages(file, word(REGION_FIRST_PAGE), page_size, limit)?,
        });
        at = word(REGION_NEXT);
    }
    Ok(regions)
}

fn read_pages(file: &LogFile, first: u64, page_size: usize, limit: u64) -> CoreResult<Vec<u8>> {
    let capacity = page_size.saturating_sub(PAGE_DATA as usize + 8) as u64;
    let mut data = Vec::new();
    let mut page = first;
    while page != NULL_REF {
        if page + page_size as u64 > limit {
            return Err(CoreError::invalid_format(format!(
                "page at {page} runs past the end of the file"
            )));
        }
        let used = file.read_u64(page + PAGE_USED)?;
        if used > capacity {
            return Err(CoreError::invalid_format(format!(
                "page at {page} claims {used} bytes, capacity is {capacity}"
            )));
        }
        data.extend_from_slice(&file.read_at(page + PAGE_DATA, used as usize)?);
        page = file.read_u64(link_offset(page, page_size))?;
    }
    Ok(data)
}

/// Decodes every retired region of a compressed series, in order.
///
/// The open region is skipped: its records are not final until it retires.
///
/// # Errors
///
/// Returns the first verification or decoding error.
pub fn read_compressed<T>(
    file: &LogFile,
    name: &str,
    decode: DecodeFn<T>,
) -> CoreResult<Vec<T>> {
    let mut values = Vec::new();
    for region in regions(file, name)? {
        if region.retired {
            values.extend(region.decode(decode)?);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{scenarios, TestLog};
    use serieslog_codec::models::DeltaModel;
    use serieslog_core::{Series, SeriesConfig};

    #[test]
    fn raw_reader_follows_rollover() {
        let log = scenarios::populated_raw("a", 4, 10);
        let nodes = chain_nodes(&log, "a").unwrap();
        assert_eq!(
            nodes.iter().map(|n| n.len).collect::<Vec<_>>(),
            vec![4, 4, 2]
        );
        assert_eq!(nodes.last().unwrap().offset, raw_head(&log, "a").unwrap());
        assert_eq!(read_raw::<u64>(&log, "a").unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn reader_rejects_wrong_record_size() {
        let log = scenarios::populated_raw("a", 4, 3);
        assert!(read_raw::<u32>(&log, "a").is_err());
    }

    #[test]
    fn reader_rejects_wrong_mode() {
        let log = scenarios::populated_raw("a", 4, 3);
        assert!(regions(&log, "a").unwrap_err().is_mode_mismatch());
    }

    #[test]
    fn refs_load_their_record() {
        let log = TestLog::memory();
        let series = Series::<i32>::with_config(&log, "a", SeriesConfig::raw(2)).unwrap();
        let refs: Vec<_> = (0..5)
            .map(|i| series.record_with_ref(&(i * 3), false).unwrap())
            .collect();
        for (i, r) in refs.into_iter().enumerate() {
            assert_eq!(load_ref(&log, r).unwrap(), i as i32 * 3);
        }
    }

    #[test]
    fn compressed_reader_checks_every_region() {
        let log = scenarios::populated_compressed("c", 8, 20);
        let regions = regions(&log, "c").unwrap();

        // Two full regions, then the partial one retired on drop
        assert_eq!(
            regions.iter().map(|r| (r.id, r.count)).collect::<Vec<_>>(),
            vec![(0, 8), (1, 8), (2, 4)]
        );
        for region in &regions {
            region.verify().unwrap();
        }

        let values =
            read_compressed::<u64>(&log, "c", DeltaModel::<u64>::decode).unwrap();
        assert_eq!(values, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn corrupted_region_fails_verification() {
        let log = scenarios::populated_compressed("c", 8, 8);
        let mut region = regions(&log, "c").unwrap().remove(0);
        region.data[0] ^= 0xFF;
        assert!(region.verify().is_err());
    }
}
