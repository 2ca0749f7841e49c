//! Raw series: fixed-size records in linked batch nodes.

use crate::binding::{bind_recorder, Environment, Recorder};
use crate::config::SeriesConfig;
use crate::error::{CoreError, CoreResult};
use crate::file::{LogFile, WriterClaim};
use crate::layout::{
    link_offset, node_size, NODE_LEN, NODE_RECORDS, ROOT_FIRST, ROOT_HEAD, ROOT_SIZE,
};
use crate::signal::EventKind;
use crate::stats::SeriesStats;
use crate::types::{FileRef, SeriesDescriptor, StorageMode};
use parking_lot::Mutex;
use serieslog_codec::{check_encoder, Encoder, Storable, TypeDesc};
use serieslog_storage::NULL_REF;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Writes records into a singly linked chain of fixed-capacity batch nodes.
///
/// Each record is stored by the encoder straight into the next free slot
/// of the head node. A node that is full is left alone until the next
/// record arrives. At that point a new node is allocated with a null link,
/// linked from the full node, and published through the series root's
/// head word. Readers that see a head value can always trust the node
/// behind it.
///
/// The writer assumes a single caller. Share it through
/// [`crate::Series`] when more than one thread needs to record.
pub struct RawSeries<T> {
    claim: WriterClaim,
    name: String,
    encoder: Box<dyn Encoder<T>>,
    storage_size: usize,
    batch_size: usize,
    root: u64,
    node: u64,
    len: usize,
    slot: Vec<u8>,
    stats: SeriesStats,
}

impl<T: Storable> RawSeries<T> {
    /// Creates or resumes a raw series using `T`'s default encoder.
    ///
    /// # Errors
    ///
    /// See [`RawSeries::with_encoder`].
    pub fn new(file: &LogFile, name: &str, config: &SeriesConfig) -> CoreResult<Self> {
        Self::with_encoder(file, name, T::encoder(), config)
    }
}

impl<T> RawSeries<T> {
    /// Creates or resumes a raw series with an explicit encoder.
    ///
    /// A new series gets a root and a first empty node before it is
    /// published in the file's directory. An existing series with a
    /// matching descriptor continues filling its head node.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidOperation`] for a bad config
    /// - [`CoreError::Codec`] if the encoder fails its layout check
    /// - [`CoreError::SeriesInUse`] if the series already has a writer
    /// - [`CoreError::SeriesMismatch`] if the series exists but differs
    /// - [`CoreError::AllocationFailure`] if the first node cannot be allocated
    pub fn with_encoder(
        file: &LogFile,
        name: &str,
        encoder: Box<dyn Encoder<T>>,
        config: &SeriesConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        let storage_size = check_encoder(encoder.as_ref())?;
        let claim = file.claim_writer(name)?;

        let descriptor = SeriesDescriptor {
            name: name.to_string(),
            logical_type: encoder.logical_type(),
            storage_type: encoder.storage_type(),
            mode: StorageMode::Raw,
            batch_size: config.batch_size as u64,
            page_size: 0,
            format_version: file.config().format_version,
        };

        let mut series = Self {
            claim,
            name: name.to_string(),
            encoder,
            storage_size,
            batch_size: config.batch_size,
            root: NULL_REF,
            node: NULL_REF,
            len: 0,
            slot: vec![0; storage_size],
            stats: SeriesStats::new(),
        };

        match file.entry(name) {
            Some(existing) => {
                if !config.resume {
                    return Err(CoreError::series_mismatch(name, "series already exists"));
                }
                if let Some(conflict) = existing.descriptor.conflict(&descriptor) {
                    return Err(CoreError::series_mismatch(name, conflict));
                }
                series.resume(existing.root)?;
            }
            None => series.create(&descriptor)?,
        }
        Ok(series)
    }

    fn file(&self) -> &LogFile {
        self.claim.file()
    }

    fn create(&mut self, descriptor: &SeriesDescriptor) -> CoreResult<()> {
        let root = self.file().allocate_for(&self.name, ROOT_SIZE, NULL_REF)?;
        let node = self.allocate_node()?;
        self.file().write_u64(root + ROOT_FIRST, node)?;
        self.file().write_u64(root + ROOT_HEAD, node)?;
        self.file().publish_series(descriptor, root)?;

        self.root = root;
        self.node = node;
        self.len = 0;
        debug!(series = %self.name, root, node, batch_size = self.batch_size, "created raw series");
        Ok(())
    }

    fn resume(&mut self, root: u64) -> CoreResult<()> {
        let node = self.file().read_u64(root + ROOT_HEAD)?;
        let len = self.file().read_u64(node + NODE_LEN)?;
        if len > self.batch_size as u64 {
            warn!(series = %self.name, node, len, batch_size = self.batch_size, "head node overfull");
            return Err(CoreError::invalid_format(format!(
                "series '{}' head node holds {len} records, capacity is {}",
                self.name, self.batch_size
            )));
        }

        self.root = root;
        self.node = node;
        self.len = len as usize;
        debug!(series = %self.name, root, node, len, "resumed raw series");
        Ok(())
    }

    fn node_size(&self) -> usize {
        node_size(self.storage_size, self.batch_size)
    }

    fn allocate_node(&self) -> CoreResult<u64> {
        let node = self
            .file()
            .allocate_for(&self.name, self.node_size(), NULL_REF)?;
        self.stats.node_allocated();
        Ok(node)
    }

    fn slot_offset(&self) -> u64 {
        self.node + NODE_RECORDS + (self.len * self.storage_size) as u64
    }

    /// Links a fresh node after the full head node and publishes it.
    fn roll_over(&mut self) -> CoreResult<()> {
        let next = self.allocate_node()?;
        self.file()
            .write_u64(link_offset(self.node, self.node_size()), next)?;
        self.file().write_u64(self.root + ROOT_HEAD, next)?;

        debug!(series = %self.name, from = self.node, to = next, "batch node rolled over");
        self.node = next;
        self.len = 0;
        Ok(())
    }

    /// Records one value.
    ///
    /// The value is encoded first, so an encoding failure leaves the file
    /// untouched. If the head node is full, a new node is published before
    /// the slot is written. The slot is written before the node's length
    /// word, so readers never see a partial record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] if encoding fails, or
    /// [`CoreError::AllocationFailure`] if a new node cannot be allocated.
    pub fn record(&mut self, value: &T, signal: bool) -> CoreResult<()> {
        self.encoder.store(&mut self.slot, value)?;

        if self.len == self.batch_size {
            self.roll_over()?;
        }

        let at = self.slot_offset();
        self.file().write_at(at, &self.slot)?;
        self.file()
            .write_u64(self.node + NODE_LEN, (self.len + 1) as u64)?;
        self.len += 1;

        self.stats.record(self.storage_size as u64);
        trace!(series = %self.name, node = self.node, slot = self.len - 1, "recorded");

        if signal {
            self.file().signals().notify(&self.name, EventKind::Appended);
            self.stats.signal();
        }
        Ok(())
    }

    /// Returns the file offset the next record will be written at.
    ///
    /// If the head node is full, the pending rollover happens now, so the
    /// offset is exact as long as no other call intervenes before the
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailure`] if the rollover cannot allocate.
    pub fn write_position(&mut self) -> CoreResult<u64> {
        if self.len == self.batch_size {
            self.roll_over()?;
        }
        Ok(self.slot_offset())
    }

    /// Records one value and returns a reference to it.
    ///
    /// # Errors
    ///
    /// Same as [`RawSeries::record`].
    pub fn record_with_ref(&mut self, value: &T, signal: bool) -> CoreResult<FileRef<T>> {
        let position = self.write_position()?;
        self.record(value, signal)?;
        Ok(FileRef::new(position))
    }

    /// Starts a fresh, empty chain.
    ///
    /// A new node is allocated and published as both the first and head
    /// node. Old nodes are not touched, so references into them stay valid.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailure`] if the node cannot be allocated.
    pub fn clear(&mut self, signal: bool) -> CoreResult<()> {
        let node = self.allocate_node()?;
        self.file().write_u64(self.root + ROOT_FIRST, node)?;
        self.file().write_u64(self.root + ROOT_HEAD, node)?;
        if self.file().config().sync_on_clear {
            self.file().sync()?;
        }

        debug!(series = %self.name, from = self.node, to = node, "raw series cleared");
        self.node = node;
        self.len = 0;
        self.stats.clear();

        if signal {
            self.file().signals().notify(&self.name, EventKind::Cleared);
            self.stats.signal();
        }
        Ok(())
    }

    /// The series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type callers record.
    pub fn logical_type(&self) -> TypeDesc {
        self.encoder.logical_type()
    }

    /// The type persisted per record.
    pub fn storage_type(&self) -> TypeDesc {
        self.encoder.storage_type()
    }

    /// The type of a whole batch node's record area.
    pub fn batch_type(&self) -> TypeDesc {
        TypeDesc::batch(self.storage_type(), self.batch_size)
    }

    /// Records per batch node.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Bytes per record.
    pub fn storage_size(&self) -> usize {
        self.storage_size
    }

    /// Offset of the series root.
    pub fn root(&self) -> u64 {
        self.root
    }

    /// Offset of the node accepting writes.
    pub fn head(&self) -> u64 {
        self.node
    }

    /// Records in the head node.
    pub fn head_len(&self) -> usize {
        self.len
    }

    /// Writer statistics.
    pub fn stats(&self) -> &SeriesStats {
        &self.stats
    }
}

impl<T> std::fmt::Debug for RawSeries<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawSeries")
            .field("name", &self.name)
            .field("storage_type", &self.encoder.storage_type().to_string())
            .field("batch_size", &self.batch_size)
            .field("head", &self.node)
            .field("len", &self.len)
            .finish()
    }
}

impl<T: 'static> RawSeries<T> {
    /// Binds a shared raw series in `env` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BindingFailure`] if the environment refuses the name.
    pub fn bind_as(this: &Arc<Mutex<Self>>, env: &Environment, name: &str) -> CoreResult<()> {
        bind_recorder::<T, _>(Arc::clone(this), env, name)
    }
}

impl<T: 'static> Recorder<T> for RawSeries<T> {
    fn logical_type(&self) -> TypeDesc {
        RawSeries::logical_type(self)
    }

    fn storage_type(&self) -> TypeDesc {
        RawSeries::storage_type(self)
    }

    fn record(&mut self, value: &T, signal: bool) -> CoreResult<()> {
        RawSeries::record(self, value, signal)
    }
}
