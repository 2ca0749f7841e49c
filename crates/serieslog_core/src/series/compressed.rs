//! Compressed series: records folded through an adaptive model, one region per batch.

use crate::binding::{bind_recorder, Environment, Recorder};
use crate::config::SeriesConfig;
use crate::error::{CoreError, CoreResult};
use crate::file::{LogFile, WriterClaim};
use crate::layout::{
    page_capacity, pad8, REGION_BYTES, REGION_COUNT, REGION_CRC, REGION_FIRST_PAGE,
    REGION_HEADER_SIZE, REGION_ID, REGION_MODEL, REGION_NEXT, REGION_RETIRED, REGION_STATE,
    PAGE_DATA, PAGE_USED, ROOT_FIRST, ROOT_HEAD, ROOT_SIZE,
};
use crate::signal::EventKind;
use crate::stats::SeriesStats;
use crate::types::{RetirePolicy, SeriesDescriptor, StorageMode};
use bytes::{Buf, BytesMut};
use parking_lot::Mutex;
use serieslog_codec::{check_model, Crc32, ModelCodec, ModelTypes, Storable, TypeDesc};
use serieslog_storage::NULL_REF;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Writes records through one live compression model per batch.
///
/// Each region owns a header, a model state allocation and a chain of
/// pages holding the encoded bytes. Encoded output collects in memory and
/// is spilled page by page. A region retires when it holds `batch_size`
/// records, or earlier when the retire policy allows the model to report
/// saturation. On retirement the model is disposed, the remaining bytes
/// are written, the header is finalized and marked retired, and only then
/// is the next region linked. The next record therefore always lands in
/// a fresh model. A record either lands completely, retirement included,
/// or leaves the series as it was.
///
/// Byte offsets inside a region are not record addresses, so there is no
/// `write_position`. There is no `clear` either.
pub struct CompressedSeries<T> {
    claim: WriterClaim,
    name: String,
    model: Box<dyn ModelCodec<T>>,
    model_types: ModelTypes,
    batch_size: usize,
    policy: RetirePolicy,
    page_size: usize,
    sync_on_retire: bool,
    root: u64,
    region: OpenRegion,
    state: Vec<u8>,
    checkpoint: Vec<u8>,
    pending: BytesMut,
    stats: SeriesStats,
}

/// Bookkeeping for the region accepting records.
#[derive(Debug)]
struct OpenRegion {
    header: u64,
    id: u64,
    model_at: u64,
    last_page: u64,
    count: u64,
    bytes: u64,
    crc: Crc32,
}

/// Space allocated for one record before any of it is linked.
#[derive(Debug)]
struct Reservation {
    pages: Vec<u64>,
    next_region: Option<(u64, u64)>,
}

/// A record encoded into the buffer with its space reserved.
#[derive(Debug)]
struct Staged {
    produced: usize,
    disposed: usize,
    reservation: Reservation,
}

impl OpenRegion {
    fn unopened() -> Self {
        Self {
            header: NULL_REF,
            id: 0,
            model_at: NULL_REF,
            last_page: NULL_REF,
            count: 0,
            bytes: 0,
            crc: Crc32::new(),
        }
    }
}

impl<T: Storable> CompressedSeries<T> {
    /// Creates or resumes a compressed series using `T`'s default model.
    ///
    /// # Errors
    ///
    /// See [`CompressedSeries::with_model`].
    pub fn new(file: &LogFile, name: &str, config: &SeriesConfig) -> CoreResult<Self> {
        Self::with_model(file, name, T::model(), config)
    }
}

impl<T> CompressedSeries<T> {
    /// Creates or resumes a compressed series with an explicit model codec.
    ///
    /// A resumed series never reopens an old region: it starts a new one
    /// linked after the last.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidOperation`] for a bad config
    /// - [`CoreError::Codec`] if the model fails its layout check or `prepare`
    /// - [`CoreError::SeriesInUse`] if the series already has a writer
    /// - [`CoreError::SeriesMismatch`] if the series exists but differs
    /// - [`CoreError::AllocationFailure`] if the first region cannot be allocated
    pub fn with_model(
        file: &LogFile,
        name: &str,
        model: Box<dyn ModelCodec<T>>,
        config: &SeriesConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        let model_size = check_model(model.as_ref())?;
        let claim = file.claim_writer(name)?;
        let model_types = model.model_types();

        let descriptor = SeriesDescriptor {
            name: name.to_string(),
            logical_type: model.logical_type(),
            storage_type: model_types.storage_type(),
            mode: StorageMode::Compressed,
            batch_size: config.batch_size as u64,
            page_size: config.region_page_size as u64,
            format_version: file.config().format_version,
        };

        let mut series = Self {
            claim,
            name: name.to_string(),
            model,
            model_types,
            batch_size: config.batch_size,
            policy: config.retire_policy,
            page_size: config.region_page_size,
            sync_on_retire: file.config().sync_on_retire,
            root: NULL_REF,
            region: OpenRegion::unopened(),
            state: vec![0; model_size],
            checkpoint: vec![0; model_size],
            pending: BytesMut::with_capacity(page_capacity(config.region_page_size)),
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
                series.root = existing.root;
                let last = series.file().read_u64(existing.root + ROOT_HEAD)?;
                let last_id = series.file().read_u64(last + REGION_ID)?;
                series.open_region(last_id + 1, last)?;
                debug!(series = %series.name, region_id = last_id + 1, "resumed compressed series");
            }
            None => {
                series.root = series
                    .file()
                    .allocate_for(&series.name, ROOT_SIZE, NULL_REF)?;
                series.open_region(0, NULL_REF)?;
                series.file().publish_series(&descriptor, series.root)?;
                debug!(
                    series = %series.name,
                    root = series.root,
                    batch_size = series.batch_size,
                    "created compressed series"
                );
            }
        }
        Ok(series)
    }

    fn file(&self) -> &LogFile {
        self.claim.file()
    }

    /// Allocates a region header and its model slot.
    fn allocate_region(&self) -> CoreResult<(u64, u64)> {
        let header = self
            .file()
            .allocate_for(&self.name, REGION_HEADER_SIZE, NULL_REF)?;
        let model_len = pad8(self.state.len()).max(8);
        let model_at = self.file().allocate_for(&self.name, model_len, NULL_REF)?;
        Ok((header, model_at))
    }

    /// Allocates, prepares and publishes a region after `previous`.
    fn open_region(&mut self, id: u64, previous: u64) -> CoreResult<()> {
        let (header, model_at) = self.allocate_region()?;
        self.install_region(id, previous, header, model_at)
    }

    /// Prepares the model in an allocated region and links it after `previous`.
    fn install_region(
        &mut self,
        id: u64,
        previous: u64,
        header: u64,
        model_at: u64,
    ) -> CoreResult<()> {
        self.model.prepare(&mut self.state)?;
        self.file().write_at(model_at, &self.state)?;
        self.file().write_u64(header + REGION_ID, id)?;
        self.file().write_u64(header + REGION_MODEL, model_at)?;

        if previous == NULL_REF {
            self.file().write_u64(self.root + ROOT_FIRST, header)?;
        } else {
            self.file().write_u64(previous + REGION_NEXT, header)?;
        }
        self.file().write_u64(self.root + ROOT_HEAD, header)?;

        self.region = OpenRegion {
            header,
            id,
            model_at,
            ..OpenRegion::unopened()
        };
        self.pending.clear();
        Ok(())
    }

    /// Allocates the pages the pending bytes need and, if asked, the next region.
    ///
    /// Without `all`, only full pages are taken. Space allocated before a
    /// failure is left unlinked and never becomes reachable.
    fn reserve(&self, all: bool, next_region: bool) -> CoreResult<Reservation> {
        let capacity = page_capacity(self.page_size);
        let needed = if all {
            self.pending.len().div_ceil(capacity)
        } else {
            self.pending.len() / capacity
        };

        let mut pages = Vec::with_capacity(needed);
        for _ in 0..needed {
            pages.push(
                self.file()
                    .allocate_for(&self.name, self.page_size, NULL_REF)?,
            );
        }
        let next_region = if next_region {
            Some(self.allocate_region()?)
        } else {
            None
        };
        Ok(Reservation { pages, next_region })
    }

    /// Moves pending bytes into reserved pages and links them into the region.
    ///
    /// Bytes leave the buffer only once their page is linked.
    fn spill(&mut self, pages: Vec<u64>) -> CoreResult<()> {
        let capacity = page_capacity(self.page_size);
        for page in pages {
            let n = self.pending.len().min(capacity);
            self.file().write_u64(page + PAGE_USED, n as u64)?;
            self.file().write_at(page + PAGE_DATA, &self.pending[..n])?;

            let link = if self.region.last_page == NULL_REF {
                self.region.header + REGION_FIRST_PAGE
            } else {
                self.region.last_page + (self.page_size - 8) as u64
            };
            self.file().write_u64(link, page)?;

            self.region.crc.update(&self.pending[..n]);
            self.region.bytes += n as u64;
            self.region.last_page = page;
            self.pending.advance(n);
        }
        Ok(())
    }

    /// Records one value.
    ///
    /// The model sees records strictly in call order. If the value fills
    /// the batch, the region retires and the next one opens before this
    /// call returns.
    ///
    /// Every page and region this record needs is allocated before anything
    /// is linked. On error the model state and buffered bytes are restored,
    /// so the same value can be recorded again.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] if the model rejects the value, or
    /// [`CoreError::AllocationFailure`] if a page or the next region
    /// cannot be allocated.
    pub fn record(&mut self, value: &T, signal: bool) -> CoreResult<()> {
        let mark = self.pending.len();
        self.checkpoint.copy_from_slice(&self.state);
        let staged = match self.stage(value) {
            Ok(staged) => staged,
            Err(e) => {
                self.pending.truncate(mark);
                self.state.copy_from_slice(&self.checkpoint);
                return Err(e);
            }
        };

        self.region.count += 1;
        self.stats.record(staged.produced as u64);
        trace!(
            series = %self.name,
            region_id = self.region.id,
            produced = staged.produced,
            "recorded"
        );

        self.spill(staged.reservation.pages)?;

        if signal {
            self.file().signals().notify(&self.name, EventKind::Appended);
            self.stats.signal();
        }

        if let Some((header, model_at)) = staged.reservation.next_region {
            self.stats.add_bytes(staged.disposed as u64);
            self.finalize(signal)?;
            self.install_region(self.region.id + 1, self.region.header, header, model_at)?;
        }
        Ok(())
    }

    /// Encodes `value`, disposes the model if it fills the region, and reserves space.
    fn stage(&mut self, value: &T) -> CoreResult<Staged> {
        let mark = self.pending.len();
        self.model.encode(&mut self.pending, &mut self.state, value)?;
        let produced = self.pending.len() - mark;

        let retiring = self.should_retire(self.region.count + 1);
        if retiring {
            self.model.dispose(&mut self.pending, &mut self.state)?;
        }
        let disposed = self.pending.len() - mark - produced;

        Ok(Staged {
            produced,
            disposed,
            reservation: self.reserve(retiring, retiring)?,
        })
    }

    fn should_retire(&self, count: u64) -> bool {
        if count >= self.batch_size as u64 {
            return true;
        }
        self.policy == RetirePolicy::RecordCountOrSaturation && self.model.is_saturated(&self.state)
    }

    /// Disposes the model and retires the open region without opening another.
    fn close_region(&mut self) -> CoreResult<()> {
        let before = self.pending.len();
        self.model.dispose(&mut self.pending, &mut self.state)?;
        self.stats.add_bytes((self.pending.len() - before) as u64);
        let reservation = self.reserve(true, false)?;
        self.spill(reservation.pages)?;
        self.finalize(false)
    }

    /// Writes the open region's totals and marks it retired.
    ///
    /// The model must be disposed and every byte spilled.
    fn finalize(&mut self, signal: bool) -> CoreResult<()> {
        let header = self.region.header;
        let crc = self.region.crc.finalize();
        self.file().write_at(self.region.model_at, &self.state)?;
        self.file().write_u64(header + REGION_COUNT, self.region.count)?;
        self.file().write_u64(header + REGION_BYTES, self.region.bytes)?;
        self.file().write_at(header + REGION_CRC, &crc.to_le_bytes())?;
        self.file()
            .write_at(header + REGION_STATE, &REGION_RETIRED.to_le_bytes())?;
        if self.sync_on_retire {
            self.file().sync()?;
        }

        self.stats.region_retired();
        debug!(
            series = %self.name,
            region_id = self.region.id,
            records = self.region.count,
            bytes = self.region.bytes,
            crc,
            "region retired"
        );

        if signal {
            self.file().signals().notify(
                &self.name,
                EventKind::RegionRetired {
                    region_id: self.region.id,
                    records: self.region.count,
                },
            );
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
        self.model.logical_type()
    }

    /// The persisted type: the model state and output sequence pair.
    pub fn storage_type(&self) -> TypeDesc {
        self.model_types.storage_type()
    }

    /// The model state and output sequence types.
    pub fn model_types(&self) -> &ModelTypes {
        &self.model_types
    }

    /// Records per region.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Offset of the series root.
    pub fn root(&self) -> u64 {
        self.root
    }

    /// Id of the region accepting records.
    pub fn region_id(&self) -> u64 {
        self.region.id
    }

    /// Offset of the open region's header.
    pub fn region(&self) -> u64 {
        self.region.header
    }

    /// Records encoded into the open region.
    pub fn region_len(&self) -> u64 {
        self.region.count
    }

    /// Writer statistics.
    pub fn stats(&self) -> &SeriesStats {
        &self.stats
    }
}

impl<T> Drop for CompressedSeries<T> {
    /// Retires the open region, even an empty one, so no region stays open
    /// once its writer is gone.
    fn drop(&mut self) {
        if self.region.header == NULL_REF {
            return;
        }
        if let Err(e) = self.close_region() {
            warn!(series = %self.name, region_id = self.region.id, error = %e, "failed to retire region on drop");
        }
    }
}

impl<T> std::fmt::Debug for CompressedSeries<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressedSeries")
            .field("name", &self.name)
            .field("storage_type", &self.storage_type().to_string())
            .field("batch_size", &self.batch_size)
            .field("region_id", &self.region.id)
            .field("region_len", &self.region.count)
            .finish()
    }
}

impl<T: 'static> CompressedSeries<T> {
    /// Binds a shared compressed series in `env` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BindingFailure`] if the environment refuses the name.
    pub fn bind_as(this: &Arc<Mutex<Self>>, env: &Environment, name: &str) -> CoreResult<()> {
        bind_recorder::<T, _>(Arc::clone(this), env, name)
    }
}

impl<T: 'static> Recorder<T> for CompressedSeries<T> {
    fn logical_type(&self) -> TypeDesc {
        CompressedSeries::logical_type(self)
    }

    fn storage_type(&self) -> TypeDesc {
        CompressedSeries::storage_type(self)
    }

    fn record(&mut self, value: &T, signal: bool) -> CoreResult<()> {
        CompressedSeries::record(self, value, signal)
    }
}
