//! The storage-mode dispatcher.

use crate::binding::{bind_recorder, Environment, Recorder};
use crate::config::SeriesConfig;
use crate::error::{CoreError, CoreResult};
use crate::file::LogFile;
use crate::series::{CompressedSeries, RawSeries};
use crate::stats::SeriesStats;
use crate::types::{FileRef, StorageMode};
use parking_lot::Mutex;
use serieslog_codec::{Encoder, ModelCodec, Storable, TypeDesc};
use std::sync::Arc;

/// A series writer in exactly one storage mode.
///
/// The mode is chosen at construction and never changes. Every operation
/// forwards to the active writer. Operations that only make sense for raw
/// series fail with [`CoreError::ModeMismatch`] on a compressed one.
pub enum StoredSeries<T> {
    /// Fixed-size records in linked batch nodes.
    Raw(RawSeries<T>),
    /// Model-encoded records in retired regions.
    Compressed(CompressedSeries<T>),
}

impl<T: Storable> StoredSeries<T> {
    /// Creates or resumes a series in `config.mode` with `T`'s default codecs.
    ///
    /// # Errors
    ///
    /// Returns the active writer's construction error.
    pub fn new(file: &LogFile, name: &str, config: &SeriesConfig) -> CoreResult<Self> {
        match config.mode {
            StorageMode::Raw => Ok(Self::Raw(RawSeries::new(file, name, config)?)),
            StorageMode::Compressed => {
                Ok(Self::Compressed(CompressedSeries::new(file, name, config)?))
            }
        }
    }
}

impl<T> StoredSeries<T> {
    /// Creates or resumes a raw series with an explicit encoder.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if `config.mode` is not raw,
    /// or the writer's construction error.
    pub fn with_encoder(
        file: &LogFile,
        name: &str,
        encoder: Box<dyn Encoder<T>>,
        config: &SeriesConfig,
    ) -> CoreResult<Self> {
        if config.mode != StorageMode::Raw {
            return Err(CoreError::invalid_operation(format!(
                "an encoder builds raw series, config asks for {}",
                config.mode
            )));
        }
        Ok(Self::Raw(RawSeries::with_encoder(file, name, encoder, config)?))
    }

    /// Creates or resumes a compressed series with an explicit model.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if `config.mode` is not
    /// compressed, or the writer's construction error.
    pub fn with_model(
        file: &LogFile,
        name: &str,
        model: Box<dyn ModelCodec<T>>,
        config: &SeriesConfig,
    ) -> CoreResult<Self> {
        if config.mode != StorageMode::Compressed {
            return Err(CoreError::invalid_operation(format!(
                "a model builds compressed series, config asks for {}",
                config.mode
            )));
        }
        Ok(Self::Compressed(CompressedSeries::with_model(
            file, name, model, config,
        )?))
    }

    /// The active storage mode.
    pub fn mode(&self) -> StorageMode {
        match self {
            Self::Raw(_) => StorageMode::Raw,
            Self::Compressed(_) => StorageMode::Compressed,
        }
    }

    /// The series name.
    pub fn name(&self) -> &str {
        match self {
            Self::Raw(s) => s.name(),
            Self::Compressed(s) => s.name(),
        }
    }

    /// The type callers record.
    pub fn logical_type(&self) -> TypeDesc {
        match self {
            Self::Raw(s) => s.logical_type(),
            Self::Compressed(s) => s.logical_type(),
        }
    }

    /// The persisted type.
    pub fn storage_type(&self) -> TypeDesc {
        match self {
            Self::Raw(s) => s.storage_type(),
            Self::Compressed(s) => s.storage_type(),
        }
    }

    /// Records per batch node or region.
    pub fn batch_size(&self) -> usize {
        match self {
            Self::Raw(s) => s.batch_size(),
            Self::Compressed(s) => s.batch_size(),
        }
    }

    /// Records one value.
    ///
    /// # Errors
    ///
    /// Returns the active writer's error.
    pub fn record(&mut self, value: &T, signal: bool) -> CoreResult<()> {
        match self {
            Self::Raw(s) => s.record(value, signal),
            Self::Compressed(s) => s.record(value, signal),
        }
    }

    /// Returns the file offset of the next record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ModeMismatch`] for a compressed series.
    pub fn write_position(&mut self) -> CoreResult<u64> {
        match self {
            Self::Raw(s) => s.write_position(),
            Self::Compressed(_) => Err(CoreError::mode_mismatch(
                "write_position",
                StorageMode::Compressed,
            )),
        }
    }

    /// Records one value and returns a reference to it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ModeMismatch`] for a compressed series.
    pub fn record_with_ref(&mut self, value: &T, signal: bool) -> CoreResult<FileRef<T>> {
        match self {
            Self::Raw(s) => s.record_with_ref(value, signal),
            Self::Compressed(_) => Err(CoreError::mode_mismatch(
                "record_with_ref",
                StorageMode::Compressed,
            )),
        }
    }

    /// Starts a fresh chain.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ModeMismatch`] for a compressed series.
    pub fn clear(&mut self, signal: bool) -> CoreResult<()> {
        match self {
            Self::Raw(s) => s.clear(signal),
            Self::Compressed(_) => Err(CoreError::mode_mismatch("clear", StorageMode::Compressed)),
        }
    }

    /// Writer statistics.
    pub fn stats(&self) -> &SeriesStats {
        match self {
            Self::Raw(s) => s.stats(),
            Self::Compressed(s) => s.stats(),
        }
    }

    /// The raw writer, if that is the active mode.
    pub fn as_raw(&self) -> Option<&RawSeries<T>> {
        match self {
            Self::Raw(s) => Some(s),
            Self::Compressed(_) => None,
        }
    }

    /// The compressed writer, if that is the active mode.
    pub fn as_compressed(&self) -> Option<&CompressedSeries<T>> {
        match self {
            Self::Raw(_) => None,
            Self::Compressed(s) => Some(s),
        }
    }
}

impl<T: 'static> StoredSeries<T> {
    /// Binds a shared series in `env` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BindingFailure`] if the environment refuses the name.
    pub fn bind_as(this: &Arc<Mutex<Self>>, env: &Environment, name: &str) -> CoreResult<()> {
        bind_recorder::<T, _>(Arc::clone(this), env, name)
    }
}

impl<T: 'static> Recorder<T> for StoredSeries<T> {
    fn logical_type(&self) -> TypeDesc {
        StoredSeries::logical_type(self)
    }

    fn storage_type(&self) -> TypeDesc {
        StoredSeries::storage_type(self)
    }

    fn record(&mut self, value: &T, signal: bool) -> CoreResult<()> {
        StoredSeries::record(self, value, signal)
    }
}

impl<T> std::fmt::Debug for StoredSeries<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw(s) => f.debug_tuple("Raw").field(s).finish(),
            Self::Compressed(s) => f.debug_tuple("Compressed").field(s).finish(),
        }
    }
}

impl<T> From<RawSeries<T>> for StoredSeries<T> {
    fn from(series: RawSeries<T>) -> Self {
        Self::Raw(series)
    }
}

impl<T> From<CompressedSeries<T>> for StoredSeries<T> {
    fn from(series: CompressedSeries<T>) -> Self {
        Self::Compressed(series)
    }
}
