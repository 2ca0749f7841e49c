//! Adaptive compression models for compressed-mode series.
//!
//! A compressed series feeds every record through a [`ModelCodec`]. The
//! codec owns the byte layout of its model state; the series only allocates
//! that state, prepares it, hands it back on every record and disposes it
//! when a batch is retired.
//!
//! ## Lifecycle
//!
//! ```text
//! model_size() -> allocate -> prepare() -> encode()* -> dispose()
//! ```
//!
//! `dispose` must flush any buffered state into the output. After it
//! returns, the region's bytes are final.

use crate::error::{CodecError, CodecResult};
use crate::types::TypeDesc;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};

/// The type pair a model codec derives from a logical type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelTypes {
    /// Layout of the model state.
    pub model: TypeDesc,
    /// Type of the encoded output stream.
    pub sequence: TypeDesc,
}

impl ModelTypes {
    /// Creates a model type pair.
    #[must_use]
    pub fn new(model: TypeDesc, sequence: TypeDesc) -> Self {
        Self { model, sequence }
    }

    /// The physical type of a series compressed with this model.
    #[must_use]
    pub fn storage_type(&self) -> TypeDesc {
        TypeDesc::Compressed {
            model: Box::new(self.model.clone()),
            sequence: Box::new(self.sequence.clone()),
        }
    }
}

/// Encodes records of type `T` through an adaptive model.
pub trait ModelCodec<T: ?Sized>: Send + Sync {
    /// The type callers record.
    fn logical_type(&self) -> TypeDesc;

    /// The model state type and the output sequence type.
    fn model_types(&self) -> ModelTypes;

    /// Bytes of model state to allocate per batch.
    fn model_size(&self) -> usize;

    /// Initializes freshly allocated model state in place.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` has the wrong size.
    fn prepare(&self, model: &mut [u8]) -> CodecResult<()>;

    /// Feeds one record: updates `model` and appends encoded bytes to `out`.
    ///
    /// A record may append any number of bytes, including none.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded.
    fn encode(&self, out: &mut BytesMut, model: &mut [u8], value: &T) -> CodecResult<()>;

    /// Flushes buffered model state into `out` at the end of a batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the model state is invalid.
    fn dispose(&self, out: &mut BytesMut, model: &mut [u8]) -> CodecResult<()>;

    /// Returns true once the model cannot usefully take more records.
    ///
    /// Only consulted when the series retires on saturation as well as on
    /// record count.
    fn is_saturated(&self, _model: &[u8]) -> bool {
        false
    }
}

/// Checks a model codec against the layout of its model state type.
///
/// # Errors
///
/// Returns an error if the model type has no fixed layout or its size
/// differs from [`ModelCodec::model_size`].
pub fn check_model<T: ?Sized>(codec: &dyn ModelCodec<T>) -> CodecResult<usize> {
    let model_type = codec.model_types().model;
    let declared = model_type
        .fixed_size()
        .ok_or_else(|| CodecError::unsized_type(model_type.to_string()))?;
    let actual = codec.model_size();

    if declared != actual {
        return Err(CodecError::LayoutMismatch {
            type_name: model_type.to_string(),
            declared,
            actual,
        });
    }
    Ok(actual)
}

pub(crate) fn check_model_len(model: &[u8], expected: usize) -> CodecResult<()> {
    if model.len() != expected {
        return Err(CodecError::BufferSizeMismatch {
            expected,
            actual: model.len(),
        });
    }
    Ok(())
}

pub(crate) fn read_word(model: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&model[at..at + 8]);
    u64::from_le_bytes(buf)
}

pub(crate) fn write_word(model: &mut [u8], at: usize, value: u64) {
    model[at..at + 8].copy_from_slice(&value.to_le_bytes());
}
