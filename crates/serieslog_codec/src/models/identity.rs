//! Identity model: fixed bytes per record.

use crate::error::{CodecError, CodecResult};
use crate::fixed::Fixed;
use crate::model::{check_model_len, read_word, write_word, ModelCodec, ModelTypes};
use crate::types::TypeDesc;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::marker::PhantomData;

const MODEL_SIZE: usize = 8;

/// Writes each record's fixed layout unchanged.
///
/// The fallback model for types with no better compressor. The only state
/// is a record count.
pub struct IdentityModel<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Fixed> IdentityModel<T> {
    /// Creates an identity model.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Decodes `count` values from a retired region's bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the byte length is not `count * T::SIZE` or a
    /// value fails to decode.
    pub fn decode(bytes: &[u8], count: usize) -> CodecResult<Vec<T>> {
        let expected = count * T::SIZE;
        if bytes.len() != expected {
            return Err(CodecError::BufferSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        (0..count)
            .map(|i| T::read_from(&bytes[i * T::SIZE..]))
            .collect()
    }
}

impl<T: Fixed> Default for IdentityModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Fixed> fmt::Debug for IdentityModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityModel")
            .field("type", &T::type_desc().to_string())
            .finish()
    }
}

impl<T: Fixed> ModelCodec<T> for IdentityModel<T> {
    fn logical_type(&self) -> TypeDesc {
        T::type_desc()
    }

    fn model_types(&self) -> ModelTypes {
        ModelTypes::new(
            TypeDesc::record([("count", TypeDesc::U64)]),
            TypeDesc::sequence(T::type_desc()),
        )
    }

    fn model_size(&self) -> usize {
        MODEL_SIZE
    }

    fn prepare(&self, model: &mut [u8]) -> CodecResult<()> {
        check_model_len(model, MODEL_SIZE)?;
        model.fill(0);
        Ok(())
    }

    fn encode(&self, out: &mut BytesMut, model: &mut [u8], value: &T) -> CodecResult<()> {
        check_model_len(model, MODEL_SIZE)?;
        let start = out.len();
        out.put_bytes(0, T::SIZE);
        value.write_to(&mut out[start..]);
        write_word(model, 0, read_word(model, 0).wrapping_add(1));
        Ok(())
    }

    fn dispose(&self, _out: &mut BytesMut, model: &mut [u8]) -> CodecResult<()> {
        check_model_len(model, MODEL_SIZE)
    }
}
