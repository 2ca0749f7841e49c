//! Run-length model for slowly changing values.

use crate::error::{CodecError, CodecResult};
use crate::fixed::Fixed;
use crate::model::{check_model_len, read_word, write_word, ModelCodec, ModelTypes};
use crate::types::TypeDesc;
use crate::varint::{decode_varint_u64, encode_varint_u64};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::marker::PhantomData;

const HAS_RUN: usize = 0;
const RUN: usize = 8;
const VALUE: usize = 16;

/// Collapses repeated values into `(run length, value)` pairs.
///
/// The current run lives in the model state and is only written out when
/// a different value arrives or the batch is disposed. Most records
/// therefore append nothing. Values are compared by their encoded bytes.
pub struct RunLengthModel<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Fixed> RunLengthModel<T> {
    /// Creates a run-length model.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Decodes a retired region's bytes, checking that it holds `count` values.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are malformed or expand to a different count.
    pub fn decode(bytes: &[u8], count: usize) -> CodecResult<Vec<T>>
    where
        T: Clone,
    {
        let mut buf = bytes;
        let mut out = Vec::with_capacity(count);

        while !buf.is_empty() {
            let run = decode_varint_u64(&mut buf)? as usize;
            if buf.len() < T::SIZE {
                return Err(CodecError::UnexpectedEof);
            }
            let value = T::read_from(&buf[..T::SIZE])?;
            buf = &buf[T::SIZE..];

            if out.len() + run > count {
                return Err(CodecError::decoding_failed(format!(
                    "runs expand past {count} values"
                )));
            }
            out.extend(std::iter::repeat(value).take(run));
        }

        if out.len() != count {
            return Err(CodecError::decoding_failed(format!(
                "runs expand to {} values, expected {count}",
                out.len()
            )));
        }
        Ok(out)
    }

    fn model_len() -> usize {
        VALUE + T::SIZE
    }

    fn emit(out: &mut BytesMut, model: &[u8]) {
        encode_varint_u64(out, read_word(model, RUN));
        out.put_slice(&model[VALUE..]);
    }
}

impl<T: Fixed> Default for RunLengthModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Fixed> fmt::Debug for RunLengthModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLengthModel")
            .field("type", &T::type_desc().to_string())
            .finish()
    }
}

impl<T: Fixed> ModelCodec<T> for RunLengthModel<T> {
    fn logical_type(&self) -> TypeDesc {
        T::type_desc()
    }

    fn model_types(&self) -> ModelTypes {
        ModelTypes::new(
            TypeDesc::record([
                ("has_run", TypeDesc::U64),
                ("run", TypeDesc::U64),
                ("value", T::type_desc()),
            ]),
            TypeDesc::sequence(TypeDesc::Tuple(vec![TypeDesc::U64, T::type_desc()])),
        )
    }

    fn model_size(&self) -> usize {
        Self::model_len()
    }

    fn prepare(&self, model: &mut [u8]) -> CodecResult<()> {
        check_model_len(model, Self::model_len())?;
        model.fill(0);
        Ok(())
    }

    fn encode(&self, out: &mut BytesMut, model: &mut [u8], value: &T) -> CodecResult<()> {
        check_model_len(model, Self::model_len())?;

        let mut encoded = vec![0u8; T::SIZE];
        value.write_to(&mut encoded);

        if read_word(model, HAS_RUN) != 0 && model[VALUE..] == encoded[..] {
            write_word(model, RUN, read_word(model, RUN).wrapping_add(1));
            return Ok(());
        }

        if read_word(model, HAS_RUN) != 0 {
            Self::emit(out, model);
        }
        write_word(model, HAS_RUN, 1);
        write_word(model, RUN, 1);
        model[VALUE..].copy_from_slice(&encoded);
        Ok(())
    }

    fn dispose(&self, out: &mut BytesMut, model: &mut [u8]) -> CodecResult<()> {
        check_model_len(model, Self::model_len())?;
        if read_word(model, HAS_RUN) != 0 {
            Self::emit(out, model);
            write_word(model, HAS_RUN, 0);
            write_word(model, RUN, 0);
        }
        Ok(())
    }
}
