//! Delta model for integer series.

use crate::error::{CodecError, CodecResult};
use crate::fixed::Fixed;
use crate::model::{check_model_len, read_word, write_word, ModelCodec, ModelTypes};
use crate::types::TypeDesc;
use crate::varint::{decode_varint, encode_varint};
use bytes::BytesMut;
use std::fmt;
use std::marker::PhantomData;

/// Integers that can be delta-encoded through an `i64` accumulator.
///
/// Conversions wrap, so `u64` values above `i64::MAX` survive unchanged.
pub trait DeltaValue: Fixed + Copy {
    /// Widens to the accumulator type.
    fn to_i64(self) -> i64;
    /// Narrows back from the accumulator type.
    fn from_i64(value: i64) -> Self;
}

macro_rules! impl_delta_value {
    ($($ty:ty),*) => {
        $(
            impl DeltaValue for $ty {
                #[allow(clippy::cast_possible_wrap, clippy::cast_lossless)]
                fn to_i64(self) -> i64 {
                    self as i64
                }

                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                fn from_i64(value: i64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_delta_value!(i8, i16, i32, i64, u8, u16, u32, u64);

const PREV: usize = 0;
const COUNT: usize = 8;
const MODEL_SIZE: usize = 16;

/// Encodes each value as the ZigZag varint of its difference from the previous one.
///
/// Model state is `{prev: i64, count: u64}`. Slowly moving series such as
/// timestamps or sequence numbers shrink to one or two bytes per record.
/// Nothing is buffered, so `dispose` writes nothing.
pub struct DeltaModel<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeltaValue> DeltaModel<T> {
    /// Creates a delta model.
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
    /// Returns an error if the bytes end early or contain trailing data.
    pub fn decode(bytes: &[u8], count: usize) -> CodecResult<Vec<T>> {
        let mut buf = bytes;
        let mut prev = 0i64;
        let mut out = Vec::with_capacity(count);

        for _ in 0..count {
            prev = prev.wrapping_add(decode_varint(&mut buf)?);
            out.push(T::from_i64(prev));
        }
        if !buf.is_empty() {
            return Err(CodecError::decoding_failed(format!(
                "{} trailing bytes after {count} deltas",
                buf.len()
            )));
        }
        Ok(out)
    }
}

impl<T: DeltaValue> Default for DeltaModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeltaValue> fmt::Debug for DeltaModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeltaModel")
            .field("type", &T::type_desc().to_string())
            .finish()
    }
}

impl<T: DeltaValue> ModelCodec<T> for DeltaModel<T> {
    fn logical_type(&self) -> TypeDesc {
        T::type_desc()
    }

    fn model_types(&self) -> ModelTypes {
        ModelTypes::new(
            TypeDesc::record([("prev", TypeDesc::I64), ("count", TypeDesc::U64)]),
            TypeDesc::sequence(TypeDesc::I64),
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
        let prev = read_word(model, PREV) as i64;
        let current = value.to_i64();

        encode_varint(out, current.wrapping_sub(prev));

        write_word(model, PREV, current as u64);
        write_word(model, COUNT, read_word(model, COUNT).wrapping_add(1));
        Ok(())
    }

    fn dispose(&self, _out: &mut BytesMut, model: &mut [u8]) -> CodecResult<()> {
        check_model_len(model, MODEL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::check_model;

    fn run<T: DeltaValue>(values: &[T]) -> BytesMut {
        let codec = DeltaModel::<T>::new();
        let mut model = vec![0xAA; codec.model_size()];
        let mut out = BytesMut::new();
        codec.prepare(&mut model).unwrap();
        for v in values {
            codec.encode(&mut out, &mut model, v).unwrap();
        }
        codec.dispose(&mut out, &mut model).unwrap();
        assert_eq!(read_word(&model, COUNT), values.len() as u64);
        out
    }

    #[test]
    fn layout_is_consistent() {
        assert_eq!(check_model::<i64>(&DeltaModel::new()).unwrap(), 16);
    }

    #[test]
    fn sequential_values_take_one_byte_each() {
        let values: Vec<u64> = (1_000_000..1_000_100).collect();
        let out = run(&values);
        // First delta is large, the rest are +1
        assert!(out.len() < 110);
        assert_eq!(DeltaModel::<u64>::decode(&out, values.len()).unwrap(), values);
    }

    #[test]
    fn wrapping_extremes_decode() {
        let values = [i64::MIN, i64::MAX, 0, -1, i64::MIN];
        let out = run(&values);
        assert_eq!(DeltaModel::<i64>::decode(&out, values.len()).unwrap(), values);

        let unsigned = [u64::MAX, 0, u64::MAX / 2 + 7];
        let out = run(&unsigned);
        assert_eq!(DeltaModel::<u64>::decode(&out, 3).unwrap(), unsigned);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let out = run(&[1i32, 2, 3]);
        assert!(DeltaModel::<i32>::decode(&out, 2).is_err());
        assert!(DeltaModel::<i32>::decode(&out, 4).is_err());
    }

    #[test]
    fn wrong_model_size_is_rejected() {
        let codec = DeltaModel::<i16>::new();
        let mut model = vec![0u8; 8];
        assert!(codec.prepare(&mut model).is_err());
    }
}
