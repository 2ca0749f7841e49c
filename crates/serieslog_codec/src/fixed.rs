//! Fixed-size value layouts.
//!
//! [`Fixed`] is the per-type half of the type-directed encoder: it gives a
//! Rust type a [`TypeDesc`] and a packed little-endian byte layout. Raw
//! series store `Fixed` values directly into batch nodes.

use crate::error::{CodecError, CodecResult};
use crate::types::TypeDesc;

/// A value with a fixed-size, packed, little-endian layout.
///
/// Implementations must keep `SIZE == Self::type_desc().fixed_size()`.
/// [`crate::check_encoder`] verifies this when a series is constructed.
pub trait Fixed: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Returns the descriptor of this type.
    fn type_desc() -> TypeDesc;

    /// Writes the value into `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is shorter than [`Fixed::SIZE`]. Callers check lengths first.
    fn write_to(&self, dst: &mut [u8]);

    /// Reads a value from `src`.
    ///
    /// # Errors
    ///
    /// Returns an error if `src` is too short or holds an invalid bit pattern.
    fn read_from(src: &[u8]) -> CodecResult<Self>;
}

fn take<const N: usize>(src: &[u8]) -> CodecResult<[u8; N]> {
    if src.len() < N {
        return Err(CodecError::UnexpectedEof);
    }
    let mut buf = [0u8; N];
    buf.copy_from_slice(&src[..N]);
    Ok(buf)
}

macro_rules! impl_fixed_scalar {
    ($($ty:ty => $desc:ident),* $(,)?) => {
        $(
            impl Fixed for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn type_desc() -> TypeDesc {
                    TypeDesc::$desc
                }

                fn write_to(&self, dst: &mut [u8]) {
                    dst[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }

                fn read_from(src: &[u8]) -> CodecResult<Self> {
                    Ok(<$ty>::from_le_bytes(take(src)?))
                }
            }
        )*
    };
}

impl_fixed_scalar! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

impl Fixed for bool {
    const SIZE: usize = 1;

    fn type_desc() -> TypeDesc {
        TypeDesc::Bool
    }

    fn write_to(&self, dst: &mut [u8]) {
        dst[0] = u8::from(*self);
    }

    fn read_from(src: &[u8]) -> CodecResult<Self> {
        match take::<1>(src)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::decoding_failed(format!(
                "invalid bool byte {other:#04x}"
            ))),
        }
    }
}

impl Fixed for char {
    const SIZE: usize = 4;

    fn type_desc() -> TypeDesc {
        TypeDesc::Char
    }

    fn write_to(&self, dst: &mut [u8]) {
        dst[..4].copy_from_slice(&u32::from(*self).to_le_bytes());
    }

    fn read_from(src: &[u8]) -> CodecResult<Self> {
        let raw = u32::from_le_bytes(take(src)?);
        char::from_u32(raw)
            .ok_or_else(|| CodecError::decoding_failed(format!("invalid char {raw:#x}")))
    }
}

impl Fixed for () {
    const SIZE: usize = 0;

    fn type_desc() -> TypeDesc {
        TypeDesc::Unit
    }

    fn write_to(&self, _dst: &mut [u8]) {}

    fn read_from(_src: &[u8]) -> CodecResult<Self> {
        Ok(())
    }
}

impl<T: Fixed, const N: usize> Fixed for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn type_desc() -> TypeDesc {
        TypeDesc::array(T::type_desc(), N)
    }

    fn write_to(&self, dst: &mut [u8]) {
        for (i, item) in self.iter().enumerate() {
            item.write_to(&mut dst[i * T::SIZE..(i + 1) * T::SIZE]);
        }
    }

    fn read_from(src: &[u8]) -> CodecResult<Self> {
        if src.len() < Self::SIZE {
            return Err(CodecError::UnexpectedEof);
        }
        let items = (0..N)
            .map(|i| T::read_from(&src[i * T::SIZE..]))
            .collect::<CodecResult<Vec<T>>>()?;
        items
            .try_into()
            .map_err(|_| CodecError::decoding_failed("array length changed while decoding"))
    }
}

macro_rules! impl_fixed_tuple {
    ($(($($name:ident : $idx:tt),+)),* $(,)?) => {
        $(
            impl<$($name: Fixed),+> Fixed for ($($name,)+) {
                const SIZE: usize = 0 $(+ $name::SIZE)+;

                fn type_desc() -> TypeDesc {
                    TypeDesc::Tuple(vec![$($name::type_desc()),+])
                }

                fn write_to(&self, dst: &mut [u8]) {
                    let mut at = 0;
                    $(
                        self.$idx.write_to(&mut dst[at..at + $name::SIZE]);
                        at += $name::SIZE;
                    )+
                    let _ = at;
                }

                #[allow(unused_assignments)]
                fn read_from(src: &[u8]) -> CodecResult<Self> {
                    if src.len() < Self::SIZE {
                        return Err(CodecError::UnexpectedEof);
                    }
                    let mut at = 0;
                    Ok(($(
                        {
                            let value = $name::read_from(&src[at..])?;
                            at += $name::SIZE;
                            value
                        },
                    )+))
                }
            }
        )*
    };
}

impl_fixed_tuple! {
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3),
    (A: 0, B: 1, C: 2, D: 3, E: 4),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: Fixed>(value: &T) -> Vec<u8> {
        let mut buf = vec![0u8; T::SIZE];
        value.write_to(&mut buf);
        buf
    }

    #[test]
    fn sizes_match_descriptors() {
        assert_eq!(Some(u16::SIZE), u16::type_desc().fixed_size());
        assert_eq!(Some(<[i32; 3]>::SIZE), <[i32; 3]>::type_desc().fixed_size());
        assert_eq!(
            Some(<(f64, u8, char)>::SIZE),
            <(f64, u8, char)>::type_desc().fixed_size()
        );
        assert_eq!(Some(<()>::SIZE), <()>::type_desc().fixed_size());
    }

    #[test]
    fn scalars_are_little_endian() {
        assert_eq!(encode(&0x0102_0304_u32), vec![4, 3, 2, 1]);
        assert_eq!(encode(&-1_i16), vec![0xFF, 0xFF]);
    }

    #[test]
    fn tuple_fields_are_packed_in_order() {
        let bytes = encode(&(1u8, 0x0203_u16, true));
        assert_eq!(bytes, vec![1, 3, 2, 1]);
        assert_eq!(<(u8, u16, bool)>::read_from(&bytes).unwrap(), (1, 0x0203, true));
    }

    #[test]
    fn arrays_read_back() {
        let value = [1.5f32, -2.0, 8.25];
        let bytes = encode(&value);
        assert_eq!(<[f32; 3]>::read_from(&bytes).unwrap(), value);
    }

    #[test]
    fn short_input_is_eof() {
        assert_eq!(u64::read_from(&[1, 2, 3]), Err(CodecError::UnexpectedEof));
        assert_eq!(
            <(u32, u32)>::read_from(&[0; 7]),
            Err(CodecError::UnexpectedEof)
        );
    }

    #[test]
    fn invalid_bool_and_char_are_rejected() {
        assert!(bool::read_from(&[2]).is_err());
        assert!(char::read_from(&0xD800_u32.to_le_bytes()).is_err());
        assert_eq!(char::read_from(&encode(&'λ')).unwrap(), 'λ');
    }
}
