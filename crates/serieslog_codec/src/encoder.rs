//! Record encoders for raw-mode series.

use crate::error::{CodecError, CodecResult};
use crate::fixed::Fixed;
use crate::types::TypeDesc;
use std::fmt;
use std::marker::PhantomData;

/// Stores one logical value into a fixed-size slot.
///
/// This is the store function a raw series calls for every record. The
/// series never inspects values itself: it hands the encoder a slot of
/// exactly [`Encoder::storage_size`] bytes and copies the result into the
/// current batch node.
pub trait Encoder<T: ?Sized>: Send + Sync {
    /// The type callers record.
    fn logical_type(&self) -> TypeDesc;

    /// The type that is persisted for each record.
    fn storage_type(&self) -> TypeDesc;

    /// Bytes written per record.
    fn storage_size(&self) -> usize;

    /// Encodes `value` into `dst`, which is exactly `storage_size()` bytes long.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded.
    fn store(&self, dst: &mut [u8], value: &T) -> CodecResult<()>;
}

/// Loads a logical value back out of a stored slot.
///
/// The recording engine never decodes; readers and tests do.
pub trait Decoder<T>: Send + Sync {
    /// Decodes one record from `src`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid encoding.
    fn load(&self, src: &[u8]) -> CodecResult<T>;
}

/// Checks an encoder against the layout of its storage type.
///
/// Returns the per-record size on success.
///
/// # Errors
///
/// Returns [`CodecError::UnsizedType`] if the storage type has no fixed
/// layout, or [`CodecError::LayoutMismatch`] if the encoder's declared size
/// differs from the layout.
pub fn check_encoder<T: ?Sized>(encoder: &dyn Encoder<T>) -> CodecResult<usize> {
    let storage_type = encoder.storage_type();
    let declared = storage_type
        .fixed_size()
        .ok_or_else(|| CodecError::unsized_type(storage_type.to_string()))?;
    let actual = encoder.storage_size();

    if declared != actual {
        return Err(CodecError::LayoutMismatch {
            type_name: storage_type.to_string(),
            declared,
            actual,
        });
    }
    Ok(actual)
}

/// The encoder for any [`Fixed`] type: logical and storage types coincide.
pub struct FixedCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> FixedCodec<T> {
    /// Creates a fixed codec.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for FixedCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FixedCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Copy for FixedCodec<T> {}

impl<T: Fixed> fmt::Debug for FixedCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedCodec")
            .field("type", &T::type_desc().to_string())
            .field("size", &T::SIZE)
            .finish()
    }
}

impl<T: Fixed> Encoder<T> for FixedCodec<T> {
    fn logical_type(&self) -> TypeDesc {
        T::type_desc()
    }

    fn storage_type(&self) -> TypeDesc {
        T::type_desc()
    }

    fn storage_size(&self) -> usize {
        T::SIZE
    }

    fn store(&self, dst: &mut [u8], value: &T) -> CodecResult<()> {
        if dst.len() != T::SIZE {
            return Err(CodecError::BufferSizeMismatch {
                expected: T::SIZE,
                actual: dst.len(),
            });
        }
        value.write_to(dst);
        Ok(())
    }
}

impl<T: Fixed> Decoder<T> for FixedCodec<T> {
    fn load(&self, src: &[u8]) -> CodecResult<T> {
        if src.len() != T::SIZE {
            return Err(CodecError::BufferSizeMismatch {
                expected: T::SIZE,
                actual: src.len(),
            });
        }
        T::read_from(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LyingEncoder;

    impl Encoder<u32> for LyingEncoder {
        fn logical_type(&self) -> TypeDesc {
            TypeDesc::U32
        }

        fn storage_type(&self) -> TypeDesc {
            TypeDesc::U64
        }

        fn storage_size(&self) -> usize {
            4
        }

        fn store(&self, dst: &mut [u8], value: &u32) -> CodecResult<()> {
            dst.copy_from_slice(&value.to_le_bytes());
            Ok(())
        }
    }

    struct UnsizedEncoder;

    impl Encoder<Vec<u8>> for UnsizedEncoder {
        fn logical_type(&self) -> TypeDesc {
            TypeDesc::sequence(TypeDesc::U8)
        }

        fn storage_type(&self) -> TypeDesc {
            TypeDesc::sequence(TypeDesc::U8)
        }

        fn storage_size(&self) -> usize {
            0
        }

        fn store(&self, _dst: &mut [u8], _value: &Vec<u8>) -> CodecResult<()> {
            Ok(())
        }
    }

    #[test]
    fn fixed_codec_passes_layout_check() {
        let codec = FixedCodec::<(i64, f64)>::new();
        assert_eq!(check_encoder::<(i64, f64)>(&codec).unwrap(), 16);
    }

    #[test]
    fn lying_encoder_fails_layout_check() {
        let err = check_encoder::<u32>(&LyingEncoder).unwrap_err();
        assert!(matches!(
            err,
            CodecError::LayoutMismatch {
                declared: 8,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn unsized_storage_type_fails_layout_check() {
        let err = check_encoder::<Vec<u8>>(&UnsizedEncoder).unwrap_err();
        assert!(matches!(err, CodecError::UnsizedType { .. }));
    }

    #[test]
    fn store_then_load() {
        let codec = FixedCodec::<[u16; 2]>::new();
        let mut slot = [0u8; 4];
        codec.store(&mut slot, &[7, 300]).unwrap();
        assert_eq!(codec.load(&slot).unwrap(), [7, 300]);
    }

    #[test]
    fn store_rejects_wrong_slot_size() {
        let codec = FixedCodec::<u32>::new();
        let mut slot = [0u8; 8];
        let err = codec.store(&mut slot, &1).unwrap_err();
        assert_eq!(
            err,
            CodecError::BufferSizeMismatch {
                expected: 4,
                actual: 8
            }
        );
    }
}
