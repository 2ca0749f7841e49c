//! Variable-length integer encoding.
//!
//! Unsigned values use LEB128: seven data bits per byte, high bit set on
//! every byte but the last. Signed values are ZigZag-mapped first so small
//! negative numbers stay short (0 → 0, -1 → 1, 1 → 2, -2 → 3, ...).

use crate::error::{CodecError, CodecResult};
use bytes::{Buf, BufMut};

/// Encodes a signed integer as a ZigZag varint.
pub fn encode_varint(buf: &mut impl BufMut, value: i64) {
    let unsigned = ((value << 1) ^ (value >> 63)) as u64;
    encode_varint_u64(buf, unsigned);
}

/// Encodes an unsigned integer as a varint.
pub fn encode_varint_u64(buf: &mut impl BufMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80;
        }

        buf.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Decodes a ZigZag varint into a signed integer.
///
/// # Errors
///
/// Returns an error if the input ends mid-varint or encodes more than 64 bits.
pub fn decode_varint(buf: &mut impl Buf) -> CodecResult<i64> {
    let unsigned = decode_varint_u64(buf)?;
    let value = (unsigned >> 1) as i64;
    if unsigned & 1 != 0 {
        Ok(!value)
    } else {
        Ok(value)
    }
}

/// Decodes a varint into an unsigned integer.
///
/// # Errors
///
/// Returns an error if the input ends mid-varint or encodes more than 64 bits.
pub fn decode_varint_u64(buf: &mut impl Buf) -> CodecResult<u64> {
    let mut value: u64 = 0;
    let mut shift = 0u32;

    loop {
        if !buf.has_remaining() {
            return Err(CodecError::UnexpectedEof);
        }
        if shift >= 64 {
            return Err(CodecError::VarintOverflow);
        }

        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7F) << shift;

        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Returns the encoded length of an unsigned varint.
#[must_use]
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use proptest::prelude::*;

    #[test]
    fn small_values_take_one_byte() {
        let mut buf = BytesMut::new();
        encode_varint(&mut buf, 0);
        encode_varint(&mut buf, -1);
        encode_varint(&mut buf, 1);
        assert_eq!(&buf[..], &[0, 1, 2]);
    }

    #[test]
    fn extremes_decode() {
        for value in [i64::MIN, i64::MAX, -64, 63, 64, -65] {
            let mut buf = BytesMut::new();
            encode_varint(&mut buf, value);
            let mut slice = &buf[..];
            assert_eq!(decode_varint(&mut slice).unwrap(), value);
            assert!(slice.is_empty());
        }
    }

    #[test]
    fn truncated_input_is_eof() {
        let mut slice: &[u8] = &[0x80, 0x80];
        assert_eq!(decode_varint_u64(&mut slice), Err(CodecError::UnexpectedEof));
    }

    #[test]
    fn overlong_input_overflows() {
        let bytes = [0xFFu8; 11];
        let mut slice = &bytes[..];
        assert_eq!(decode_varint_u64(&mut slice), Err(CodecError::VarintOverflow));
    }

    #[test]
    fn varint_len_matches_encoding() {
        for value in [0u64, 127, 128, 16_383, 16_384, u64::MAX] {
            let mut buf = BytesMut::new();
            encode_varint_u64(&mut buf, value);
            assert_eq!(buf.len(), varint_len(value));
        }
    }

    proptest! {
        #[test]
        fn any_i64_survives(value in any::<i64>()) {
            let mut buf = BytesMut::new();
            encode_varint(&mut buf, value);
            let mut slice = &buf[..];
            prop_assert_eq!(decode_varint(&mut slice).unwrap(), value);
        }
    }
}
