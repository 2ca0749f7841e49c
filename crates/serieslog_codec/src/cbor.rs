//! CBOR helpers for persisted descriptors.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serializes `value` to CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::Cbor`] if serialization fails.
pub fn to_cbor<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes).map_err(|e| CodecError::cbor(e.to_string()))?;
    Ok(bytes)
}

/// Deserializes a value from CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::Cbor`] if the bytes are not a valid encoding of `T`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::cbor(e.to_string()))
}
