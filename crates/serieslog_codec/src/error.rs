//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while describing, encoding or decoding values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a value.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode stored bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// A destination or source buffer has the wrong length.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// The length the layout requires.
        expected: usize,
        /// The length that was supplied.
        actual: usize,
    },

    /// An encoder's declared size disagrees with its storage type's layout.
    #[error("layout mismatch for {type_name}: type describes {declared} bytes, encoder uses {actual}")]
    LayoutMismatch {
        /// Display form of the storage type.
        type_name: String,
        /// Size derived from the type descriptor.
        declared: usize,
        /// Size reported by the encoder.
        actual: usize,
    },

    /// A fixed layout was required but the type has none.
    #[error("type {type_name} has no fixed-size layout")]
    UnsizedType {
        /// Display form of the type.
        type_name: String,
    },

    /// Unexpected end of input.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A varint ran past 64 bits.
    #[error("varint overflow")]
    VarintOverflow,

    /// CBOR serialization of a descriptor failed.
    #[error("CBOR error: {message}")]
    Cbor {
        /// Description of the CBOR error.
        message: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an unsized type error.
    pub fn unsized_type(type_name: impl Into<String>) -> Self {
        Self::UnsizedType {
            type_name: type_name.into(),
        }
    }

    /// Create a CBOR error.
    pub fn cbor(message: impl Into<String>) -> Self {
        Self::Cbor {
            message: message.into(),
        }
    }
}
