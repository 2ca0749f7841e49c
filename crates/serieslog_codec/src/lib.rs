//! # serieslog codec
//!
//! Type descriptors and record codecs for serieslog.
//!
//! A series never looks inside the values it records. It asks a codec
//! for two things:
//!
//! - raw mode: an [`Encoder`] that writes each value into a fixed slot
//! - compressed mode: a [`ModelCodec`] that folds values through model state
//!   and appends a variable number of bytes per record
//!
//! Every layout is described by a [`TypeDesc`], which is also what ends up
//! in the file's series directory.
//!
//! ## Usage
//!
//! ```
//! use serieslog_codec::{check_encoder, Encoder, Storable, TypeDesc};
//!
//! let encoder = <(i64, f64) as Storable>::encoder();
//! assert_eq!(check_encoder(encoder.as_ref()).unwrap(), 16);
//!
//! let mut slot = [0u8; 16];
//! encoder.store(&mut slot, &(7, 1.5)).unwrap();
//! assert_eq!(encoder.storage_type(), TypeDesc::Tuple(vec![TypeDesc::I64, TypeDesc::F64]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod checksum;
mod encoder;
mod error;
mod fixed;
mod model;
pub mod models;
mod storable;
mod types;
pub mod varint;

pub use cbor::{from_cbor, to_cbor};
pub use checksum::{crc32, Crc32};
pub use encoder::{check_encoder, Decoder, Encoder, FixedCodec};
pub use error::{CodecError, CodecResult};
pub use fixed::Fixed;
pub use model::{check_model, ModelCodec, ModelTypes};
pub use storable::Storable;
pub use types::{Field, TypeDesc, BATCH_HEADER_SIZE, FILE_REF_SIZE};
