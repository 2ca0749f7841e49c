//! # serieslog Storage
//!
//! Backing file abstraction for serieslog.
//!
//! This crate provides the lowest layer of a structured log file: an
//! append-only, byte-addressable **allocator**. Backing files do not
//! interpret the bytes they hold. The series writers in `serieslog_core`
//! own every layout decision.
//!
//! ## Design Principles
//!
//! - Allocations are 8-byte aligned, zero-filled and all-or-nothing
//! - Allocated regions may be rewritten in place (headers, link fields)
//! - Offsets are stable for the life of the file and double as file references
//! - Must be `Send + Sync` so readers can share the file with the writer
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral logs
//! - [`FileBackend`] - For persistent logs using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use serieslog_storage::{BackingFile, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.allocate(16).unwrap();
//! backend.write_u64(offset, 42).unwrap();
//! assert_eq!(backend.read_u64(offset).unwrap(), 42);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{align_up, BackingFile, ALIGNMENT, LINK_SIZE, NULL_REF};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
