//! # serieslog Core
//!
//! The series recording engine for serieslog structured log files.
//!
//! A log file holds any number of named series. Each series is an
//! append-only stream of one value type, written by a single writer while
//! readers tail the same file. This crate provides:
//! - [`LogFile`]: the shared file, its series directory and signal hub
//! - [`RawSeries`]: records copied into linked fixed-capacity batch nodes
//! - [`CompressedSeries`]: records folded through an adaptive model per region
//! - [`StoredSeries`] and [`Series`]: one interface over either mode
//! - [`Environment`]: named record capabilities for generated callers
//!
//! Structures become visible to readers only after they are fully written.
//! A reader that follows a head reference always finds a complete node or
//! region header.
//!
//! ## Example
//!
//! ```rust
//! use serieslog_core::{LogFile, Series, SeriesConfig};
//!
//! let file = LogFile::open_in_memory().unwrap();
//! let prices = Series::<f64>::with_config(&file, "prices", SeriesConfig::raw(256)).unwrap();
//!
//! for p in [101.0, 101.5, 100.75] {
//!     prices.call(&p).unwrap();
//! }
//! assert_eq!(prices.stats().records, 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod binding;
mod config;
mod error;
mod file;
pub mod layout;
mod series;
mod signal;
mod stats;
mod types;

pub use binding::{bind_recorder, Binding, Environment, RecordFn, Recorder};
pub use config::{Config, SeriesConfig, DEFAULT_BATCH_SIZE, DEFAULT_PAGE_SIZE};
pub use error::{CoreError, CoreResult};
pub use file::LogFile;
pub use series::{CompressedSeries, RawSeries, Series, StoredSeries};
pub use signal::{EventKind, SeriesEvent, SignalHub};
pub use stats::{SeriesStats, StatsSnapshot};
pub use types::{FileRef, RetirePolicy, SeriesDescriptor, StorageMode};

pub use serieslog_codec::{Storable, TypeDesc};
