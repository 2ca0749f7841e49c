//! # serieslog testkit
//!
//! Test utilities for serieslog.
//!
//! This crate provides:
//! - Log file fixtures backed by memory or temporary files
//! - Readers that walk raw chains and compressed regions the way an
//!   external consumer would
//! - Property-based test generators using proptest
//! - Stress helpers that record from many threads while a reader tails
//! - Layout vectors pinning the on-disk encoding
//!
//! ## Usage
//!
//! ```rust
//! use serieslog_testkit::prelude::*;
//! use serieslog_core::{Series, SeriesConfig};
//!
//! let log = TestLog::memory();
//! let series = Series::<u32>::with_config(&log, "hits", SeriesConfig::raw(4)).unwrap();
//! for i in 0..10 {
//!     series.call(&i).unwrap();
//! }
//! assert_eq!(read_raw::<u32>(&log, "hits").unwrap(), (0..10).collect::<Vec<_>>());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod inspect;
pub mod stress;
pub mod vectors;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
    pub use crate::inspect::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use inspect::*;
pub use stress::*;
pub use vectors::*;

static TRACING: Once = Once::new();

/// Installs a test subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
