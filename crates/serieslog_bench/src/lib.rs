//! Shared helpers for the serieslog benchmarks.

pub mod utils;
