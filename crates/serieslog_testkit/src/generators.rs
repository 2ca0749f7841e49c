//! Property-based test generators using proptest.
//!
//! Provides strategies for series names, configurations and value
//! sequences that respect the constraints writers enforce.

use proptest::prelude::*;
use serieslog_core::{RetirePolicy, SeriesConfig, StorageMode};

/// Strategy for generating valid series names.
pub fn series_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_.]{0,23}").expect("Invalid regex")
}

/// Strategy for small batch sizes, so rollover and retirement happen often.
pub fn batch_size_strategy() -> impl Strategy<Value = usize> {
    1usize..=16
}

/// Strategy for a storage mode.
pub fn storage_mode_strategy() -> impl Strategy<Value = StorageMode> {
    prop_oneof![Just(StorageMode::Raw), Just(StorageMode::Compressed)]
}

/// Strategy for region page sizes, from the minimum up to a few KiB.
pub fn page_size_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![Just(64usize), Just(128), Just(512), Just(4096)]
}

/// Strategy for a valid series configuration.
pub fn series_config_strategy() -> impl Strategy<Value = SeriesConfig> {
    (
        batch_size_strategy(),
        storage_mode_strategy(),
        page_size_strategy(),
        any::<bool>(),
    )
        .prop_map(|(batch, mode, page_size, saturate)| {
            let policy = if saturate {
                RetirePolicy::RecordCountOrSaturation
            } else {
                RetirePolicy::RecordCount
            };
            SeriesConfig::new()
                .batch_size(batch)
                .mode(mode)
                .region_page_size(page_size)
                .retire_policy(policy)
        })
}

/// Strategy for a sequence of record values.
pub fn values_strategy<T: Arbitrary>(max_len: usize) -> impl Strategy<Value = Vec<T>> {
    prop::collection::vec(any::<T>(), 0..max_len)
}

/// Strategy for a slowly moving counter, the shape delta models shrink best.
pub fn counter_strategy(max_len: usize) -> impl Strategy<Value = Vec<u64>> {
    (any::<u32>(), prop::collection::vec(0u64..16, 0..max_len)).prop_map(|(start, steps)| {
        steps
            .into_iter()
            .scan(u64::from(start), |acc, step| {
                *acc += step;
                Some(*acc)
            })
            .collect()
    })
}

/// Strategy for a sequence with long runs of repeated values.
pub fn runs_strategy(max_runs: usize) -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec((any::<bool>(), 1usize..32), 0..max_runs).prop_map(|runs| {
        runs.into_iter()
            .flat_map(|(value, len)| std::iter::repeat(value).take(len))
            .collect()
    })
}
