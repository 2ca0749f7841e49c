//! End-to-end properties of series writers, checked through the readers.

use proptest::prelude::*;
use serieslog_codec::models::{DeltaModel, RunLengthModel};
use serieslog_core::{
    CompressedSeries, CoreError, RawSeries, Series, SeriesConfig, StorageMode, StoredSeries,
};
use serieslog_testkit::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn raw_round_trip(values in values_strategy::<i64>(200), batch in batch_size_strategy()) {
        let log = TestLog::memory();
        let series = Series::<i64>::with_config(&log, "v", SeriesConfig::raw(batch)).unwrap();
        for v in &values {
            series.call(v).unwrap();
        }
        prop_assert_eq!(read_raw::<i64>(&log, "v").unwrap(), values);
    }

    #[test]
    fn compressed_round_trip(values in counter_strategy(200), batch in batch_size_strategy()) {
        let log = TestLog::memory();
        scenarios::record_all(&log, "v", SeriesConfig::compressed(batch), values.clone());
        let read = read_compressed::<u64>(&log, "v", DeltaModel::<u64>::decode).unwrap();
        prop_assert_eq!(read, values);
    }

    #[test]
    fn run_length_round_trip_across_small_pages(values in runs_strategy(20), batch in 1usize..64) {
        let log = TestLog::memory();
        let config = SeriesConfig::compressed(batch).region_page_size(64);
        scenarios::record_all(&log, "flags", config, values.clone());
        let read = read_compressed::<bool>(&log, "flags", RunLengthModel::<bool>::decode).unwrap();
        prop_assert_eq!(read, values);
    }

    #[test]
    fn signalling_does_not_change_file_content(
        values in values_strategy::<u32>(100),
        batch in batch_size_strategy(),
        mode in storage_mode_strategy(),
    ) {
        let quiet = TestLog::memory();
        let loud = TestLog::memory();
        let _events = loud.subscribe();

        let config = SeriesConfig::new().batch_size(batch).mode(mode);
        let a = Series::<u32>::with_config(&quiet, "v", config.clone()).unwrap();
        let b = Series::<u32>::with_config(&loud, "v", config).unwrap();
        for v in &values {
            a.record(v, false).unwrap();
            b.record(v, true).unwrap();
        }
        prop_assert_eq!(quiet.snapshot(), loud.snapshot());
        prop_assert_eq!(a.stats().signals, 0);
        prop_assert_eq!(b.stats().signals, b.stats().records + b.stats().regions_retired);
    }

    #[test]
    fn dispatcher_is_a_pass_through(values in values_strategy::<u16>(60), batch in batch_size_strategy()) {
        // Raw: every operation, including positions and clears
        let direct_log = TestLog::memory();
        let stored_log = TestLog::memory();
        let config = SeriesConfig::raw(batch);
        let mut direct = RawSeries::<u16>::new(&direct_log, "v", &config).unwrap();
        let mut stored = StoredSeries::<u16>::new(&stored_log, "v", &config).unwrap();

        for (i, v) in values.iter().enumerate() {
            match i % 7 {
                3 => {
                    prop_assert_eq!(
                        direct.write_position().unwrap(),
                        stored.write_position().unwrap()
                    );
                }
                5 => {
                    prop_assert_eq!(
                        direct.record_with_ref(v, true).unwrap(),
                        stored.record_with_ref(v, true).unwrap()
                    );
                }
                6 if i % 3 == 0 => {
                    direct.clear(true).unwrap();
                    stored.clear(true).unwrap();
                }
                _ => {
                    direct.record(v, true).unwrap();
                    stored.record(v, true).unwrap();
                }
            }
        }
        prop_assert_eq!(direct_log.snapshot(), stored_log.snapshot());
        prop_assert_eq!(direct.stats().snapshot(), stored.stats().snapshot());

        // Compressed: the same records land in the same regions
        let direct_log = TestLog::memory();
        let stored_log = TestLog::memory();
        let config = SeriesConfig::compressed(batch);
        let mut direct = CompressedSeries::<u16>::new(&direct_log, "v", &config).unwrap();
        let mut stored = StoredSeries::<u16>::new(&stored_log, "v", &config).unwrap();
        for v in &values {
            direct.record(v, true).unwrap();
            stored.record(v, true).unwrap();
        }
        prop_assert_eq!(direct_log.snapshot(), stored_log.snapshot());
        prop_assert_eq!(direct.stats().snapshot(), stored.stats().snapshot());
    }
}

#[test]
fn rollover_allocates_exactly_one_node() {
    let log = TestLog::memory();
    let series = Series::<u64>::with_config(&log, "v", SeriesConfig::raw(8)).unwrap();
    for v in 0..8 {
        series.call(&v).unwrap();
    }
    let head_before = raw_head(&log, "v").unwrap();
    let old_node = chain_nodes(&log, "v").unwrap()[0];
    let old_bytes = log.read_at(old_node.offset, 8 + 8 * 8).unwrap();
    assert_eq!(series.stats().nodes_allocated, 1);

    series.call(&8).unwrap();

    assert_eq!(series.stats().nodes_allocated, 2);
    assert_ne!(raw_head(&log, "v").unwrap(), head_before);
    assert_eq!(log.read_at(old_node.offset, 8 + 8 * 8).unwrap(), old_bytes);

    let nodes = chain_nodes(&log, "v").unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].next, nodes[1].offset);
    assert_eq!((nodes[0].len, nodes[1].len), (8, 1));
}

#[test]
fn clear_leaves_old_records_addressable() {
    let log = TestLog::memory();
    let series = Series::<u32>::with_config(&log, "v", SeriesConfig::raw(4)).unwrap();
    series.call(&10).unwrap();
    let position = series.write_position().unwrap();
    series.call(&11).unwrap();
    let old_first = raw_first(&log, "v").unwrap();

    series.clear(true).unwrap();
    series.call(&99).unwrap();

    assert_eq!(log.read_at(position, 4).unwrap(), 11u32.to_le_bytes());
    assert_eq!(read_raw::<u32>(&log, "v").unwrap(), vec![99]);
    assert_eq!(read_raw_from::<u32>(&log, "v", old_first).unwrap(), vec![10, 11]);
    assert_ne!(raw_first(&log, "v").unwrap(), old_first);
}

#[test]
fn compressed_mode_rejects_positions_and_clears() {
    let log = TestLog::memory();
    let series = Series::<u64>::with_config(&log, "v", SeriesConfig::compressed(4)).unwrap();
    assert_eq!(series.mode(), StorageMode::Compressed);

    for _ in 0..3 {
        series.call(&1).unwrap();
        assert!(matches!(series.write_position(), Err(CoreError::ModeMismatch { .. })));
        assert!(matches!(series.clear(true), Err(CoreError::ModeMismatch { .. })));
        assert!(series.record_with_ref(&1, true).unwrap_err().is_mode_mismatch());
    }
    assert_eq!(series.stats().clears, 0);
}

#[test]
fn full_batch_retires_before_the_next_record() {
    let log = TestLog::memory();
    let series = Series::<u64>::with_config(&log, "v", SeriesConfig::compressed(5)).unwrap();
    for v in 0..5 {
        series.call(&v).unwrap();
    }

    // Retired as soon as the fifth record landed
    let regions = regions(&log, "v").unwrap();
    assert_eq!(regions.len(), 2);
    assert!(regions[0].retired);
    assert_eq!(regions[0].count, 5);
    assert!(!regions[1].retired);
    assert_eq!(
        regions[0].decode(DeltaModel::<u64>::decode).unwrap(),
        vec![0, 1, 2, 3, 4]
    );

    series.call(&5).unwrap();
    series.with_stored(|s| {
        let c = s.as_compressed().unwrap();
        assert_eq!((c.region_id(), c.region_len()), (1, 1));
    });
    assert_eq!(series.stats().regions_retired, 1);
}

#[test]
fn resumed_file_series_keeps_recording() {
    let log = TestLog::file();
    scenarios::record_all::<u64>(&log, "raw", SeriesConfig::raw(3), 0..5);
    scenarios::record_all::<u64>(&log, "packed", SeriesConfig::compressed(3), 0..5);

    let log = log.reopen();
    scenarios::record_all::<u64>(&log, "raw", SeriesConfig::raw(3), 5..8);
    scenarios::record_all::<u64>(&log, "packed", SeriesConfig::compressed(3), 5..8);

    assert_eq!(read_raw::<u64>(&log, "raw").unwrap(), (0..8).collect::<Vec<_>>());
    assert_eq!(
        read_compressed::<u64>(&log, "packed", DeltaModel::<u64>::decode).unwrap(),
        (0..8).collect::<Vec<_>>()
    );
}

#[test]
fn allocation_failure_surfaces_to_the_caller() {
    let log = TestLog::memory_with_limit(4096);
    let series = Series::<u64>::with_config(&log, "v", SeriesConfig::raw(16)).unwrap();

    let err = (0..10_000u64)
        .find_map(|v| series.call(&v).err())
        .expect("the limit must eventually be hit");
    assert!(err.is_allocation_failure());

    // Everything recorded before the failure is still readable
    let recorded = series.stats().records;
    assert_eq!(read_raw::<u64>(&log, "v").unwrap().len() as u64, recorded);
}

#[test]
fn compressed_allocation_failure_keeps_retired_regions_whole() {
    let log = TestLog::memory_with_limit(4096);
    let config = SeriesConfig::compressed(4).region_page_size(64);
    let series = Series::<u64>::with_config(&log, "v", config).unwrap();

    let err = (0..10_000u64)
        .find_map(|v| series.call(&v).err())
        .expect("the limit must eventually be hit");
    assert!(err.is_allocation_failure());
    let recorded = series.stats().records;

    // A refused record changes nothing, however often it is retried
    assert!(series.call(&recorded).unwrap_err().is_allocation_failure());
    assert_eq!(series.stats().records, recorded);

    for region in regions(&log, "v").unwrap() {
        if region.retired {
            region.verify().unwrap();
            assert!(region.count <= 4);
        }
    }
    let read = read_compressed::<u64>(&log, "v", DeltaModel::<u64>::decode).unwrap();
    assert!(read.len() as u64 <= recorded);
    assert_eq!(read, (0..read.len() as u64).collect::<Vec<_>>());
}
