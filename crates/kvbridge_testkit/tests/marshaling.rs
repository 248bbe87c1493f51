//! Integration tests for the bridge against a recording engine.

use kvbridge_core::{
    map_host_value, map_value, BorrowedValue, Bridge, Config, DupFixedBatch, HandleKind, MarshalError,
    NativeValue, PutFlags, RegionSide, Status,
};
use kvbridge_testkit::prelude::*;
use proptest::prelude::*;

#[test]
fn copy_writes_only_the_requested_range() {
    let bridge = recording_bridge();
    let mut dest = GuardedBuffer::filled(10, b'-');

    bridge.copy(b"HELLOWORLD", 5, dest.body_mut(), 3, 5).unwrap();

    assert_eq!(dest.body(), b"---WORLD--");
    assert!(dest.guards_intact());
}

#[test]
fn rejected_copy_leaves_destination_untouched() {
    let bridge = recording_bridge();
    let mut dest = GuardedBuffer::filled(10, b'-');

    let err = bridge.copy(b"HELLOWORLD", 0, dest.body_mut(), 8, 4).unwrap_err();

    assert_eq!(
        err,
        MarshalError::OutOfBounds {
            side: RegionSide::Destination,
            offset: 8,
            len: 4,
            size: 10
        }
    );
    assert_eq!(dest.body(), b"----------");
    assert!(dest.guards_intact());
}

#[test]
fn overlapping_shift_behaves_like_memmove() {
    let bridge = recording_bridge();
    let mut buf = GuardedBuffer::from_bytes(b"abcdefgh");

    bridge.shift(buf.body_mut(), 0, 2, 6).unwrap();
    assert_eq!(buf.body(), b"ababcdef");

    bridge.shift(buf.body_mut(), 2, 0, 6).unwrap();
    assert_eq!(buf.body(), b"abcdefef");
    assert!(buf.guards_intact());
}

#[test]
fn host_value_describes_the_same_bytes() {
    let bridge = recording_bridge();
    let bytes = b"payload".to_vec();
    let native = NativeValue::from_slice(&bytes);

    let host = bridge.map_value(native);
    assert_eq!(host.address, bytes.as_ptr() as u64);
    assert_eq!(host.length, 7);
    assert_eq!(bridge.map_host_value(host), native);

    assert!(bridge.map_value(NativeValue::null()).is_null());
}

#[test]
fn put_multiple_delivers_values_in_order() {
    let bridge = bridge_with(
        RecordingEngine::new().with_status(Status::KEYEXIST),
        Config::default(),
    );

    let status = bridge
        .put_multiple(
            std::ptr::null_mut(),
            3,
            b"key".into(),
            b"AA".into(),
            b"BBB".into(),
            PutFlags::NOOVERWRITE,
        )
        .unwrap();

    assert_eq!(status, Status::KEYEXIST);
    let put = bridge.engine().last_put().unwrap();
    assert_eq!(put.dbi, 3);
    assert_eq!(put.key, b"key");
    assert_eq!(put.data, vec![b"AA".to_vec(), b"BBB".to_vec()]);
    assert_eq!(put.flags, PutFlags::NOOVERWRITE);
}

#[test]
fn put_values_passes_the_whole_sequence() {
    let bridge = recording_bridge();
    let values: Vec<Vec<u8>> = (0..5u8).map(|i| pattern(usize::from(i) + 1, i)).collect();
    let borrowed: Vec<BorrowedValue<'_>> = values.iter().map(Into::into).collect();

    bridge
        .put_values(std::ptr::null_mut(), 1, b"k".into(), &borrowed, PutFlags::APPENDDUP)
        .unwrap();

    assert_eq!(bridge.engine().last_put().unwrap().data, values);

    let err = bridge
        .put_values(std::ptr::null_mut(), 1, b"k".into(), &[], PutFlags::UPSERT)
        .unwrap_err();
    assert_eq!(err, MarshalError::EmptyValueSequence);
    assert_eq!(bridge.engine().put_count(), 1);
}

#[test]
fn dup_fixed_batch_reports_stored_count() {
    let bridge = bridge_with(RecordingEngine::new().with_stored_limit(2), Config::default());
    let batch = DupFixedBatch::new(b"aabbcc", 3).unwrap();

    let outcome = bridge
        .put_batch(std::ptr::null_mut(), 1, b"k".into(), &batch, PutFlags::UPSERT)
        .unwrap();

    assert_eq!(outcome.status, Status::SUCCESS);
    assert_eq!(outcome.stored, 2);
    let put = bridge.engine().last_put().unwrap();
    assert!(put.flags.contains(PutFlags::MULTIPLE));
    assert_eq!(put.lengths, vec![2, 3]);
    assert_eq!(put.data[0], b"aa");
}

#[test]
fn key_limits_come_from_engine_or_config() {
    let engine_limited = bridge_with(RecordingEngine::new().with_max_key_size(4), Config::default());
    let err = engine_limited
        .put_multiple(
            std::ptr::null_mut(),
            1,
            b"too long".into(),
            b"a".into(),
            b"b".into(),
            PutFlags::UPSERT,
        )
        .unwrap_err();
    assert_eq!(err, MarshalError::BadValSize { size: 8, max: 4 });
    assert_eq!(engine_limited.engine().put_count(), 0);

    let config_limited = bridge_with(
        RecordingEngine::new().with_max_key_size(4),
        Config::default().max_key_size(16),
    );
    assert_eq!(config_limited.key_limit(), Some(16));
    config_limited
        .put_multiple(
            std::ptr::null_mut(),
            1,
            b"too long".into(),
            b"a".into(),
            b"b".into(),
            PutFlags::UPSERT,
        )
        .unwrap();

    let unchecked = bridge_with(
        RecordingEngine::new().with_max_key_size(4),
        Config::default().check_key_size(false),
    );
    unchecked
        .put_multiple(
            std::ptr::null_mut(),
            1,
            b"too long".into(),
            b"a".into(),
            b"b".into(),
            PutFlags::UPSERT,
        )
        .unwrap();
    assert_eq!(unchecked.engine().put_count(), 1);
}

#[test]
fn dup_data_is_checked_against_key_limit() {
    let strict = bridge_with(
        RecordingEngine::new().with_max_key_size(4),
        Config::default().check_dup_data(true),
    );
    let err = strict
        .put_multiple(
            std::ptr::null_mut(),
            1,
            b"k".into(),
            b"data too long".into(),
            b"b".into(),
            PutFlags::UPSERT,
        )
        .unwrap_err();
    assert_eq!(err, MarshalError::BadValSize { size: 13, max: 4 });
    assert_eq!(strict.engine().put_count(), 0);

    let batch = DupFixedBatch::new(b"aaaabbbbcccc", 3).unwrap();
    let outcome = strict
        .put_batch(std::ptr::null_mut(), 1, b"k".into(), &batch, PutFlags::UPSERT)
        .unwrap();
    assert_eq!(outcome.stored, 3);
    assert_eq!(strict.engine().put_count(), 1);

    let lenient = bridge_with(RecordingEngine::new().with_max_key_size(4), Config::default());
    lenient
        .put_multiple(
            std::ptr::null_mut(),
            1,
            b"k".into(),
            b"data too long".into(),
            b"b".into(),
            PutFlags::UPSERT,
        )
        .unwrap();
    assert_eq!(lenient.engine().last_put().unwrap().data[0], b"data too long");
}

#[test]
fn null_key_never_reaches_engine() {
    let bridge = bridge_with(RecordingEngine::new().with_max_key_size(4), Config::default());
    let mut data = [NativeValue::from_slice(b"v")];

    let err = bridge
        .put_raw(std::ptr::null_mut(), 1, &NativeValue::null(), &mut data, PutFlags::UPSERT)
        .unwrap_err();

    assert_eq!(err, MarshalError::BadValSize { size: 0, max: 4 });
    assert_eq!(bridge.engine().put_count(), 0);
}

#[test]
fn handle_copy_uses_engine_size() {
    let bridge = bridge_with(
        RecordingEngine::new().with_handle_size(HandleKind::Cursor, 24),
        Config::default(),
    );
    let src = pattern(32, 1);
    let mut dst = GuardedBuffer::filled(32, 0xEE);

    bridge.copy_handle(HandleKind::Cursor, &src, dst.body_mut()).unwrap();

    assert_eq!(&dst.body()[..24], &src[..24]);
    assert!(dst.body()[24..].iter().all(|&b| b == 0xEE));
    assert!(dst.guards_intact());

    let captured = bridge.capture_handle(HandleKind::Cursor, &src).unwrap();
    assert_eq!(captured.as_bytes(), &src[..24]);
    assert!(bridge.capture_handle(HandleKind::Cursor, &src[..10]).is_err());
}

proptest! {
    #[test]
    fn copy_matches_slice_copy(case in copy_case_strategy()) {
        let bridge = Bridge::new(RecordingEngine::new(), Config::default());
        let mut dest = GuardedBuffer::new(case.dest_len);
        let mut expected = vec![0u8; case.dest_len];
        expected[case.dest_pos..case.dest_pos + case.length]
            .copy_from_slice(&case.source[case.source_pos..case.source_pos + case.length]);

        bridge
            .copy(&case.source, case.source_pos, dest.body_mut(), case.dest_pos, case.length)
            .unwrap();

        prop_assert_eq!(dest.body(), &expected[..]);
        prop_assert!(dest.guards_intact());
    }

    #[test]
    fn shift_matches_copy_within(case in shift_case_strategy()) {
        let bridge = recording_bridge();
        let mut buf = GuardedBuffer::from_bytes(&case.buf);
        let mut expected = case.buf.clone();
        expected.copy_within(case.source_pos..case.source_pos + case.length, case.dest_pos);

        bridge
            .shift(buf.body_mut(), case.source_pos, case.dest_pos, case.length)
            .unwrap();

        prop_assert_eq!(buf.body(), &expected[..]);
        prop_assert!(buf.guards_intact());
    }

    #[test]
    fn host_mapping_is_lossless(host in host_value_strategy()) {
        prop_assert_eq!(map_value(map_host_value(host)), host);
    }

    #[test]
    fn put_multiple_preserves_order((first, second) in distinct_length_pair_strategy(), key in key_strategy()) {
        let bridge = recording_bridge();

        bridge
            .put_multiple(
                std::ptr::null_mut(),
                1,
                (&key).into(),
                (&first).into(),
                (&second).into(),
                PutFlags::UPSERT,
            )
            .unwrap();

        let put = bridge.engine().last_put().unwrap();
        prop_assert_eq!(&put.key, &key);
        prop_assert_eq!(put.data, vec![first.clone(), second.clone()]);
        prop_assert_eq!(put.lengths, vec![first.len(), second.len()]);
    }

    #[test]
    fn batch_elements_reach_engine((packed, count) in dup_fixed_strategy(), key in key_strategy()) {
        let bridge = recording_bridge();
        let batch = DupFixedBatch::new(&packed, count).unwrap();

        let outcome = bridge
            .put_batch(std::ptr::null_mut(), 1, (&key).into(), &batch, PutFlags::UPSERT)
            .unwrap();

        prop_assert_eq!(outcome.stored, count);
        let put = bridge.engine().last_put().unwrap();
        prop_assert_eq!(&put.data[0], &packed[..batch.element_size()]);
        prop_assert_eq!(put.lengths[1], count);
    }
}
