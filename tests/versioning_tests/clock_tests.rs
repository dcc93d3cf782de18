//! Vector Clock Tests
//!
//! Tests verify:
//! - Encoding round-trips with an exact consumed byte count
//! - The byte layout of a known clock
//! - Malformed input is rejected
//! - Causal comparison, increment and merge
//! - Splitting `clock || value` blobs

use emberkv::versioning::{ClockEntry, Occurred, VectorClock, Versioned, MAX_CLOCK_ENTRIES};
use emberkv::EmberError;

// =============================================================================
// Helper Functions
// =============================================================================

fn clock(entries: &[(u16, u64)], timestamp: i64) -> VectorClock {
    VectorClock::from_entries(
        entries.iter().map(|&(node, version)| ClockEntry::new(node, version)).collect(),
        timestamp,
    )
    .unwrap()
}

fn assert_malformed(bytes: &[u8]) {
    match VectorClock::from_bytes(bytes) {
        Err(EmberError::MalformedVersion(_)) => {}
        other => panic!("Expected malformed version for {:?}, got {:?}", bytes, other),
    }
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_round_trip_reports_exact_size() {
    let clocks = vec![
        VectorClock::with_timestamp(0),
        clock(&[(1, 1)], 1_700_000_000_000),
        clock(&[(0, 3), (2, 255), (9, 256)], -1),
        clock(&[(5, u64::MAX)], i64::MAX),
        clock(&(0..200u16).map(|n| (n, n as u64 * 7)).collect::<Vec<_>>(), 42),
    ];

    for original in clocks {
        let bytes = original.to_bytes();
        let (decoded, consumed) = VectorClock::from_bytes(&bytes).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(consumed, bytes.len());
        assert_eq!(consumed, original.size_in_bytes());
    }
}

#[test]
fn test_known_layout() {
    let bytes = clock(&[(1, 1), (3, 300)], 1000).to_bytes();

    assert_eq!(
        bytes,
        vec![
            0x00, 0x02, // two entries
            0x02, // 2-byte counters (300 needs two)
            0x00, 0x01, 0x00, 0x01, // node 1 → 1
            0x00, 0x03, 0x01, 0x2C, // node 3 → 300
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0xE8, // timestamp 1000
        ]
    );
}

#[test]
fn test_empty_clock_is_eleven_bytes() {
    let empty = VectorClock::with_timestamp(7);
    assert_eq!(empty.size_in_bytes(), 11);
    assert_eq!(empty.to_bytes().len(), 11);
}

#[test]
fn test_decode_ignores_trailing_payload() {
    let original = clock(&[(4, 10)], 99);
    let mut bytes = original.to_bytes();
    let clock_len = bytes.len();
    bytes.extend_from_slice(b"payload that follows");

    let (decoded, consumed) = VectorClock::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, original);
    assert_eq!(consumed, clock_len);
}

#[test]
fn test_header_too_short() {
    assert_malformed(&[]);
    assert_malformed(&[0x00, 0x01]);
}

#[test]
fn test_truncated_clock() {
    let bytes = clock(&[(1, 1), (2, 2)], 5).to_bytes();
    for len in 3..bytes.len() {
        assert_malformed(&bytes[..len]);
    }
}

#[test]
fn test_entry_count_inconsistent_with_length() {
    let mut bytes = clock(&[(1, 1)], 5).to_bytes();
    // Claim 5 entries while only one is present
    bytes[1] = 5;
    assert_malformed(&bytes);
}

#[test]
fn test_invalid_counter_width() {
    let mut bytes = VectorClock::with_timestamp(0).to_bytes();
    bytes[2] = 0;
    assert_malformed(&bytes);

    bytes[2] = 9;
    assert_malformed(&bytes);
}

#[test]
fn test_unsorted_node_ids_rejected() {
    let bytes = vec![
        0x00, 0x02, 0x01, // two entries, 1-byte counters
        0x00, 0x05, 0x01, // node 5
        0x00, 0x02, 0x01, // node 2, out of order
        0, 0, 0, 0, 0, 0, 0, 0,
    ];
    assert_malformed(&bytes);
}

#[test]
fn test_duplicate_entries_rejected_on_construction() {
    let result = VectorClock::from_entries(
        vec![ClockEntry::new(1, 1), ClockEntry::new(1, 2)],
        0,
    );
    assert!(matches!(result, Err(EmberError::MalformedVersion(_))));
}

// -----------------------------------------------------------------------------
// Entry count limit
// -----------------------------------------------------------------------------

fn full_clock() -> VectorClock {
    let entries = (0..MAX_CLOCK_ENTRIES as u16).map(|n| ClockEntry::new(n, 1)).collect();
    VectorClock::from_entries(entries, 42).unwrap()
}

#[test]
fn test_every_node_id_exceeds_entry_limit() {
    let entries: Vec<ClockEntry> = (0..=u16::MAX).map(|n| ClockEntry::new(n, 1)).collect();
    assert!(matches!(
        VectorClock::from_entries(entries, 42),
        Err(EmberError::MalformedVersion(_))
    ));
}

#[test]
fn test_largest_clock_round_trips() {
    let clock = full_clock();
    let bytes = clock.to_bytes();
    assert_eq!(&bytes[..2], &[0xFF, 0xFF]);

    let (decoded, consumed) = VectorClock::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, clock);
    assert_eq!(consumed, bytes.len());
}

#[test]
fn test_increment_beyond_entry_limit_rejected() {
    let clock = full_clock();

    // The only node id not yet present
    assert!(matches!(
        clock.incremented(u16::MAX, 50),
        Err(EmberError::MalformedVersion(_))
    ));
    assert_eq!(clock.incremented(7, 50).unwrap().version_of(7), 2);
}

#[test]
fn test_merge_beyond_entry_limit_rejected() {
    let last = VectorClock::from_entries(vec![ClockEntry::new(u16::MAX, 1)], 0).unwrap();
    assert!(matches!(
        full_clock().merge(&last),
        Err(EmberError::MalformedVersion(_))
    ));
}

// =============================================================================
// Comparison Tests
// =============================================================================

#[test]
fn test_compare_before_and_after() {
    let older = clock(&[(1, 1)], 0);
    let newer = clock(&[(1, 2)], 0);

    assert_eq!(older.compare(&newer), Occurred::Before);
    assert_eq!(newer.compare(&older), Occurred::After);
}

#[test]
fn test_compare_extra_node_dominates() {
    let a = clock(&[(1, 1)], 0);
    let b = clock(&[(1, 1), (2, 1)], 0);

    assert_eq!(a.compare(&b), Occurred::Before);
    assert_eq!(b.compare(&a), Occurred::After);
}

#[test]
fn test_compare_concurrent() {
    let a = clock(&[(1, 2), (2, 1)], 0);
    let b = clock(&[(1, 1), (2, 2)], 0);

    assert_eq!(a.compare(&b), Occurred::Concurrently);
    assert_eq!(b.compare(&a), Occurred::Concurrently);
}

#[test]
fn test_compare_ignores_timestamp() {
    let a = clock(&[(1, 3)], 10);
    let b = clock(&[(1, 3)], 20);

    assert_eq!(a.compare(&b), Occurred::Equal);
    assert_ne!(a, b);
}

#[test]
fn test_incremented_returns_new_clock() {
    let original = clock(&[(1, 1)], 0);
    let next = original.incremented(1, 50).unwrap();
    let other_node = next.incremented(7, 60).unwrap();

    assert_eq!(original.version_of(1), 1);
    assert_eq!(next.version_of(1), 2);
    assert_eq!(next.timestamp(), 50);
    assert_eq!(other_node.version_of(7), 1);
    assert_eq!(other_node.entries().len(), 2);
    assert_eq!(original.compare(&next), Occurred::Before);
    assert_eq!(next.compare(&other_node), Occurred::Before);
}

#[test]
fn test_merge_dominates_both_inputs() {
    let a = clock(&[(1, 4), (2, 1)], 10);
    let b = clock(&[(2, 3), (3, 1)], 30);
    let merged = a.merge(&b).unwrap();

    assert_eq!(merged.version_of(1), 4);
    assert_eq!(merged.version_of(2), 3);
    assert_eq!(merged.version_of(3), 1);
    assert_eq!(merged.timestamp(), 30);
    assert_eq!(a.compare(&merged), Occurred::Before);
    assert_eq!(b.compare(&merged), Occurred::Before);
}

// =============================================================================
// Blob Tests
// =============================================================================

#[test]
fn test_blob_split_uses_clock_length() {
    let versioned = Versioned::new(b"hello world".to_vec(), clock(&[(2, 9)], 123));
    let blob = versioned.to_blob();

    assert_eq!(blob.len(), versioned.version().size_in_bytes() + 11);
    assert_eq!(Versioned::from_blob(&blob).unwrap(), versioned);
}

#[test]
fn test_blob_with_empty_value() {
    let versioned = Versioned::new(Vec::new(), clock(&[(2, 9)], 123));
    let decoded = Versioned::from_blob(&versioned.to_blob()).unwrap();
    assert!(decoded.value().is_empty());
}

#[test]
fn test_blob_too_short_for_clock() {
    let blob = clock(&[(2, 9)], 123).to_bytes();
    let result = Versioned::from_blob(&blob[..blob.len() - 1]);
    assert!(matches!(result, Err(EmberError::MalformedVersion(_))));
}
