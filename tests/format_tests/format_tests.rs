//! Key and Record Format Tests
//!
//! Tests verify:
//! - Tag packing and the exact internal key layout
//! - Internal key ordering (user key asc, sequence desc, type tie-break)
//! - Memtable record layout and parsing
//! - Lookup keys and malformed input handling

use std::cmp::Ordering;

use stratakv::comparator::{BytewiseComparator, Comparator};
use stratakv::format::{
    encode_memtable_record, extract_user_key, memtable_record_internal_key, pack_sequence_and_type,
    unpack_sequence_and_type, InternalKey, InternalKeyComparator, LookupKey, MemTableRecord,
    ParsedInternalKey, ValueType, MAX_SEQUENCE_NUMBER,
};

// =============================================================================
// Tag and Internal Key Tests
// =============================================================================

#[test]
fn test_pack_and_unpack_tag() {
    let tag = pack_sequence_and_type(5, ValueType::Value);
    assert_eq!(tag, (5 << 8) | 1);
    assert_eq!(unpack_sequence_and_type(tag).unwrap(), (5, ValueType::Value));

    let tag = pack_sequence_and_type(MAX_SEQUENCE_NUMBER, ValueType::Deletion);
    assert_eq!(
        unpack_sequence_and_type(tag).unwrap(),
        (MAX_SEQUENCE_NUMBER, ValueType::Deletion)
    );
}

#[test]
fn test_unknown_value_type_is_corruption() {
    let err = unpack_sequence_and_type((7 << 8) | 0x42).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_internal_key_layout() {
    let key = InternalKey::new(b"foo", 0x0102, ValueType::Value);
    let mut expected = b"foo".to_vec();
    expected.extend_from_slice(&((0x0102u64 << 8) | 1).to_le_bytes());

    assert_eq!(key.as_bytes(), expected.as_slice());
    assert_eq!(key.user_key(), b"foo");
    assert_eq!(key.sequence(), 0x0102);
    assert_eq!(extract_user_key(key.as_bytes()), b"foo");

    let parsed = ParsedInternalKey::parse(key.as_bytes()).unwrap();
    assert_eq!(parsed.user_key, b"foo");
    assert_eq!(parsed.sequence, 0x0102);
    assert_eq!(parsed.value_type, ValueType::Value);
}

#[test]
fn test_internal_key_too_short() {
    assert!(ParsedInternalKey::parse(b"short").unwrap_err().is_corruption());
    assert!(InternalKey::decode(&[1, 2, 3]).unwrap_err().is_corruption());
}

#[test]
fn test_internal_key_ordering() {
    let icmp = InternalKeyComparator::new(BytewiseComparator);
    let key = |k: &[u8], s, t| InternalKey::new(k, s, t).into_bytes();

    // User key ascending
    assert_eq!(
        icmp.compare(&key(b"a", 1, ValueType::Value), &key(b"b", 9, ValueType::Value)),
        Ordering::Less
    );
    // Newer sequence first
    assert_eq!(
        icmp.compare(&key(b"a", 9, ValueType::Value), &key(b"a", 1, ValueType::Value)),
        Ordering::Less
    );
    // Equal sequence: larger type first
    assert_eq!(
        icmp.compare(&key(b"a", 3, ValueType::Value), &key(b"a", 3, ValueType::Deletion)),
        Ordering::Less
    );
    assert_eq!(
        icmp.compare(&key(b"a", 3, ValueType::Value), &key(b"a", 3, ValueType::Value)),
        Ordering::Equal
    );
    // Prefix user keys sort before their extensions regardless of sequence
    assert_eq!(
        icmp.compare(&key(b"a", 1, ValueType::Value), &key(b"ab", 100, ValueType::Value)),
        Ordering::Less
    );
}

// =============================================================================
// Memtable Record Tests
// =============================================================================

#[test]
fn test_memtable_record_layout() {
    let record = encode_memtable_record(7, b"key", b"value", ValueType::Value);

    assert_eq!(&record[..4], &11u32.to_le_bytes());
    assert_eq!(&record[4..7], b"key");
    assert_eq!(&record[7..15], &((7u64 << 8) | 1).to_le_bytes());
    assert_eq!(&record[15..19], &5u32.to_le_bytes());
    assert_eq!(&record[19..], b"value");
    assert_eq!(record.len(), 4 + 3 + 8 + 4 + 5);
}

#[test]
fn test_memtable_record_parse() {
    let record = encode_memtable_record(42, b"user", b"", ValueType::Deletion);
    let parsed = MemTableRecord::parse(&record).unwrap();

    assert_eq!(parsed.user_key, b"user");
    assert_eq!(parsed.sequence, 42);
    assert_eq!(parsed.value_type, ValueType::Deletion);
    assert!(parsed.value.is_empty());
    assert_eq!(parsed.internal_key, memtable_record_internal_key(&record));
    assert_eq!(MemTableRecord::user_key_len(&record).unwrap(), 4);
}

#[test]
fn test_truncated_memtable_record_is_corruption() {
    let record = encode_memtable_record(1, b"key", b"value", ValueType::Value);
    for cut in [0, 3, 10, record.len() - 1] {
        let err = MemTableRecord::parse(&record[..cut]).unwrap_err();
        assert!(err.is_corruption(), "cut at {}", cut);
    }
}

// =============================================================================
// Lookup Key Tests
// =============================================================================

#[test]
fn test_lookup_key_views() {
    let lookup = LookupKey::new(b"abc", 9);

    assert_eq!(lookup.user_key(), b"abc");
    assert_eq!(
        lookup.internal_key(),
        InternalKey::new(b"abc", 9, ValueType::Value).as_bytes()
    );
    assert_eq!(&lookup.memtable_key()[..4], &11u32.to_le_bytes());
    assert_eq!(&lookup.memtable_key()[4..], lookup.internal_key());
}

#[test]
fn test_lookup_key_sorts_before_records_at_same_sequence() {
    let icmp = InternalKeyComparator::new(BytewiseComparator);
    let lookup = LookupKey::new(b"k", 5);

    let newer = InternalKey::new(b"k", 6, ValueType::Value);
    let same_value = InternalKey::new(b"k", 5, ValueType::Value);
    let same_delete = InternalKey::new(b"k", 5, ValueType::Deletion);
    let older = InternalKey::new(b"k", 4, ValueType::Value);

    assert_eq!(icmp.compare(newer.as_bytes(), lookup.internal_key()), Ordering::Less);
    assert_eq!(icmp.compare(lookup.internal_key(), same_value.as_bytes()), Ordering::Equal);
    assert_eq!(icmp.compare(lookup.internal_key(), same_delete.as_bytes()), Ordering::Less);
    assert_eq!(icmp.compare(lookup.internal_key(), older.as_bytes()), Ordering::Less);
}
