//! Version Metadata Tests
//!
//! Tests verify:
//! - VersionEdit serialization keeps exactly the populated fields
//! - VersionBuilder folds added/deleted files and compaction pointers
//! - VersionList reference counting
//! - VersionSet recovery, validation and MANIFEST persistence

use std::fs;
use std::path::Path;

use stratakv::config::WalSyncStrategy;
use stratakv::filename::{manifest_file_name, read_current_file, set_current_file};
use stratakv::format::{InternalKey, ValueType};
use stratakv::version::{
    FileMetaData, Version, VersionBuilder, VersionEdit, VersionList, VersionSet, NUM_LEVELS,
};
use stratakv::wal::{WalReader, WalWriter};
use stratakv::StrataError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const MANIFEST_LIMIT: u64 = 2 * 1024 * 1024;

fn file(number: u64, smallest: &[u8], largest: &[u8]) -> FileMetaData {
    FileMetaData::new(
        number,
        1000,
        InternalKey::new(smallest, 1, ValueType::Value).into_bytes(),
        InternalKey::new(largest, 1, ValueType::Value).into_bytes(),
    )
}

fn base_edit() -> VersionEdit {
    let mut edit = VersionEdit::new();
    edit.set_comparator_name("stratakv.BytewiseComparator");
    edit.set_log_number(0);
    edit.set_next_file_number(2);
    edit.set_last_sequence(0);
    edit
}

fn write_manifest(dir: &Path, number: u64, edits: &[VersionEdit]) {
    let mut writer =
        WalWriter::create(&manifest_file_name(dir, number), WalSyncStrategy::EveryWrite).unwrap();
    for edit in edits {
        writer.add_record(&edit.encode().unwrap()).unwrap();
    }
    writer.close().unwrap();
    set_current_file(dir, number).unwrap();
}

/// Turn CURRENT into a non-empty directory so renaming over it fails.
fn block_current(dir: &Path) {
    let current = dir.join("CURRENT");
    fs::remove_file(&current).unwrap();
    fs::create_dir(&current).unwrap();
    fs::write(current.join("blocker"), b"x").unwrap();
}

fn unblock_current(dir: &Path) {
    fs::remove_dir_all(dir.join("CURRENT")).unwrap();
}

fn read_edits(dir: &Path, number: u64) -> Vec<VersionEdit> {
    WalReader::open(&manifest_file_name(dir, number))
        .unwrap()
        .map(|record| VersionEdit::decode(&record.unwrap()).unwrap())
        .collect()
}

// =============================================================================
// VersionEdit Tests
// =============================================================================

#[test]
fn test_edit_round_trip_keeps_presence() {
    let mut edit = VersionEdit::new();
    edit.set_log_number(7);
    edit.set_last_sequence(99);

    let decoded = VersionEdit::decode(&edit.encode().unwrap()).unwrap();
    assert_eq!(decoded, edit);
    assert!(decoded.has_log_number());
    assert!(decoded.has_last_sequence());
    assert!(!decoded.has_comparator());
    assert!(!decoded.has_prev_log_number());
    assert!(!decoded.has_next_file_number());
}

#[test]
fn test_edit_round_trip_all_fields() {
    let mut edit = base_edit();
    edit.set_prev_log_number(3);
    edit.set_compact_pointer(2, InternalKey::new(b"m", 5, ValueType::Value).into_bytes());
    edit.remove_file(1, 11);
    edit.add_file(0, file(12, b"a", b"f"));

    let decoded = VersionEdit::decode(&edit.encode().unwrap()).unwrap();
    assert_eq!(decoded, edit);
    assert_eq!(decoded.new_files[0].1.allowed_seeks, 1 << 30);
}

#[test]
fn test_edit_with_bad_level_is_corruption() {
    let mut edit = VersionEdit::new();
    edit.remove_file(NUM_LEVELS, 1);

    let err = VersionEdit::decode(&edit.encode().unwrap()).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_edit_garbage_is_corruption() {
    assert!(VersionEdit::decode(&[0xff, 0x01]).unwrap_err().is_corruption());
}

// =============================================================================
// VersionBuilder Tests
// =============================================================================

#[test]
fn test_builder_adds_and_sorts_files() {
    let base = Version::new();
    let mut edit = VersionEdit::new();
    edit.add_file(1, file(5, b"m", b"p"));
    edit.add_file(1, file(4, b"a", b"c"));

    let mut builder = VersionBuilder::new(&base);
    builder.apply(&edit);
    let version = builder.build();

    let numbers: Vec<u64> = version.files(1).iter().map(|f| f.number).collect();
    assert_eq!(numbers, vec![4, 5]);
    assert_eq!(version.total_files(), 2);
    assert_eq!(base.total_files(), 0);
}

#[test]
fn test_builder_deletes_files() {
    let mut first = VersionEdit::new();
    first.add_file(0, file(1, b"a", b"b"));
    first.add_file(0, file(2, b"c", b"d"));
    let base = Version::new();
    let mut builder = VersionBuilder::new(&base);
    builder.apply(&first);
    let v1 = builder.build();

    let mut second = VersionEdit::new();
    second.remove_file(0, 1);
    second.set_compact_pointer(0, b"pointer".to_vec());
    let mut builder = VersionBuilder::new(&v1);
    builder.apply(&second);
    let v2 = builder.build();

    assert_eq!(v1.num_files(0), 2);
    assert_eq!(v2.num_files(0), 1);
    assert_eq!(v2.files(0)[0].number, 2);
    assert_eq!(v2.compact_pointer(0), Some(&b"pointer"[..]));
    assert_eq!(v2.compact_pointer(1), None);
}

#[test]
fn test_builder_add_then_delete_in_later_edit() {
    let mut add = VersionEdit::new();
    add.add_file(3, file(9, b"x", b"y"));
    let mut delete = VersionEdit::new();
    delete.remove_file(3, 9);

    let base = Version::new();
    let mut builder = VersionBuilder::new(&base);
    builder.apply(&add);
    builder.apply(&delete);

    assert_eq!(builder.build().total_files(), 0);
}

// =============================================================================
// VersionList Tests
// =============================================================================

#[test]
fn test_version_list_append_releases_unreferenced() {
    let mut list = VersionList::new();
    assert_eq!(list.live(), 1);

    let first = list.append(Version::new());
    assert_eq!(list.live(), 1);
    assert_eq!(list.refs(first), Some(1));

    list.append(Version::new());
    assert_eq!(list.live(), 1);
    assert_eq!(list.refs(first), None);
}

#[test]
fn test_version_list_reader_keeps_old_version_alive() {
    let mut list = VersionList::new();
    let mut edit = VersionEdit::new();
    edit.add_file(0, file(1, b"a", b"b"));
    let base = Version::new();
    let mut builder = VersionBuilder::new(&base);
    builder.apply(&edit);
    let pinned = list.append(builder.build());

    assert!(list.ref_version(pinned));
    list.append(Version::new());

    assert_eq!(list.live(), 2);
    assert_eq!(list.refs(pinned), Some(1));
    assert_eq!(list.get(pinned).unwrap().num_files(0), 1);
    assert_eq!(list.current().num_files(0), 0);

    list.unref(pinned);
    assert_eq!(list.live(), 1);
    assert!(list.get(pinned).is_none());
    assert!(!list.ref_version(pinned));
}

// =============================================================================
// VersionSet Tests
// =============================================================================

#[test]
fn test_recover_reads_scalars() {
    let temp = TempDir::new().unwrap();
    let mut later = VersionEdit::new();
    later.set_log_number(5);
    later.set_next_file_number(9);
    later.set_last_sequence(42);
    later.add_file(2, file(6, b"k", b"q"));
    write_manifest(temp.path(), 1, &[base_edit(), later]);

    let mut versions = VersionSet::new(temp.path(), MANIFEST_LIMIT);
    let new_manifest = versions.recover().unwrap();

    assert!(!new_manifest);
    assert_eq!(versions.log_number(), 5);
    assert_eq!(versions.prev_log_number(), 0);
    assert_eq!(versions.next_file_number(), 9);
    assert_eq!(versions.last_sequence(), 42);
    assert_eq!(versions.manifest_file_number(), 1);
    assert_eq!(versions.current().num_files(2), 1);
}

#[test]
fn test_recover_advances_past_log_numbers() {
    let temp = TempDir::new().unwrap();
    let mut edit = base_edit();
    edit.set_log_number(10);
    edit.set_prev_log_number(12);
    edit.set_next_file_number(4);
    write_manifest(temp.path(), 1, &[edit]);

    let mut versions = VersionSet::new(temp.path(), MANIFEST_LIMIT);
    versions.recover().unwrap();

    assert_eq!(versions.next_file_number(), 13);
    assert_eq!(versions.new_file_number(), 13);
    assert_eq!(versions.next_file_number(), 14);
}

#[test]
fn test_recover_missing_fields_is_corruption() {
    let cases: [fn(&mut VersionEdit); 3] = [
        |e| e.log_number = None,
        |e| e.next_file_number = None,
        |e| e.last_sequence = None,
    ];
    for strip in cases {
        let temp = TempDir::new().unwrap();
        let mut edit = base_edit();
        strip(&mut edit);
        write_manifest(temp.path(), 1, &[edit]);

        let err = VersionSet::new(temp.path(), MANIFEST_LIMIT).recover().unwrap_err();
        assert!(err.is_corruption(), "{}", err);
    }
}

#[test]
fn test_recover_rejects_other_comparator() {
    let temp = TempDir::new().unwrap();
    let mut edit = base_edit();
    edit.set_comparator_name("someone.ReverseComparator");
    write_manifest(temp.path(), 1, &[edit]);

    let err = VersionSet::new(temp.path(), MANIFEST_LIMIT).recover().unwrap_err();
    assert!(matches!(err, stratakv::StrataError::InvalidArgument(_)));
}

#[test]
fn test_recover_missing_manifest_is_corruption() {
    let temp = TempDir::new().unwrap();
    set_current_file(temp.path(), 7).unwrap();

    let err = VersionSet::new(temp.path(), MANIFEST_LIMIT).recover().unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_log_and_apply_appends_to_reused_manifest() {
    let temp = TempDir::new().unwrap();
    write_manifest(temp.path(), 1, &[base_edit()]);

    let mut versions = VersionSet::new(temp.path(), MANIFEST_LIMIT);
    versions.recover().unwrap();
    let log = versions.new_file_number();
    versions.set_last_sequence(17);

    let mut edit = VersionEdit::new();
    edit.add_file(0, file(log + 1, b"a", b"z"));
    versions.log_and_apply(&mut edit).unwrap();
    versions.close().unwrap();

    assert_eq!(edit.log_number, Some(0));
    assert_eq!(edit.next_file_number, Some(3));
    assert_eq!(edit.last_sequence, Some(17));
    assert_eq!(versions.current().num_files(0), 1);

    let edits = read_edits(temp.path(), 1);
    assert_eq!(edits.len(), 2);
    assert_eq!(edits[1], edit);
    assert_eq!(read_current_file(temp.path()).unwrap(), "1.manifest");

    let mut reopened = VersionSet::new(temp.path(), MANIFEST_LIMIT);
    reopened.recover().unwrap();
    assert_eq!(reopened.last_sequence(), 17);
    assert_eq!(reopened.next_file_number(), 3);
    assert_eq!(reopened.current().num_files(0), 1);
}

#[test]
fn test_large_manifest_is_replaced_by_snapshot() {
    let temp = TempDir::new().unwrap();
    let mut with_file = base_edit();
    with_file.add_file(4, file(1, b"c", b"d"));
    write_manifest(temp.path(), 1, &[with_file]);

    // Any existing manifest is "too large"
    let mut versions = VersionSet::new(temp.path(), 1);
    assert!(versions.recover().unwrap());
    assert_eq!(versions.manifest_file_number(), 2);

    versions.log_and_apply(&mut VersionEdit::new()).unwrap();
    versions.close().unwrap();

    assert_eq!(read_current_file(temp.path()).unwrap(), "2.manifest");
    let edits = read_edits(temp.path(), 2);
    assert_eq!(edits.len(), 2);
    // Snapshot first: comparator and the full file set
    assert!(edits[0].has_comparator());
    assert_eq!(edits[0].new_files.len(), 1);
    assert!(edits[1].has_next_file_number());

    let mut reopened = VersionSet::new(temp.path(), MANIFEST_LIMIT);
    reopened.recover().unwrap();
    assert_eq!(reopened.current().num_files(4), 1);
    assert_eq!(reopened.next_file_number(), 3);
}

#[test]
fn test_log_and_apply_rejects_stale_log_number() {
    let temp = TempDir::new().unwrap();
    let mut edit = base_edit();
    edit.set_log_number(5);
    edit.set_next_file_number(8);
    write_manifest(temp.path(), 1, &[edit]);

    let mut versions = VersionSet::new(temp.path(), MANIFEST_LIMIT);
    versions.recover().unwrap();

    let mut stale = VersionEdit::new();
    stale.set_log_number(4);
    assert!(versions.log_and_apply(&mut stale).is_err());

    let mut future = VersionEdit::new();
    future.set_log_number(8);
    assert!(versions.log_and_apply(&mut future).is_err());

    let mut ok = VersionEdit::new();
    ok.set_log_number(6);
    versions.log_and_apply(&mut ok).unwrap();
    assert_eq!(versions.log_number(), 6);
}

#[test]
fn test_pinned_version_survives_log_and_apply() {
    let temp = TempDir::new().unwrap();
    write_manifest(temp.path(), 1, &[base_edit()]);
    let mut versions = VersionSet::new(temp.path(), MANIFEST_LIMIT);
    versions.recover().unwrap();

    let (handle, pinned) = versions.ref_current();
    let mut edit = VersionEdit::new();
    edit.add_file(0, file(2, b"a", b"b"));
    versions.log_and_apply(&mut edit).unwrap();

    assert_eq!(versions.live_versions(), 2);
    assert_eq!(pinned.num_files(0), 0);
    assert_eq!(versions.current().num_files(0), 1);

    versions.unref(handle);
    assert_eq!(versions.live_versions(), 1);
    let _ = fs::metadata(manifest_file_name(temp.path(), 1)).unwrap();
}

#[test]
fn test_failed_current_rewrite_removes_new_manifest() {
    let temp = TempDir::new().unwrap();
    write_manifest(temp.path(), 1, &[base_edit()]);

    // Any existing manifest is "too large", so the next commit starts 2.manifest
    let mut versions = VersionSet::new(temp.path(), 1);
    assert!(versions.recover().unwrap());
    assert_eq!(versions.manifest_file_number(), 2);

    block_current(temp.path());
    let mut edit = VersionEdit::new();
    edit.add_file(0, file(5, b"a", b"b"));
    assert!(versions.log_and_apply(&mut edit).is_err());

    assert_eq!(versions.current().total_files(), 0);
    assert!(!manifest_file_name(temp.path(), 2).exists());

    unblock_current(temp.path());
    let mut edit = VersionEdit::new();
    edit.add_file(0, file(5, b"a", b"b"));
    versions.log_and_apply(&mut edit).unwrap();
    versions.close().unwrap();

    assert_eq!(versions.current().total_files(), 1);
    assert_eq!(read_current_file(temp.path()).unwrap(), "2.manifest");

    let mut reopened = VersionSet::new(temp.path(), MANIFEST_LIMIT);
    reopened.recover().unwrap();
    assert_eq!(reopened.current().num_files(0), 1);
}

#[test]
fn test_failed_current_rewrite_abandons_reused_manifest() {
    let temp = TempDir::new().unwrap();
    write_manifest(temp.path(), 1, &[base_edit()]);

    let mut versions = VersionSet::new(temp.path(), MANIFEST_LIMIT);
    assert!(!versions.recover().unwrap());
    assert_eq!(versions.manifest_file_number(), 1);

    block_current(temp.path());
    let mut edit = VersionEdit::new();
    edit.add_file(0, file(5, b"a", b"b"));
    assert!(versions.log_and_apply(&mut edit).is_err());

    assert_eq!(versions.current().total_files(), 0);
    assert_eq!(versions.manifest_file_number(), 2);

    unblock_current(temp.path());
    let mut edit = VersionEdit::new();
    edit.add_file(0, file(5, b"a", b"b"));
    versions.log_and_apply(&mut edit).unwrap();
    versions.close().unwrap();

    assert_eq!(versions.current().total_files(), 1);
    assert_eq!(read_current_file(temp.path()).unwrap(), "2.manifest");

    let mut reopened = VersionSet::new(temp.path(), MANIFEST_LIMIT);
    reopened.recover().unwrap();
    assert_eq!(reopened.current().num_files(0), 1);
}

#[test]
fn test_log_and_apply_rejects_out_of_range_level() {
    let temp = TempDir::new().unwrap();
    write_manifest(temp.path(), 1, &[base_edit()]);
    let mut versions = VersionSet::new(temp.path(), MANIFEST_LIMIT);
    versions.recover().unwrap();

    let mut edit = VersionEdit::new();
    edit.add_file(NUM_LEVELS, file(5, b"a", b"b"));
    let err = versions.log_and_apply(&mut edit).unwrap_err();
    assert!(matches!(err, StrataError::InvalidArgument(_)));

    let mut edit = VersionEdit::new();
    edit.set_compact_pointer(NUM_LEVELS + 3, b"k".to_vec());
    assert!(matches!(
        versions.log_and_apply(&mut edit),
        Err(StrataError::InvalidArgument(_))
    ));

    assert_eq!(versions.current().total_files(), 0);
    assert_eq!(read_edits(temp.path(), 1).len(), 1);
}
