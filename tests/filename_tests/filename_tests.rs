//! Tests for database file names and the CURRENT pointer

use std::fs;

use stratakv::filename::{
    current_file_name, parse_file_name, read_current_file, set_current_file, temp_file_name, FileType,
};
use tempfile::TempDir;

#[test]
fn test_parse_file_name() {
    assert_eq!(parse_file_name("CURRENT"), Some((0, FileType::Current)));
    assert_eq!(parse_file_name("7.log"), Some((7, FileType::Log)));
    assert_eq!(parse_file_name("12.manifest"), Some((12, FileType::Manifest)));
    assert_eq!(parse_file_name("3.dbtmp"), Some((3, FileType::Temp)));

    for bad in ["", "log", ".log", "x.log", "1.sst", "-1.log", "1.log.bak", "CURRENT.log"] {
        assert_eq!(parse_file_name(bad), None, "{}", bad);
    }
}

#[test]
fn test_set_and_read_current() {
    let dir = TempDir::new().unwrap();
    set_current_file(dir.path(), 5).unwrap();

    assert_eq!(fs::read_to_string(current_file_name(dir.path())).unwrap(), "5.manifest\n");
    assert_eq!(read_current_file(dir.path()).unwrap(), "5.manifest");
    assert!(!temp_file_name(dir.path(), 5).exists());
}

#[test]
fn test_bad_current_is_corruption() {
    let dir = TempDir::new().unwrap();
    fs::write(current_file_name(dir.path()), "").unwrap();
    assert!(read_current_file(dir.path()).unwrap_err().is_corruption());

    fs::write(current_file_name(dir.path()), "7.log\n").unwrap();
    assert!(read_current_file(dir.path()).unwrap_err().is_corruption());
}
