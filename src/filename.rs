//! Database file names
//!
//! ```text
//! {db}/CURRENT        single line naming the active manifest
//! {db}/{N}.manifest   version edits
//! {db}/{N}.log        write-ahead log
//! {db}/{N}.dbtmp      scratch file used while rewriting CURRENT
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, StrataError};

pub const CURRENT_FILENAME: &str = "CURRENT";

/// Kinds of files found in a database directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Current,
    Log,
    Manifest,
    Temp,
}

pub fn current_file_name(db: &Path) -> PathBuf {
    db.join(CURRENT_FILENAME)
}

pub fn log_file_name(db: &Path, number: u64) -> PathBuf {
    db.join(format!("{}.log", number))
}

pub fn manifest_file_name(db: &Path, number: u64) -> PathBuf {
    db.join(manifest_base_name(number))
}

pub fn temp_file_name(db: &Path, number: u64) -> PathBuf {
    db.join(format!("{}.dbtmp", number))
}

fn manifest_base_name(number: u64) -> String {
    format!("{}.manifest", number)
}

/// Classify a file name (not a path).
///
/// "CURRENT" → (0, Current), "7.log" → (7, Log), "2.manifest" → (2, Manifest)
pub fn parse_file_name(name: &str) -> Option<(u64, FileType)> {
    if name == CURRENT_FILENAME {
        return Some((0, FileType::Current));
    }
    let (stem, ext) = name.split_once('.')?;
    let file_type = match ext {
        "log" => FileType::Log,
        "manifest" => FileType::Manifest,
        "dbtmp" => FileType::Temp,
        _ => return None,
    };
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((stem.parse().ok()?, file_type))
}

/// Point CURRENT at manifest `number`: write a temp file, then rename it
/// over CURRENT so readers never observe a partial name.
pub fn set_current_file(db: &Path, number: u64) -> Result<()> {
    let tmp = temp_file_name(db, number);
    let written = (|| -> Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(manifest_base_name(number).as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        fs::rename(&tmp, current_file_name(db))?;
        Ok(())
    })();
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

/// Name of the manifest CURRENT points at.
pub fn read_current_file(db: &Path) -> Result<String> {
    let contents = fs::read_to_string(current_file_name(db))?;
    let name = contents.trim_end_matches(&['\n', '\r'][..]);
    if name.is_empty() {
        return Err(StrataError::corruption("CURRENT file is empty"));
    }
    match parse_file_name(name) {
        Some((_, FileType::Manifest)) => Ok(name.to_string()),
        _ => Err(StrataError::corruption(format!(
            "CURRENT names an invalid manifest: {:?}",
            name
        ))),
    }
}
