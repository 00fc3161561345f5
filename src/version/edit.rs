//! Version edits
//!
//! A `VersionEdit` is a sparse delta over engine metadata. Every scalar
//! field is optional: `None` means "unchanged" and never overwrites the base
//! state when edits are folded together. Edits are serialized with bincode,
//! which tags each `Option` with a presence byte.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};
use crate::format::SequenceNumber;

/// Number of levels tracked for sorted files
pub const NUM_LEVELS: usize = 7;

/// Seeks allowed on a file before it is considered for compaction
pub const DEFAULT_ALLOWED_SEEKS: u32 = 1 << 30;

/// Metadata of one persistent sorted file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetaData {
    pub number: u64,
    pub file_size: u64,
    /// Smallest internal key in the file
    pub smallest: Vec<u8>,
    /// Largest internal key in the file
    pub largest: Vec<u8>,
    pub allowed_seeks: u32,
}

impl FileMetaData {
    pub fn new(number: u64, file_size: u64, smallest: Vec<u8>, largest: Vec<u8>) -> Self {
        Self {
            number,
            file_size,
            smallest,
            largest,
            allowed_seeks: DEFAULT_ALLOWED_SEEKS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEdit {
    pub comparator: Option<String>,
    pub log_number: Option<u64>,
    pub prev_log_number: Option<u64>,
    pub next_file_number: Option<u64>,
    pub last_sequence: Option<SequenceNumber>,

    /// (level, internal key) where the next compaction of the level starts
    pub compact_pointers: Vec<(usize, Vec<u8>)>,
    /// (level, file number)
    pub deleted_files: BTreeSet<(usize, u64)>,
    pub new_files: Vec<(usize, FileMetaData)>,
}

impl VersionEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn set_comparator_name(&mut self, name: impl Into<String>) {
        self.comparator = Some(name.into());
    }

    pub fn set_log_number(&mut self, number: u64) {
        self.log_number = Some(number);
    }

    pub fn set_prev_log_number(&mut self, number: u64) {
        self.prev_log_number = Some(number);
    }

    pub fn set_next_file_number(&mut self, number: u64) {
        self.next_file_number = Some(number);
    }

    pub fn set_last_sequence(&mut self, sequence: SequenceNumber) {
        self.last_sequence = Some(sequence);
    }

    pub fn has_comparator(&self) -> bool {
        self.comparator.is_some()
    }

    pub fn has_log_number(&self) -> bool {
        self.log_number.is_some()
    }

    pub fn has_prev_log_number(&self) -> bool {
        self.prev_log_number.is_some()
    }

    pub fn has_next_file_number(&self) -> bool {
        self.next_file_number.is_some()
    }

    pub fn has_last_sequence(&self) -> bool {
        self.last_sequence.is_some()
    }

    pub fn set_compact_pointer(&mut self, level: usize, key: Vec<u8>) {
        self.compact_pointers.push((level, key));
    }

    pub fn add_file(&mut self, level: usize, file: FileMetaData) {
        self.new_files.push((level, file));
    }

    pub fn remove_file(&mut self, level: usize, number: u64) {
        self.deleted_files.insert((level, number));
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode an edit, rejecting levels outside `0..NUM_LEVELS`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let edit: Self = bincode::deserialize(data)?;
        match edit.out_of_range_level() {
            Some(level) => Err(StrataError::corruption(format!(
                "version edit names level {} (max {})",
                level,
                NUM_LEVELS - 1
            ))),
            None => Ok(edit),
        }
    }

    /// First level named by the edit that is not below `NUM_LEVELS`
    pub fn out_of_range_level(&self) -> Option<usize> {
        self.compact_pointers
            .iter()
            .map(|(level, _)| *level)
            .chain(self.deleted_files.iter().map(|(level, _)| *level))
            .chain(self.new_files.iter().map(|(level, _)| *level))
            .find(|&level| level >= NUM_LEVELS)
    }
}
