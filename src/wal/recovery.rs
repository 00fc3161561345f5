//! WAL Recovery
//!
//! Replays a log file of write batches into a memtable on startup.

use std::path::Path;

use crate::batch::WriteBatch;
use crate::error::Result;
use crate::format::SequenceNumber;
use crate::memtable::MemTable;

use super::WalReader;

/// Replays write batches from WAL files
pub struct WalRecovery;

/// Result of replaying one log file
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of batches replayed
    pub batches_recovered: u64,

    /// Number of individual puts/deletes replayed
    pub entries_recovered: u64,

    /// Highest sequence number assigned to a replayed entry
    pub max_sequence: Option<SequenceNumber>,
}

impl WalRecovery {
    /// Replay every batch in `path` into `mem`, in log order.
    ///
    /// Stops at the first corrupt record and returns its error; nothing
    /// after a bad record is applied.
    pub fn replay(path: &Path, mem: &MemTable) -> Result<RecoveryResult> {
        let mut result = RecoveryResult::default();
        let mut reader = WalReader::open(path)?;

        while let Some(record) = reader.read_record()? {
            let batch = WriteBatch::decode(&record)?;
            batch.insert_into(mem);

            result.batches_recovered += 1;
            result.entries_recovered += batch.count() as u64;
            if !batch.is_empty() {
                let last = batch.last_sequence();
                result.max_sequence = Some(result.max_sequence.map_or(last, |m| m.max(last)));
            }
        }

        Ok(result)
    }

    /// Check a log file without applying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::replay(path, &MemTable::new())
    }
}
