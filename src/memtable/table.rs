//! MemTable implementation
//!
//! SkipList-based memtable with RwLock for concurrency.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use parking_lot::RwLock;

use crate::comparator::{BytewiseComparator, Comparator};
use crate::error::Result;
use crate::format::{
    encode_memtable_record, memtable_record_internal_key, InternalKey, InternalKeyComparator,
    LookupKey, MemTableRecord, SequenceNumber, ValueType,
};
use crate::skiplist::SkipList;

use super::MemTableEntry;

/// Orders encoded memtable records by their internal keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemTableKeyComparator {
    internal: InternalKeyComparator<BytewiseComparator>,
}

impl Comparator<Vec<u8>> for MemTableKeyComparator {
    fn compare(&self, a: &Vec<u8>, b: &Vec<u8>) -> Ordering {
        self.internal.compare(
            memtable_record_internal_key(a),
            memtable_record_internal_key(b),
        )
    }

    fn name(&self) -> &'static str {
        self.internal.name()
    }
}

/// In-memory table for recent writes
pub struct MemTable {
    table: RwLock<SkipList<Vec<u8>, (), MemTableKeyComparator>>,
    comparator: InternalKeyComparator<BytewiseComparator>,
    /// Sum of encoded record sizes
    memory_usage: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            table: RwLock::new(SkipList::new(MemTableKeyComparator::default())),
            comparator: InternalKeyComparator::default(),
            memory_usage: AtomicUsize::new(0),
        }
    }

    /// Add a record for `key` at `sequence`. Deletions carry an empty value.
    pub fn add(&self, sequence: SequenceNumber, key: &[u8], value: &[u8], value_type: ValueType) {
        let record = encode_memtable_record(sequence, key, value, value_type);
        let size = record.len();
        self.table.write().insert(record, ());
        self.memory_usage.fetch_add(size, AtomicOrdering::Relaxed);
    }

    /// Look up the newest record for the lookup key's user key at or below
    /// its sequence number.
    ///
    /// Returns:
    /// - `Ok(Some(Value(v)))`: live value
    /// - `Ok(Some(Tombstone))`: deleted as of this sequence
    /// - `Ok(None)`: no record here; consult the next older table
    pub fn get(&self, key: &LookupKey) -> Result<Option<MemTableEntry>> {
        let probe = key.memtable_key().to_vec();
        let guard = self.table.read();
        let table = &*guard;

        let mut cursor = table.cursor();
        cursor.seek(table, &probe);
        let Some(found) = cursor.key(table) else {
            return Ok(None);
        };

        let record = MemTableRecord::parse(found)?;
        if self.comparator.compare_user_keys(record.user_key, key.user_key()) != Ordering::Equal {
            return Ok(None);
        }

        Ok(Some(match record.value_type {
            ValueType::Value => MemTableEntry::Value(record.value.to_vec()),
            ValueType::Deletion => MemTableEntry::Tombstone,
        }))
    }

    /// Approximate memory usage in bytes
    pub fn approximate_memory_usage(&self) -> usize {
        self.memory_usage.load(AtomicOrdering::Relaxed)
    }

    /// Number of records (every version of every key counts)
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records in internal-key order, newest version of each key first.
    pub fn entries(&self) -> Result<Vec<(InternalKey, Vec<u8>)>> {
        let table = self.table.read();
        table
            .iter()
            .map(|(record, _)| {
                let parsed = MemTableRecord::parse(record)?;
                Ok((InternalKey::decode(parsed.internal_key)?, parsed.value.to_vec()))
            })
            .collect()
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}
