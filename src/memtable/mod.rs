//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Store every write as an internal-key record (tombstones included)
//! - Answer point reads as of a sequence number
//! - Track approximate memory usage for rotation
//!
//! ## Data Structure Choice
//! A `SkipList` of encoded memtable records behind a `parking_lot::RwLock`.
//! Records are never edited in place, so readers only contend with the
//! short insert critical section of writers.

mod table;

pub use table::{MemTable, MemTableKeyComparator};

/// Result of a memtable point lookup that found a record for the key
#[derive(Debug, Clone, PartialEq)]
pub enum MemTableEntry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone: the key is definitively absent as of the read sequence
    Tombstone,
}
