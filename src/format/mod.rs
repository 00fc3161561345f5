//! Format Module
//!
//! Pure encode/decode of internal keys, memtable records and lookup keys.
//! No I/O happens here.
//!
//! ## Internal key
//! ```text
//! ┌──────────────────┬──────────────────────────────────┐
//! │ user key (var)   │ tag = seq << 8 | type  (8, LE)   │
//! └──────────────────┴──────────────────────────────────┘
//! ```
//!
//! ## Memtable record
//! ```text
//! ┌──────────┬────────────────┬────────────┬─────────────┐
//! │ ILen (4) │ internal key   │ VLen (4)   │ value       │
//! └──────────┴────────────────┴────────────┴─────────────┘
//! ```
//!
//! All integers are fixed-width little-endian.

pub(crate) mod coding;
mod key;
mod record;

pub use key::{
    extract_user_key, pack_sequence_and_type, unpack_sequence_and_type, InternalKey,
    InternalKeyComparator, ParsedInternalKey,
};
pub use record::{encode_memtable_record, memtable_record_internal_key, LookupKey, MemTableRecord};

use crate::error::{Result, StrataError};

/// Monotonic write counter. Only the low 56 bits are usable.
pub type SequenceNumber = u64;

/// Largest sequence number that fits in a tag.
pub const MAX_SEQUENCE_NUMBER: SequenceNumber = (1 << 56) - 1;

/// Size of the sequence/type tag appended to every user key.
pub const TAG_SIZE: usize = 8;

/// Kind of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// Tombstone; carries an empty payload
    Deletion = 0x00,
    /// Live value
    Value = 0x01,
}

/// Type used in lookup keys: the largest type, so a seek at sequence `s`
/// lands on the newest record visible at `s`.
pub const VALUE_TYPE_FOR_SEEK: ValueType = ValueType::Value;

impl ValueType {
    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(ValueType::Deletion),
            0x01 => Ok(ValueType::Value),
            other => Err(StrataError::corruption(format!("unknown value type {}", other))),
        }
    }
}
