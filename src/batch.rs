//! Write batches
//!
//! A batch is the unit of atomicity: it is written to the WAL as one record
//! and its entries receive consecutive sequence numbers starting at the
//! batch's base sequence.
//!
//! ## Wire Format
//! ```text
//! ┌──────────┬──────────┬──────────────────────────────┐
//! │ Seq (4)  │ Count (4)│ records[count]               │
//! └──────────┴──────────┴──────────────────────────────┘
//! record = type (1) | key_len (4) | key | [value_len (4) | value]
//! ```
//! The value fields are present only for `ValueType::Value`.

use bytes::BufMut;

use crate::error::{Result, StrataError};
use crate::format::coding::{read_length_prefixed, read_u32, read_u8};
use crate::format::{SequenceNumber, ValueType};
use crate::memtable::MemTable;

/// Header size: base sequence (4) + count (4)
pub const BATCH_HEADER_SIZE: usize = 8;

/// One operation inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub value_type: ValueType,
    pub key: Vec<u8>,
    /// Always empty for deletions
    pub value: Vec<u8>,
}

/// Ordered group of puts and deletes applied atomically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    sequence: SequenceNumber,
    entries: Vec<BatchEntry>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> &mut Self {
        self.entries.push(BatchEntry {
            value_type: ValueType::Value,
            key: key.to_vec(),
            value: value.to_vec(),
        });
        self
    }

    pub fn delete(&mut self, key: &[u8]) -> &mut Self {
        self.entries.push(BatchEntry {
            value_type: ValueType::Deletion,
            key: key.to_vec(),
            value: Vec::new(),
        });
        self
    }

    /// Number of operations in the batch
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.sequence = 0;
    }

    /// Sum of key and value bytes
    pub fn approximate_size(&self) -> usize {
        self.entries.iter().map(|e| e.key.len() + e.value.len()).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BatchEntry> {
        self.entries.iter()
    }

    /// Sequence number of the first entry
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    pub fn set_sequence(&mut self, sequence: SequenceNumber) {
        self.sequence = sequence;
    }

    /// Sequence number of the last entry (equal to `sequence() - 1` when empty)
    pub fn last_sequence(&self) -> SequenceNumber {
        (self.sequence + self.entries.len() as u64).saturating_sub(1)
    }

    /// Serialize to the wire format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let sequence = u32::try_from(self.sequence).map_err(|_| {
            StrataError::InvalidArgument(format!(
                "batch sequence {} does not fit the 32-bit batch header",
                self.sequence
            ))
        })?;
        let count = u32::try_from(self.entries.len()).map_err(|_| {
            StrataError::InvalidArgument(format!("batch of {} entries is too large", self.entries.len()))
        })?;

        let mut buf = Vec::with_capacity(BATCH_HEADER_SIZE + self.approximate_size() + 9 * self.entries.len());
        buf.put_u32_le(sequence);
        buf.put_u32_le(count);
        for entry in &self.entries {
            buf.put_u8(entry.value_type as u8);
            buf.put_u32_le(entry.key.len() as u32);
            buf.put_slice(&entry.key);
            if entry.value_type == ValueType::Value {
                buf.put_u32_le(entry.value.len() as u32);
                buf.put_slice(&entry.value);
            }
        }
        Ok(buf)
    }

    /// Parse the wire format. Any disagreement between the header count and
    /// the records present is corruption.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let sequence = read_u32(&mut buf, "batch sequence")? as SequenceNumber;
        let count = read_u32(&mut buf, "batch count")? as usize;

        let mut entries = Vec::with_capacity(count.min(buf.len()));
        for _ in 0..count {
            let entry = Self::decode_entry(&mut buf).map_err(|e| {
                StrataError::corruption(format!("WriteBatch has wrong count: {}", e))
            })?;
            entries.push(entry);
        }

        if !buf.is_empty() {
            return Err(StrataError::corruption(format!(
                "WriteBatch has wrong count: {} trailing bytes after {} records",
                buf.len(),
                count
            )));
        }

        Ok(Self { sequence, entries })
    }

    fn decode_entry(buf: &mut &[u8]) -> Result<BatchEntry> {
        let tag = read_u8(buf, "batch record type")?;
        let value_type = ValueType::from_u8(tag)
            .map_err(|_| StrataError::corruption(format!("unknown WriteBatch tag {}", tag)))?;
        let key = read_length_prefixed(buf, "batch key")?.to_vec();
        let value = match value_type {
            ValueType::Value => read_length_prefixed(buf, "batch value")?.to_vec(),
            ValueType::Deletion => Vec::new(),
        };
        Ok(BatchEntry {
            value_type,
            key,
            value,
        })
    }

    /// Replay every entry into `mem` with consecutive sequence numbers.
    pub fn insert_into(&self, mem: &MemTable) {
        for (offset, entry) in self.entries.iter().enumerate() {
            mem.add(
                self.sequence + offset as u64,
                &entry.key,
                &entry.value,
                entry.value_type,
            );
        }
    }
}

impl<'a> IntoIterator for &'a WriteBatch {
    type Item = &'a BatchEntry;
    type IntoIter = std::slice::Iter<'a, BatchEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
