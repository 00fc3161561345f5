//! Memtable records and lookup keys.

use bytes::BufMut;

use crate::error::Result;

use super::coding::{read_length_prefixed, read_u32};
use super::key::{pack_sequence_and_type, ParsedInternalKey};
use super::{SequenceNumber, ValueType, TAG_SIZE, VALUE_TYPE_FOR_SEEK};

const LENGTH_SIZE: usize = 4;

/// Encode `[ilen][user_key ++ tag][vlen][value]`.
pub fn encode_memtable_record(
    sequence: SequenceNumber,
    user_key: &[u8],
    value: &[u8],
    value_type: ValueType,
) -> Vec<u8> {
    let internal_len = user_key.len() + TAG_SIZE;
    let mut buf = Vec::with_capacity(LENGTH_SIZE * 2 + internal_len + value.len());
    buf.put_u32_le(internal_len as u32);
    buf.put_slice(user_key);
    buf.put_u64_le(pack_sequence_and_type(sequence, value_type));
    buf.put_u32_le(value.len() as u32);
    buf.put_slice(value);
    buf
}

/// Internal key of a memtable record or lookup key, without validation.
///
/// Used on the comparison path where the input was produced by this module.
/// Malformed input yields whatever bytes are available.
pub fn memtable_record_internal_key(record: &[u8]) -> &[u8] {
    if record.len() < LENGTH_SIZE {
        return &[];
    }
    let mut len = [0u8; LENGTH_SIZE];
    len.copy_from_slice(&record[..LENGTH_SIZE]);
    let end = (LENGTH_SIZE + u32::from_le_bytes(len) as usize).min(record.len());
    &record[LENGTH_SIZE..end]
}

/// Zero-copy decoded view of a memtable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemTableRecord<'a> {
    pub internal_key: &'a [u8],
    pub user_key: &'a [u8],
    pub sequence: SequenceNumber,
    pub value_type: ValueType,
    pub value: &'a [u8],
}

impl<'a> MemTableRecord<'a> {
    pub fn parse(record: &'a [u8]) -> Result<Self> {
        let mut buf = record;
        let internal_key = read_length_prefixed(&mut buf, "memtable internal key")?;
        let parsed = ParsedInternalKey::parse(internal_key)?;
        let value = read_length_prefixed(&mut buf, "memtable value")?;
        Ok(Self {
            internal_key,
            user_key: parsed.user_key,
            sequence: parsed.sequence,
            value_type: parsed.value_type,
            value,
        })
    }

    /// Length of the user key, read from the record's length prefix.
    pub fn user_key_len(record: &[u8]) -> Result<usize> {
        let mut buf = record;
        let internal_len = read_u32(&mut buf, "memtable key length")? as usize;
        Ok(internal_len.saturating_sub(TAG_SIZE))
    }
}

/// Seek probe for "newest version of `user_key` at or below `sequence`".
///
/// ```text
/// |<ilen>|<user_key>|<tag(sequence, Value)>|
/// |<-            memtable key           ->|
///        |<-        internal key        ->|
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupKey {
    rep: Vec<u8>,
}

impl LookupKey {
    pub fn new(user_key: &[u8], sequence: SequenceNumber) -> Self {
        let internal_len = user_key.len() + TAG_SIZE;
        let mut rep = Vec::with_capacity(LENGTH_SIZE + internal_len);
        rep.put_u32_le(internal_len as u32);
        rep.put_slice(user_key);
        rep.put_u64_le(pack_sequence_and_type(sequence, VALUE_TYPE_FOR_SEEK));
        Self { rep }
    }

    pub fn memtable_key(&self) -> &[u8] {
        &self.rep
    }

    pub fn internal_key(&self) -> &[u8] {
        &self.rep[LENGTH_SIZE..]
    }

    pub fn user_key(&self) -> &[u8] {
        &self.rep[LENGTH_SIZE..self.rep.len() - TAG_SIZE]
    }
}
