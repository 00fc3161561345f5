//! Internal keys and their ordering.

use std::cmp::Ordering;

use bytes::BufMut;

use crate::comparator::{BytewiseComparator, Comparator};
use crate::error::{Result, StrataError};

use super::{SequenceNumber, ValueType, MAX_SEQUENCE_NUMBER, TAG_SIZE};

/// Pack a sequence number and type into the 8-byte tag value.
pub fn pack_sequence_and_type(sequence: SequenceNumber, value_type: ValueType) -> u64 {
    debug_assert!(sequence <= MAX_SEQUENCE_NUMBER);
    (sequence << 8) | value_type as u64
}

pub fn unpack_sequence_and_type(tag: u64) -> Result<(SequenceNumber, ValueType)> {
    let value_type = ValueType::from_u8((tag & 0xff) as u8)?;
    Ok((tag >> 8, value_type))
}

/// User-key portion of an encoded internal key.
pub fn extract_user_key(internal_key: &[u8]) -> &[u8] {
    &internal_key[..internal_key.len().saturating_sub(TAG_SIZE)]
}

fn extract_tag(internal_key: &[u8]) -> u64 {
    match internal_key.len().checked_sub(TAG_SIZE) {
        Some(start) => {
            let mut tag = [0u8; TAG_SIZE];
            tag.copy_from_slice(&internal_key[start..]);
            u64::from_le_bytes(tag)
        }
        None => 0,
    }
}

/// Owned encoded internal key: `user_key ++ tag`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalKey {
    rep: Vec<u8>,
}

impl InternalKey {
    pub fn new(user_key: &[u8], sequence: SequenceNumber, value_type: ValueType) -> Self {
        let mut rep = Vec::with_capacity(user_key.len() + TAG_SIZE);
        rep.put_slice(user_key);
        rep.put_u64_le(pack_sequence_and_type(sequence, value_type));
        Self { rep }
    }

    /// Wrap already encoded bytes, validating the tag.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        ParsedInternalKey::parse(bytes)?;
        Ok(Self { rep: bytes.to_vec() })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.rep
    }

    pub fn user_key(&self) -> &[u8] {
        extract_user_key(&self.rep)
    }

    pub fn sequence(&self) -> SequenceNumber {
        extract_tag(&self.rep) >> 8
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.rep
    }
}

/// Borrowed, decoded view of an internal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedInternalKey<'a> {
    pub user_key: &'a [u8],
    pub sequence: SequenceNumber,
    pub value_type: ValueType,
}

impl<'a> ParsedInternalKey<'a> {
    pub fn parse(internal_key: &'a [u8]) -> Result<Self> {
        if internal_key.len() < TAG_SIZE {
            return Err(StrataError::corruption(format!(
                "internal key too short: {} bytes",
                internal_key.len()
            )));
        }
        let (sequence, value_type) = unpack_sequence_and_type(extract_tag(internal_key))?;
        Ok(Self {
            user_key: extract_user_key(internal_key),
            sequence,
            value_type,
        })
    }
}

/// Orders encoded internal keys: user key ascending, then tag descending
/// (newer sequence first; for equal sequences, `Value` before `Deletion`).
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalKeyComparator<C = BytewiseComparator> {
    user_comparator: C,
}

impl<C: Comparator<[u8]>> InternalKeyComparator<C> {
    pub fn new(user_comparator: C) -> Self {
        Self { user_comparator }
    }

    pub fn user_comparator(&self) -> &C {
        &self.user_comparator
    }

    pub fn compare_user_keys(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.user_comparator.compare(a, b)
    }
}

impl<C: Comparator<[u8]>> Comparator<[u8]> for InternalKeyComparator<C> {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.user_comparator
            .compare(extract_user_key(a), extract_user_key(b))
            .then_with(|| extract_tag(b).cmp(&extract_tag(a)))
    }

    fn name(&self) -> &'static str {
        self.user_comparator.name()
    }
}
