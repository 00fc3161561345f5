//! Checked fixed-width little-endian reads.
//!
//! `bytes::Buf` panics on short input, so every read checks `remaining()`
//! first and reports a `Corruption` naming the field instead.

use bytes::Buf;

use crate::error::{Result, StrataError};

fn ensure(buf: &&[u8], need: usize, what: &str) -> Result<()> {
    if buf.remaining() < need {
        return Err(StrataError::corruption(format!(
            "truncated {}: need {} bytes, have {}",
            what,
            need,
            buf.remaining()
        )));
    }
    Ok(())
}

pub(crate) fn read_u8(buf: &mut &[u8], what: &str) -> Result<u8> {
    ensure(buf, 1, what)?;
    Ok(buf.get_u8())
}

pub(crate) fn read_u32(buf: &mut &[u8], what: &str) -> Result<u32> {
    ensure(buf, 4, what)?;
    Ok(buf.get_u32_le())
}

pub(crate) fn read_bytes<'a>(buf: &mut &'a [u8], len: usize, what: &str) -> Result<&'a [u8]> {
    ensure(buf, len, what)?;
    let whole: &'a [u8] = *buf;
    let (head, tail) = whole.split_at(len);
    *buf = tail;
    Ok(head)
}

/// Reads a `u32` length prefix followed by that many bytes.
pub(crate) fn read_length_prefixed<'a>(buf: &mut &'a [u8], what: &str) -> Result<&'a [u8]> {
    let len = read_u32(buf, what)? as usize;
    read_bytes(buf, len, what)
}
