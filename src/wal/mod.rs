//! Write-Ahead Log (WAL) Module
//!
//! Provides durability through append-only, checksummed record logs. The
//! same framing carries write batches (`<N>.log`) and version edits
//! (`<N>.manifest`).
//!
//! ## Responsibilities
//! - Frame opaque payloads with a length prefix and CRC32
//! - Sequential reading with corruption detection
//! - Replay of WAL files into a memtable on startup
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1                                │
//! │ ┌─────────┬──────────────┬───────────┐  │
//! │ │ Len (4) │ Payload (Len)│ CRC (4)   │  │
//! │ └─────────┴──────────────┴───────────┘  │
//! ├─────────────────────────────────────────┤
//! │ Record 2 ...                            │
//! └─────────────────────────────────────────┘
//! ```
//! CRC covers the length bytes and the payload. A zero length marks the end
//! of the stream.

mod reader;
mod recovery;
mod writer;

pub use reader::WalReader;
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;

/// Length prefix size
pub const LENGTH_SIZE: usize = 4;

/// Trailing checksum size
pub const CRC_SIZE: usize = 4;

/// Framing overhead per record
pub const RECORD_OVERHEAD: usize = LENGTH_SIZE + CRC_SIZE;

/// CRC32 of the length prefix followed by the payload
pub(crate) fn record_checksum(length: &[u8; LENGTH_SIZE], payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(length);
    hasher.update(payload);
    hasher.finalize()
}
