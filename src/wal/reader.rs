//! WAL Reader
//!
//! Handles reading records back from a log file, in order.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use crate::error::{Result, StrataError};

use super::{record_checksum, CRC_SIZE, LENGTH_SIZE};

/// Sequential reader over a log file
pub struct WalReader {
    path: PathBuf,
    reader: BufReader<File>,
    /// Bytes not yet consumed
    remaining: u64,
    ended: bool,
}

impl WalReader {
    /// Open a log file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let remaining = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            remaining,
            ended: false,
        })
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` at the end of the stream: a zero length prefix or
    /// a clean end of file at a record boundary. A record cut short or with
    /// a bad checksum is `Corruption`, never skipped.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        if self.ended {
            return Ok(None);
        }

        let result = self.read_next();
        if !matches!(result, Ok(Some(_))) {
            self.ended = true;
        }
        result
    }

    /// Whether the end of the stream has been reached
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    fn read_next(&mut self) -> Result<Option<Vec<u8>>> {
        let mut length = [0u8; LENGTH_SIZE];
        let filled = self.read_up_to(&mut length)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < LENGTH_SIZE {
            return Err(self.corruption(format!("truncated length prefix ({} bytes)", filled)));
        }

        let payload_len = u32::from_le_bytes(length) as u64;
        if payload_len == 0 {
            return Ok(None);
        }
        if payload_len + CRC_SIZE as u64 > self.remaining {
            return Err(self.corruption(format!(
                "record of {} bytes exceeds the {} bytes left in the file",
                payload_len, self.remaining
            )));
        }

        let mut payload = vec![0u8; payload_len as usize];
        self.read_exact(&mut payload)?;
        let mut stored = [0u8; CRC_SIZE];
        self.read_exact(&mut stored)?;

        if u32::from_le_bytes(stored) != record_checksum(&length, &payload) {
            return Err(self.corruption("checksum mismatch".to_string()));
        }

        Ok(Some(payload))
    }

    /// Fill as much of `buf` as the file allows; returns bytes read.
    fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.remaining = self.remaining.saturating_sub(filled as u64);
        Ok(filled)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let filled = self.read_up_to(buf)?;
        if filled < buf.len() {
            return Err(self.corruption("truncated record".to_string()));
        }
        Ok(())
    }

    fn corruption(&self, msg: String) -> StrataError {
        StrataError::corruption(format!("{}: {}", self.path.display(), msg))
    }
}

impl Iterator for WalReader {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}
