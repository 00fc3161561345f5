//! WAL Writer
//!
//! Handles appending records to a log file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{Result, StrataError};

use super::{record_checksum, RECORD_OVERHEAD};

/// Appends framed records to a log file
///
/// Two layers of buffering:
///   BufWriter.flush()  → Rust buffer → OS page cache   (every record)
///   file.sync_data()   → OS page cache → physical disk (per strategy)
pub struct WalWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    sync_strategy: WalSyncStrategy,
    /// Bytes appended by this writer
    bytes_written: u64,
    /// Records appended since the last sync
    unsynced: usize,
}

impl WalWriter {
    /// Open or create a log file for appending
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
            sync_strategy,
            bytes_written: 0,
            unsynced: 0,
        })
    }

    /// Create a log file, truncating any existing file at `path`
    pub fn create(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
            sync_strategy,
            bytes_written: 0,
            unsynced: 0,
        })
    }

    /// Append one record: `len | payload | crc32(len ++ payload)`.
    ///
    /// Returns the number of bytes appended.
    pub fn add_record(&mut self, payload: &[u8]) -> Result<u64> {
        if payload.is_empty() {
            return Err(StrataError::InvalidArgument(
                "empty log record is reserved as the end-of-stream marker".to_string(),
            ));
        }
        let length = u32::try_from(payload.len()).map_err(|_| {
            StrataError::InvalidArgument(format!("log record of {} bytes is too large", payload.len()))
        })?;
        let length = length.to_le_bytes();
        let crc = record_checksum(&length, payload);

        let writer = self.writer.as_mut().ok_or_else(|| Self::closed_error(&self.path))?;
        let framed = writer
            .write_all(&length)
            .and_then(|_| writer.write_all(payload))
            .and_then(|_| writer.write_all(&crc.to_le_bytes()))
            .and_then(|_| writer.flush());
        if let Err(e) = framed {
            self.abandon();
            return Err(e.into());
        }

        let appended = (RECORD_OVERHEAD + payload.len()) as u64;
        self.bytes_written += appended;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count.max(1),
        };
        if due {
            self.flush()?;
        }

        Ok(appended)
    }

    /// Force buffered records to stable storage without closing.
    ///
    /// Any write or sync failure, here or in `add_record`, closes the writer:
    /// the file may end in a torn record and nothing more may follow it.
    pub fn flush(&mut self) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| Self::closed_error(&self.path))?;
        if let Err(e) = writer.flush().and_then(|_| writer.get_ref().sync_data()) {
            self.abandon();
            return Err(e.into());
        }
        self.unsynced = 0;
        Ok(())
    }

    /// Flush and release the file. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.writer.is_some() {
            self.flush()?;
            self.writer = None;
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Bytes appended by this writer since it was opened
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the file without flushing what a failed write left buffered.
    fn abandon(&mut self) {
        if let Some(writer) = self.writer.take() {
            let _ = writer.into_parts();
        }
    }

    fn closed_error(path: &Path) -> StrataError {
        StrataError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("log writer for {} is closed", path.display()),
        ))
    }
}
