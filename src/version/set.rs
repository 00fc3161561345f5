//! VersionSet: current metadata plus the MANIFEST that persists it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chain::Handle;
use crate::comparator::Comparator;
use crate::config::WalSyncStrategy;
use crate::error::{Result, StrataError};
use crate::filename::{manifest_file_name, parse_file_name, read_current_file, set_current_file, FileType};
use crate::format::{InternalKeyComparator, SequenceNumber};
use crate::wal::{WalReader, WalWriter};

use super::builder::VersionBuilder;
use super::edit::{VersionEdit, NUM_LEVELS};
use super::{Version, VersionList};

pub struct VersionSet {
    dbname: PathBuf,
    max_manifest_file_size: u64,
    icmp: InternalKeyComparator,

    next_file_number: u64,
    manifest_file_number: u64,
    last_sequence: SequenceNumber,
    log_number: u64,
    /// Log still being compacted when the MANIFEST was written; 0 if none
    prev_log_number: u64,

    manifest: Option<WalWriter>,
    versions: VersionList,
}

impl VersionSet {
    pub fn new(dbname: impl Into<PathBuf>, max_manifest_file_size: u64) -> Self {
        Self {
            dbname: dbname.into(),
            max_manifest_file_size,
            icmp: InternalKeyComparator::default(),
            next_file_number: 2,
            manifest_file_number: 0,
            last_sequence: 0,
            log_number: 0,
            prev_log_number: 0,
            manifest: None,
            versions: VersionList::new(),
        }
    }

    /// Rebuild state from the MANIFEST named by CURRENT.
    ///
    /// Returns true when the next `log_and_apply` will start a new MANIFEST,
    /// false when the existing one is reused for appends.
    pub fn recover(&mut self) -> Result<bool> {
        let name = read_current_file(&self.dbname)?;
        let current_number = match parse_file_name(&name) {
            Some((number, FileType::Manifest)) => number,
            _ => return Err(StrataError::corruption(format!("bad manifest name {:?}", name))),
        };
        let path = manifest_file_name(&self.dbname, current_number);

        let mut reader = match WalReader::open(&path) {
            Ok(reader) => reader,
            Err(StrataError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StrataError::corruption(format!(
                    "CURRENT points to a missing manifest: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e),
        };

        let base = self.versions.current();
        let mut builder = VersionBuilder::new(&base);

        let mut log_number = None;
        let mut prev_log_number = None;
        let mut next_file = None;
        let mut last_sequence = None;
        let mut edits = 0usize;

        while let Some(record) = reader.read_record()? {
            let edit = VersionEdit::decode(&record)?;
            if let Some(name) = &edit.comparator {
                if name != self.icmp.name() {
                    return Err(StrataError::InvalidArgument(format!(
                        "{} does not match existing comparator {}",
                        self.icmp.name(),
                        name
                    )));
                }
            }

            builder.apply(&edit);

            log_number = edit.log_number.or(log_number);
            prev_log_number = edit.prev_log_number.or(prev_log_number);
            next_file = edit.next_file_number.or(next_file);
            last_sequence = edit.last_sequence.or(last_sequence);
            edits += 1;
        }

        let next_file =
            next_file.ok_or_else(|| StrataError::corruption("no meta-nextfile entry in descriptor"))?;
        let log_number =
            log_number.ok_or_else(|| StrataError::corruption("no meta-lognumber entry in descriptor"))?;
        let last_sequence = last_sequence
            .ok_or_else(|| StrataError::corruption("no last-sequence-number entry in descriptor"))?;
        let prev_log_number = prev_log_number.unwrap_or(0);

        let version = builder.build();
        self.versions.append(version);

        self.next_file_number = next_file;
        self.mark_file_number_used(prev_log_number);
        self.mark_file_number_used(log_number);
        self.last_sequence = last_sequence;
        self.log_number = log_number;
        self.prev_log_number = prev_log_number;

        let manifest_size = fs::metadata(&path)?.len();
        let new_manifest = if manifest_size < self.max_manifest_file_size {
            self.manifest_file_number = current_number;
            self.mark_file_number_used(current_number);
            self.manifest = Some(WalWriter::open(&path, WalSyncStrategy::EveryWrite)?);
            false
        } else {
            self.manifest_file_number = self.new_file_number();
            true
        };

        info!(
            manifest = %name,
            edits,
            next_file = self.next_file_number,
            log_number = self.log_number,
            last_sequence = self.last_sequence,
            reuse_manifest = !new_manifest,
            "recovered version set"
        );

        Ok(new_manifest)
    }

    /// Persist `edit` and make the version it produces current.
    ///
    /// Fills in the log numbers when unset and always stamps the current
    /// next-file number and last sequence. The new version is installed only
    /// once the record is flushed and CURRENT names this MANIFEST.
    pub fn log_and_apply(&mut self, edit: &mut VersionEdit) -> Result<()> {
        if let Some(level) = edit.out_of_range_level() {
            return Err(StrataError::InvalidArgument(format!(
                "version edit names level {} (max {})",
                level,
                NUM_LEVELS - 1
            )));
        }
        match edit.log_number {
            Some(number) => {
                if number < self.log_number || number >= self.next_file_number {
                    return Err(StrataError::InvalidArgument(format!(
                        "log number {} outside [{}, {})",
                        number, self.log_number, self.next_file_number
                    )));
                }
            }
            None => edit.set_log_number(self.log_number),
        }
        if !edit.has_prev_log_number() {
            edit.set_prev_log_number(self.prev_log_number);
        }
        edit.set_next_file_number(self.next_file_number);
        edit.set_last_sequence(self.last_sequence);

        let base = self.versions.current();
        let mut builder = VersionBuilder::new(&base);
        builder.apply(edit);
        let version = builder.build();

        let record = edit.encode()?;

        let (mut writer, new_manifest) = match self.manifest.take() {
            Some(writer) => (writer, None),
            None => {
                let path = manifest_file_name(&self.dbname, self.manifest_file_number);
                let mut writer = WalWriter::create(&path, WalSyncStrategy::EveryWrite)?;
                if let Err(e) = self.write_snapshot(&mut writer) {
                    drop(writer);
                    let _ = fs::remove_file(&path);
                    return Err(e);
                }
                (writer, Some(path))
            }
        };

        let written = (|| -> Result<()> {
            writer.add_record(&record)?;
            writer.flush()?;
            set_current_file(&self.dbname, self.manifest_file_number)
        })();

        if let Err(e) = written {
            warn!(manifest = self.manifest_file_number, error = %e, "manifest write failed");
            drop(writer);
            match new_manifest {
                Some(path) => {
                    let _ = fs::remove_file(&path);
                }
                // The reused MANIFEST may now end in a partial record; continue in a fresh one.
                None => self.manifest_file_number = self.new_file_number(),
            }
            return Err(e);
        }

        if new_manifest.is_some() {
            info!(manifest = self.manifest_file_number, "started new manifest");
        }
        self.manifest = Some(writer);
        self.versions.append(version);
        self.log_number = edit.log_number.unwrap_or(self.log_number);
        self.prev_log_number = edit.prev_log_number.unwrap_or(self.prev_log_number);

        debug!(
            log_number = self.log_number,
            next_file = self.next_file_number,
            last_sequence = self.last_sequence,
            "applied version edit"
        );
        Ok(())
    }

    /// Full-state edit written at the head of every new MANIFEST.
    fn write_snapshot(&self, writer: &mut WalWriter) -> Result<()> {
        let current = self.versions.current();
        let mut edit = VersionEdit::new();
        edit.set_comparator_name(self.icmp.name());

        for level in 0..NUM_LEVELS {
            if let Some(key) = current.compact_pointer(level) {
                edit.set_compact_pointer(level, key.to_vec());
            }
            for file in current.files(level) {
                edit.add_file(level, file.as_ref().clone());
            }
        }

        writer.add_record(&edit.encode()?)?;
        Ok(())
    }

    /// Allocate a fresh file number.
    pub fn new_file_number(&mut self) -> u64 {
        let number = self.next_file_number;
        self.next_file_number += 1;
        number
    }

    /// Ensure `number` is never handed out again.
    pub fn mark_file_number_used(&mut self, number: u64) {
        if self.next_file_number <= number {
            self.next_file_number = number + 1;
        }
    }

    pub fn next_file_number(&self) -> u64 {
        self.next_file_number
    }

    pub fn manifest_file_number(&self) -> u64 {
        self.manifest_file_number
    }

    pub fn last_sequence(&self) -> SequenceNumber {
        self.last_sequence
    }

    /// Advance the last sequence. It never moves backwards.
    pub fn set_last_sequence(&mut self, sequence: SequenceNumber) {
        debug_assert!(sequence >= self.last_sequence);
        self.last_sequence = self.last_sequence.max(sequence);
    }

    pub fn log_number(&self) -> u64 {
        self.log_number
    }

    pub fn prev_log_number(&self) -> u64 {
        self.prev_log_number
    }

    pub fn current(&self) -> Arc<Version> {
        self.versions.current()
    }

    /// Pin the current version until the returned handle is unref'd.
    pub fn ref_current(&mut self) -> (Handle, Arc<Version>) {
        let handle = self.versions.current_handle();
        self.versions.ref_version(handle);
        (handle, self.versions.current())
    }

    pub fn unref(&mut self, handle: Handle) {
        self.versions.unref(handle);
    }

    /// Number of versions still linked in the chain
    pub fn live_versions(&self) -> usize {
        self.versions.live()
    }

    pub fn dbname(&self) -> &Path {
        &self.dbname
    }

    /// Flush and release the MANIFEST writer.
    pub fn close(&mut self) -> Result<()> {
        match self.manifest.take() {
            Some(mut writer) => writer.close(),
            None => Ok(()),
        }
    }
}
