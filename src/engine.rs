//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Create or recover a database directory
//! - Serialize writes: assign sequences, append to the WAL, apply to the memtable
//! - Rotate the active memtable to immutable when it fills up
//! - Answer point reads at the latest sequence or a snapshot

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, info_span, warn, Span};

use crate::batch::WriteBatch;
use crate::comparator::{BytewiseComparator, Comparator};
use crate::config::{Config, ReadOptions, WalSyncStrategy, WriteOptions};
use crate::error::{Result, StrataError};
use crate::filename::{
    current_file_name, log_file_name, manifest_file_name, parse_file_name, set_current_file, FileType,
};
use crate::format::{InternalKeyComparator, LookupKey, SequenceNumber, MAX_SEQUENCE_NUMBER};
use crate::memtable::{MemTable, MemTableEntry};
use crate::snapshot::{Snapshot, SnapshotList};
use crate::version::{Version, VersionEdit, VersionSet};
use crate::wal::{WalRecovery, WalWriter};

/// Number of the MANIFEST written for a brand new database
const INITIAL_MANIFEST_NUMBER: u64 = 1;

/// State owned by the single writer
struct WriterState {
    log: WalWriter,
    log_file_number: u64,
    /// First WAL failure. Once set every later write fails with it, since
    /// the log may end in a torn record.
    bg_error: Option<String>,
}

impl WriterState {
    fn check(&self) -> Result<()> {
        match &self.bg_error {
            Some(msg) => Err(StrataError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("writes disabled after log failure: {}", msg),
            ))),
            None => Ok(()),
        }
    }

    /// Remember an I/O failure of the log and hand the error back.
    fn record_error(&mut self, e: StrataError) -> StrataError {
        if matches!(e, StrataError::Io(_)) && self.bg_error.is_none() {
            warn!(log = self.log_file_number, error = %e, "log write failed; rejecting further writes");
            self.bg_error = Some(e.to_string());
        }
        e
    }
}

/// Active memtable and the immutable one waiting for persistence
struct MemTables {
    mem: Arc<MemTable>,
    imm: Option<Arc<MemTable>>,
}

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/delete/write): Serialized by `writer`
///   - Only ONE batch at a time
///   - Must acquire: writer → versions (sequence) → WAL → memtable → versions (publish)
///
/// - **Reads** (get): Never take `writer`
///   - Read the last sequence and clone the memtable pointers in two short
///     critical sections, then search without holding any engine lock
///   - MemTable uses an internal RwLock (many concurrent readers)
pub struct Engine {
    config: Config,

    /// Logging handle for this instance; entered by every public operation
    span: Span,

    /// Serializes the write path and owns the current WAL
    writer: Mutex<WriterState>,

    mem: RwLock<MemTables>,

    /// MANIFEST, file numbers and last sequence
    versions: Mutex<VersionSet>,

    snapshots: Mutex<SnapshotList>,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Check the directory against `create_if_missing` / `error_if_exists`
    /// 2. Write a fresh MANIFEST if the database is new
    /// 3. Recover the version set from CURRENT
    /// 4. Replay WAL files into a new memtable
    /// 5. Start a new WAL and persist the file counter and last sequence
    pub fn open(config: Config) -> Result<Self> {
        let span = info_span!("db", name = %config.data_dir.display());
        span.in_scope(|| Self::open_in_span(config, span.clone()))
    }

    /// Open with a path, creating the database if needed
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(
            Config::builder()
                .data_dir(path)
                .create_if_missing(true)
                .build(),
        )
    }

    fn open_in_span(config: Config, span: Span) -> Result<Self> {
        let dir = config.data_dir.as_path();

        // Step 1: Decide between creating and recovering
        if current_file_name(dir).exists() {
            if config.error_if_exists {
                return Err(StrataError::InvalidArgument(format!(
                    "{}: exists (error_if_exists is true)",
                    dir.display()
                )));
            }
        } else {
            if !config.create_if_missing {
                return Err(StrataError::InvalidArgument(format!(
                    "{}: does not exist (create_if_missing is false)",
                    dir.display()
                )));
            }
            fs::create_dir_all(dir)?;
            Self::new_db(dir)?;
        }

        // Step 2: Recover metadata
        let mut versions = VersionSet::new(dir, config.max_manifest_file_size);
        versions.recover()?;

        // Step 3: Replay logs not yet covered by persistent storage
        let mem = MemTable::new();
        let mut max_sequence = versions.last_sequence();
        for number in Self::logs_to_replay(dir, &versions)? {
            versions.mark_file_number_used(number);

            let path = log_file_name(dir, number);
            if fs::metadata(&path)?.len() == 0 {
                fs::remove_file(&path)?;
                debug!(log = number, "removed empty log");
                continue;
            }
            let result = WalRecovery::replay(&path, &mem)?;
            info!(
                log = number,
                batches = result.batches_recovered,
                entries = result.entries_recovered,
                "replayed log"
            );
            if let Some(sequence) = result.max_sequence {
                max_sequence = max_sequence.max(sequence);
            }
        }
        versions.set_last_sequence(max_sequence);

        // Step 4: Fresh WAL for new writes. The log number is left alone so
        // the replayed logs are replayed again on the next open.
        let log_file_number = versions.new_file_number();
        let log = WalWriter::create(&log_file_name(dir, log_file_number), config.wal_sync_strategy)?;
        versions.log_and_apply(&mut VersionEdit::new())?;

        info!(
            last_sequence = versions.last_sequence(),
            log = log_file_number,
            manifest = versions.manifest_file_number(),
            recovered_entries = mem.len(),
            "database opened"
        );

        Ok(Self {
            config,
            span,
            writer: Mutex::new(WriterState {
                log,
                log_file_number,
                bg_error: None,
            }),
            mem: RwLock::new(MemTables {
                mem: Arc::new(mem),
                imm: None,
            }),
            versions: Mutex::new(versions),
            snapshots: Mutex::new(SnapshotList::new()),
        })
    }

    /// Write the MANIFEST of an empty database and point CURRENT at it.
    fn new_db(dir: &Path) -> Result<()> {
        let mut edit = VersionEdit::new();
        edit.set_comparator_name(InternalKeyComparator::new(BytewiseComparator).name());
        edit.set_log_number(0);
        edit.set_next_file_number(INITIAL_MANIFEST_NUMBER + 1);
        edit.set_last_sequence(0);

        let path = manifest_file_name(dir, INITIAL_MANIFEST_NUMBER);
        let written = (|| -> Result<()> {
            let mut writer = WalWriter::create(&path, WalSyncStrategy::EveryWrite)?;
            writer.add_record(&edit.encode()?)?;
            writer.close()?;
            set_current_file(dir, INITIAL_MANIFEST_NUMBER)
        })();

        match written {
            Ok(()) => {
                info!(dir = %dir.display(), "created new database");
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&path);
                Err(e)
            }
        }
    }

    /// WAL files at or above the recovered log number, plus the previous
    /// log, in ascending order.
    fn logs_to_replay(dir: &Path, versions: &VersionSet) -> Result<Vec<u64>> {
        let min_log = versions.log_number();
        let prev_log = versions.prev_log_number();

        let mut logs = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some((number, FileType::Log)) = parse_file_name(name) {
                if number >= min_log || number == prev_log {
                    logs.push(number);
                }
            }
        }
        logs.sort_unstable();
        Ok(logs)
    }

    // =========================================================================
    // Write path
    // =========================================================================

    /// Put a key-value pair
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.write(&WriteOptions::default(), batch)
    }

    /// Delete a key
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.write(&WriteOptions::default(), batch)
    }

    /// Apply a batch atomically
    ///
    /// Steps:
    /// 1. Acquire the writer lock
    /// 2. Make room (may rotate the memtable)
    /// 3. Assign sequences last+1 ..= last+count
    /// 4. Append to the WAL (flushed to disk if `options.sync`)
    /// 5. Apply to the active memtable
    /// 6. Publish the new last sequence
    ///
    /// If the WAL append fails nothing is applied and the sequence does not move.
    pub fn write(&self, options: &WriteOptions, mut batch: WriteBatch) -> Result<()> {
        let _enter = self.span.enter();
        let mut writer = self.writer.lock();
        writer.check()?;

        self.make_room_for_write(&mut writer, false)?;
        if batch.is_empty() {
            return Ok(());
        }

        let last_sequence = self.versions.lock().last_sequence();
        let count = batch.count() as u64;
        if last_sequence + count > MAX_SEQUENCE_NUMBER {
            return Err(StrataError::InvalidArgument(format!(
                "sequence space exhausted at {}",
                last_sequence
            )));
        }
        batch.set_sequence(last_sequence + 1);

        let record = batch.encode()?;
        let mut appended = writer.log.add_record(&record).map(|_| ());
        if appended.is_ok() && options.sync {
            appended = writer.log.flush();
        }
        if let Err(e) = appended {
            return Err(writer.record_error(e));
        }

        let mem = Arc::clone(&self.mem.read().mem);
        batch.insert_into(&mem);

        self.versions.lock().set_last_sequence(batch.last_sequence());
        Ok(())
    }

    /// Seal the active memtable even if it is not full.
    ///
    /// Fails with `ResourceExhausted` while an immutable memtable is pending.
    pub fn rotate_memtable(&self) -> Result<()> {
        let _enter = self.span.enter();
        let mut writer = self.writer.lock();
        writer.check()?;
        self.make_room_for_write(&mut writer, true)
    }

    /// Called with the writer lock held.
    fn make_room_for_write(&self, writer: &mut WriterState, force: bool) -> Result<()> {
        if self.config.only_mem {
            return Ok(());
        }

        {
            let mems = self.mem.read();
            if !force && mems.mem.approximate_memory_usage() < self.config.write_buffer_size {
                return Ok(());
            }
            if mems.imm.is_some() {
                warn!(
                    usage = mems.mem.approximate_memory_usage(),
                    "memtable full while the previous one is still pending"
                );
                return Err(StrataError::ResourceExhausted(
                    "immutable memtable is still pending".to_string(),
                ));
            }
        }

        let number = self.versions.lock().new_file_number();
        let log = WalWriter::create(
            &log_file_name(&self.config.data_dir, number),
            self.config.wal_sync_strategy,
        )?;
        let mut old = std::mem::replace(&mut writer.log, log);
        let old_number = std::mem::replace(&mut writer.log_file_number, number);
        // The sealed memtable is only as durable as its log.
        if let Err(e) = old.close() {
            warn!(log = old_number, "failed to close rotated log");
            return Err(writer.record_error(e));
        }

        let usage = {
            let mut mems = self.mem.write();
            let full = std::mem::replace(&mut mems.mem, Arc::new(MemTable::new()));
            let usage = full.approximate_memory_usage();
            mems.imm = Some(full);
            usage
        };
        info!(usage, old_log = old_number, new_log = number, "rotated memtable");

        self.maybe_schedule_compaction();
        Ok(())
    }

    /// Hook for moving the immutable memtable into persistent storage.
    fn maybe_schedule_compaction(&self) {
        debug!("no persistent storage configured; immutable memtable retained");
    }

    // =========================================================================
    // Read path
    // =========================================================================

    /// Get the latest value of a key
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.get_with_options(&ReadOptions::default(), key)
    }

    /// Get a value as of `options.snapshot` (or the latest state)
    ///
    /// Search order:
    /// 1. Active memtable
    /// 2. Immutable memtable
    ///
    /// A tombstone in a newer table hides any value in an older one.
    pub fn get_with_options(&self, options: &ReadOptions, key: &[u8]) -> Result<Vec<u8>> {
        let _enter = self.span.enter();

        let sequence = match options.snapshot {
            Some(sequence) => sequence.min(MAX_SEQUENCE_NUMBER),
            None => self.versions.lock().last_sequence(),
        };
        let (mem, imm) = {
            let mems = self.mem.read();
            (Arc::clone(&mems.mem), mems.imm.clone())
        };

        let lookup = LookupKey::new(key, sequence);
        for table in std::iter::once(&mem).chain(imm.as_ref()) {
            match table.get(&lookup)? {
                Some(MemTableEntry::Value(value)) => return Ok(value),
                Some(MemTableEntry::Tombstone) => return Err(StrataError::NotFound),
                None => {}
            }
        }

        Err(StrataError::NotFound)
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Pin the current last sequence for reads
    ///
    /// Lock order is versions, then snapshots, so snapshots are registered
    /// in sequence order.
    pub fn snapshot(&self) -> Snapshot {
        let versions = self.versions.lock();
        self.snapshots.lock().create(versions.last_sequence())
    }

    /// Release a snapshot taken with `snapshot`
    pub fn release_snapshot(&self, snapshot: &Snapshot) {
        if !self.snapshots.lock().release(snapshot) {
            debug!(sequence = snapshot.sequence(), "snapshot already released");
        }
    }

    /// Sequence of the oldest outstanding snapshot
    pub fn oldest_snapshot(&self) -> Option<SequenceNumber> {
        self.snapshots.lock().oldest().map(|s| s.sequence())
    }

    pub fn num_snapshots(&self) -> usize {
        self.snapshots.lock().len()
    }

    /// Close the engine gracefully
    ///
    /// Syncs and closes the WAL, then closes the MANIFEST.
    pub fn close(self) -> Result<()> {
        let _enter = self.span.enter();

        self.writer.lock().log.close()?;
        self.versions.lock().close()?;

        info!("database closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Sequence number of the most recent write
    pub fn last_sequence(&self) -> SequenceNumber {
        self.versions.lock().last_sequence()
    }

    /// Number of the WAL currently written
    pub fn log_file_number(&self) -> u64 {
        self.writer.lock().log_file_number
    }

    pub fn manifest_file_number(&self) -> u64 {
        self.versions.lock().manifest_file_number()
    }

    pub fn next_file_number(&self) -> u64 {
        self.versions.lock().next_file_number()
    }

    pub fn current_version(&self) -> Arc<Version> {
        self.versions.lock().current()
    }

    pub fn has_immutable_memtable(&self) -> bool {
        self.mem.read().imm.is_some()
    }

    /// Approximate bytes held by the active memtable
    pub fn memtable_usage(&self) -> usize {
        self.mem.read().mem.approximate_memory_usage()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
