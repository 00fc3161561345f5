//! Configuration for StrataKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::format::SequenceNumber;

/// Main configuration for a StrataKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Database directory. Internal structure:
    ///   {data_dir}/
    ///     ├── CURRENT          (name of the active manifest)
    ///     ├── {N}.manifest     (version edits)
    ///     └── {N}.log          (write-ahead logs)
    pub data_dir: PathBuf,

    /// Create the database if `data_dir` holds none
    pub create_if_missing: bool,

    /// Fail at open if the database already exists
    pub error_if_exists: bool,

    /// Replace the MANIFEST on recovery once it reaches this many bytes
    pub max_manifest_file_size: u64,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Memtable usage (in bytes) at which it is rotated to immutable
    pub write_buffer_size: usize,

    /// Keep everything in a single memtable and never rotate
    pub only_mem: bool,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced records (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./stratakv_data"),
            create_if_missing: false,
            error_if_exists: false,
            max_manifest_file_size: 2 * 1024 * 1024, // 2 MB
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            write_buffer_size: 4 * 1024 * 1024, // 4 MB
            only_mem: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the database directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    pub fn create_if_missing(mut self, yes: bool) -> Self {
        self.config.create_if_missing = yes;
        self
    }

    pub fn error_if_exists(mut self, yes: bool) -> Self {
        self.config.error_if_exists = yes;
        self
    }

    /// Set the MANIFEST size that triggers a fresh MANIFEST on recovery
    pub fn max_manifest_file_size(mut self, size: u64) -> Self {
        self.config.max_manifest_file_size = size;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the memtable rotation threshold (in bytes)
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.config.write_buffer_size = size;
        self
    }

    pub fn only_mem(mut self, yes: bool) -> Self {
        self.config.only_mem = yes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Options for a single write
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Flush the WAL to stable storage before the write returns
    pub sync: bool,
}

/// Options for a single read
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Read as of this sequence number; `None` reads the latest state
    pub snapshot: Option<SequenceNumber>,
}

impl ReadOptions {
    /// Read as of `sequence`
    pub fn at(sequence: SequenceNumber) -> Self {
        Self {
            snapshot: Some(sequence),
        }
    }
}
