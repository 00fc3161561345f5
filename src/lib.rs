//! # StrataKV
//!
//! An embedded, log-structured key-value storage engine with:
//! - Multi-version keys ordered by sequence number
//! - Write-Ahead Logging (WAL) with checksummed records
//! - A MANIFEST of version edits for metadata recovery
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                               │
//! │            (Single Writer / Multi Reader)                    │
//! └───────┬──────────────────────┬───────────────────────┬──────┘
//!         │ WriteBatch           │ apply                 │ edits
//!         ▼                      ▼                       ▼
//!   ┌─────────────┐      ┌───────────────┐       ┌──────────────┐
//!   │     WAL     │      │ MemTable      │       │  VersionSet  │
//!   │  {N}.log    │      │ mem + imm     │       │ {N}.manifest │
//!   └─────────────┘      └───────┬───────┘       │   CURRENT    │
//!                                │               └──────────────┘
//!                                ▼
//!                        ┌───────────────┐
//!                        │   SkipList    │
//!                        │ (internal key │
//!                        │   ordering)   │
//!                        └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod comparator;

pub mod skiplist;
pub mod format;
pub mod memtable;
pub mod batch;
pub mod wal;
pub mod filename;
pub mod chain;
pub mod snapshot;
pub mod version;
pub mod engine;
pub mod shell;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StrataError};
pub use config::{Config, ReadOptions, WalSyncStrategy, WriteOptions};
pub use batch::WriteBatch;
pub use engine::Engine;
pub use snapshot::Snapshot;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of StrataKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
