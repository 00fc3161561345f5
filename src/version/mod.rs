//! Version Module
//!
//! Engine metadata history. A `Version` is an immutable view of the file
//! layout; a `VersionEdit` is a delta between two versions; the `VersionSet`
//! folds edits, persists them to the MANIFEST and keeps the chain of live
//! versions.
//!
//! ```text
//!   edit ──► VersionBuilder(base = current) ──► new Version
//!     │                                            │
//!     └──► MANIFEST record                         └──► VersionList (current)
//! ```

mod builder;
mod edit;
mod set;

pub use builder::VersionBuilder;
pub use edit::{FileMetaData, VersionEdit, DEFAULT_ALLOWED_SEEKS, NUM_LEVELS};
pub use set::VersionSet;

use std::sync::Arc;

use crate::chain::{Chain, Handle};

/// Immutable snapshot of engine file metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    files: Vec<Vec<Arc<FileMetaData>>>,
    compact_pointers: Vec<Option<Vec<u8>>>,
}

impl Version {
    pub fn new() -> Self {
        Self {
            files: vec![Vec::new(); NUM_LEVELS],
            compact_pointers: vec![None; NUM_LEVELS],
        }
    }

    /// Files of `level`, ordered by smallest key
    pub fn files(&self, level: usize) -> &[Arc<FileMetaData>] {
        &self.files[level]
    }

    pub fn num_files(&self, level: usize) -> usize {
        self.files[level].len()
    }

    pub fn total_files(&self) -> usize {
        self.files.iter().map(Vec::len).sum()
    }

    /// Key where the next compaction of `level` starts
    pub fn compact_pointer(&self, level: usize) -> Option<&[u8]> {
        self.compact_pointers[level].as_deref()
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new()
    }
}

struct VersionNode {
    version: Arc<Version>,
    refs: usize,
}

/// Reference-counted chain of live versions, oldest first.
///
/// The newest entry is current and holds one reference for being current.
/// A version is unlinked as soon as its count drops to zero.
pub struct VersionList {
    chain: Chain<VersionNode>,
    current: Handle,
}

impl VersionList {
    /// A list whose current version is empty
    pub fn new() -> Self {
        let mut chain = Chain::new();
        let current = chain.push_back(VersionNode {
            version: Arc::new(Version::new()),
            refs: 1,
        });
        Self { chain, current }
    }

    /// Make `version` current: link it at the newest end, take a reference
    /// to it and drop the reference held on the previous current version.
    pub fn append(&mut self, version: Version) -> Handle {
        let handle = self.chain.push_back(VersionNode {
            version: Arc::new(version),
            refs: 1,
        });
        let previous = std::mem::replace(&mut self.current, handle);
        self.unref(previous);
        handle
    }

    pub fn current(&self) -> Arc<Version> {
        match self.chain.get(self.current) {
            Some(node) => Arc::clone(&node.version),
            None => unreachable!("current version is always linked"),
        }
    }

    pub fn current_handle(&self) -> Handle {
        self.current
    }

    pub fn get(&self, handle: Handle) -> Option<Arc<Version>> {
        self.chain.get(handle).map(|node| Arc::clone(&node.version))
    }

    /// Take a reference. Returns false for a version already unlinked.
    pub fn ref_version(&mut self, handle: Handle) -> bool {
        match self.chain.get_mut(handle) {
            Some(node) => {
                node.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drop a reference, unlinking the version when none remain.
    pub fn unref(&mut self, handle: Handle) {
        let remaining = match self.chain.get_mut(handle) {
            Some(node) => {
                debug_assert!(node.refs > 0);
                node.refs = node.refs.saturating_sub(1);
                node.refs
            }
            None => return,
        };
        if remaining == 0 {
            self.chain.remove(handle);
        }
    }

    pub fn refs(&self, handle: Handle) -> Option<usize> {
        self.chain.get(handle).map(|node| node.refs)
    }

    /// Number of versions still linked
    pub fn live(&self) -> usize {
        self.chain.len()
    }
}

impl Default for VersionList {
    fn default() -> Self {
        Self::new()
    }
}
