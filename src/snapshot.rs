//! Snapshots
//!
//! A snapshot pins a sequence number; reads bound by it never observe later
//! writes. Live snapshots are kept in creation order so the oldest and the
//! newest are found in O(1).

use crate::chain::{Chain, Handle};
use crate::format::SequenceNumber;

/// An outstanding snapshot. Release it with `Engine::release_snapshot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    handle: Handle,
    sequence: SequenceNumber,
}

impl Snapshot {
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }
}

/// Live snapshots, oldest first
#[derive(Default)]
pub struct SnapshotList {
    chain: Chain<SequenceNumber>,
}

impl SnapshotList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a snapshot at `sequence`. Sequences must not decrease.
    pub fn create(&mut self, sequence: SequenceNumber) -> Snapshot {
        debug_assert!(self.newest().map_or(true, |s| s.sequence <= sequence));
        Snapshot {
            handle: self.chain.push_back(sequence),
            sequence,
        }
    }

    /// Drop a snapshot. Returns false if it was already released.
    pub fn release(&mut self, snapshot: &Snapshot) -> bool {
        self.chain.remove(snapshot.handle).is_some()
    }

    pub fn oldest(&self) -> Option<Snapshot> {
        self.chain.first().and_then(|h| self.resolve(h))
    }

    pub fn newest(&self) -> Option<Snapshot> {
        self.chain.last().and_then(|h| self.resolve(h))
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    fn resolve(&self, handle: Handle) -> Option<Snapshot> {
        self.chain.get(handle).map(|&sequence| Snapshot { handle, sequence })
    }
}
