//! SkipList Module
//!
//! Generic ordered index with probabilistic balancing. The memtable stores
//! its records here; nothing in this module knows about record formats.
//!
//! ## Responsibilities
//! - Sorted insert / lookup / delete through an injected `Comparator`
//! - O(1) size tracking
//! - Cursors that survive mutation of the list between movements
//!
//! ## Layout
//! ```text
//! Level 3:  HEAD ──────────────────────────────► 50 ──────────► NIL
//! Level 2:  HEAD ──────────► 20 ────────────────► 50 ──────────► NIL
//! Level 1:  HEAD ──► 10 ──► 20 ────► 35 ────────► 50 ──► 60 ──► NIL
//! Level 0:  HEAD ──► 10 ──► 20 ──► 25 ──► 35 ──► 50 ──► 60 ──► 70 ► NIL
//! ```
//!
//! Nodes live in an arena (`Vec` of slots) and link to each other by slot
//! index. Freed slots are recycled; every slot carries a generation that is
//! bumped on free so stale cursors can detect that their node is gone.

mod cursor;

pub use cursor::{Cursor, Iter};

use std::cmp::Ordering;

use rand::Rng;

use crate::comparator::Comparator;

/// Default cap on node height.
pub const MAX_LEVEL: usize = 32;

/// Probability that a node reaches the next level.
pub const BRANCHING_PROBABILITY: f64 = 0.25;

/// A forward link. `None` is NIL; as a position, `None` means the head.
type Link = Option<usize>;

struct Node<K, V> {
    key: K,
    value: V,
    forward: Vec<Link>,
}

struct Slot<K, V> {
    generation: u32,
    node: Option<Node<K, V>>,
}

/// A probabilistic sorted map.
pub struct SkipList<K, V, C> {
    comparator: C,
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    /// Forward links of the head sentinel, one per possible level
    head: Vec<Link>,
    /// Number of levels currently in use (always >= 1)
    level: usize,
    max_level: usize,
    probability: f64,
    len: usize,
}

impl<K, V, C: Comparator<K>> SkipList<K, V, C> {
    /// Create an empty list with the default level cap and p = 0.25.
    pub fn new(comparator: C) -> Self {
        Self::with_params(comparator, MAX_LEVEL, BRANCHING_PROBABILITY)
    }

    pub fn with_params(comparator: C, max_level: usize, probability: f64) -> Self {
        let max_level = max_level.max(1);
        Self {
            comparator,
            slots: Vec::new(),
            free: Vec::new(),
            head: vec![None; max_level],
            level: 1,
            max_level,
            probability,
            len: 0,
        }
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Levels currently in use.
    pub fn height(&self) -> usize {
        self.level
    }

    /// Insert `key`, replacing the value in place if it is already present.
    ///
    /// Returns `true` if a new node was created.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let mut update: Vec<Link> = vec![None; self.max_level];
        let found = self.find_greater_or_equal(&key, Some(&mut update[..]));

        if let Some(idx) = found {
            if self.comparator.compare(&self.node(idx).key, &key) == Ordering::Equal {
                self.node_mut(idx).value = value;
                return false;
            }
        }

        let height = self.random_level();
        if height > self.level {
            for slot in update.iter_mut().take(height).skip(self.level) {
                *slot = None;
            }
            self.level = height;
        }

        let mut forward = vec![None; height];
        for (i, link) in forward.iter_mut().enumerate() {
            *link = self.forward(update[i], i);
        }
        let idx = self.alloc(Node {
            key,
            value,
            forward,
        });
        for (i, at) in update.iter().enumerate().take(height) {
            self.set_forward(*at, i, Some(idx));
        }

        self.len += 1;
        true
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.search(key).map(|idx| &self.node(idx).value)
    }

    /// Look up the stored key and value equal to `key`.
    pub fn search_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.search(key).map(|idx| {
            let node = self.node(idx);
            (&node.key, &node.value)
        })
    }

    pub fn contains(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut update: Vec<Link> = vec![None; self.max_level];
        let idx = self.find_greater_or_equal(key, Some(&mut update[..]))?;
        if self.comparator.compare(&self.node(idx).key, key) != Ordering::Equal {
            return None;
        }

        for (i, at) in update.iter().enumerate().take(self.level) {
            if self.forward(*at, i) == Some(idx) {
                let next = self.node(idx).forward[i];
                self.set_forward(*at, i, next);
            }
        }

        while self.level > 1 && self.head[self.level - 1].is_none() {
            self.level -= 1;
        }

        self.len -= 1;
        self.release(idx).map(|node| node.value)
    }

    /// A cursor that is not yet positioned.
    pub fn cursor(&self) -> Cursor {
        Cursor::new()
    }

    /// Borrowing iterator over all entries in order.
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        Iter::new(self)
    }

    // =========================================================================
    // Traversal helpers (shared with the cursor)
    // =========================================================================

    fn search(&self, key: &K) -> Option<usize> {
        let idx = self.find_greater_or_equal(key, None)?;
        (self.comparator.compare(&self.node(idx).key, key) == Ordering::Equal).then_some(idx)
    }

    /// First node whose key is >= `key`. Fills `prev` with the last position
    /// before it on every level in use.
    fn find_greater_or_equal(&self, key: &K, mut prev: Option<&mut [Link]>) -> Option<usize> {
        let mut x: Link = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                if self.comparator.compare(&self.node(next).key, key) == Ordering::Less {
                    x = Some(next);
                } else {
                    break;
                }
            }
            if let Some(prev) = prev.as_deref_mut() {
                prev[i] = x;
            }
        }
        self.forward(x, 0)
    }

    /// Last node whose key is < `key`, or `None` if there is none.
    fn find_less_than(&self, key: &K) -> Option<usize> {
        let mut x: Link = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                if self.comparator.compare(&self.node(next).key, key) == Ordering::Less {
                    x = Some(next);
                } else {
                    break;
                }
            }
        }
        x
    }

    fn find_last(&self) -> Option<usize> {
        let mut x: Link = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                x = Some(next);
            }
        }
        x
    }

    fn first(&self) -> Option<usize> {
        self.head[0]
    }

    fn forward(&self, at: Link, level: usize) -> Link {
        match at {
            None => self.head[level],
            Some(idx) => self.node(idx).forward[level],
        }
    }

    fn set_forward(&mut self, at: Link, level: usize, to: Link) {
        match at {
            None => self.head[level] = to,
            Some(idx) => self.node_mut(idx).forward[level] = to,
        }
    }

    fn node(&self, idx: usize) -> &Node<K, V> {
        match self.slots[idx].node.as_ref() {
            Some(node) => node,
            None => unreachable!("skip list link to freed slot {}", idx),
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
        match self.slots[idx].node.as_mut() {
            Some(node) => node,
            None => unreachable!("skip list link to freed slot {}", idx),
        }
    }

    /// The live node at `idx` if its generation still matches.
    fn live(&self, idx: usize, generation: u32) -> Option<&Node<K, V>> {
        let slot = self.slots.get(idx)?;
        if slot.generation != generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn generation(&self, idx: usize) -> u32 {
        self.slots[idx].generation
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx].node = Some(node);
                idx
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) -> Option<Node<K, V>> {
        let slot = &mut self.slots[idx];
        let node = slot.node.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(idx);
        node
    }

    fn random_level(&self) -> usize {
        let mut rng = rand::thread_rng();
        let mut level = 1;
        while level < self.max_level && rng.gen::<f64>() < self.probability {
            level += 1;
        }
        level
    }
}
