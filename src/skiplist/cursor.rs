//! SkipList cursors
//!
//! `Cursor` does not borrow the list: it remembers a node handle and every
//! movement takes the list by reference. Callers may therefore mutate the
//! list between movements. A node inserted right after the cursor's node is
//! visited by the next `next()` call; if the cursor's own node is removed the
//! cursor becomes invalid.

use crate::comparator::Comparator;

use super::SkipList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeRef {
    index: usize,
    generation: u32,
}

/// Position within a `SkipList`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    node: Option<NodeRef>,
}

impl Cursor {
    pub(super) fn new() -> Self {
        Self { node: None }
    }

    /// Whether the cursor points at a live node of `list`.
    pub fn valid<K, V, C: Comparator<K>>(&self, list: &SkipList<K, V, C>) -> bool {
        self.live(list).is_some()
    }

    pub fn key<'a, K, V, C: Comparator<K>>(&self, list: &'a SkipList<K, V, C>) -> Option<&'a K> {
        self.live(list).map(|idx| &list.node(idx).key)
    }

    pub fn value<'a, K, V, C: Comparator<K>>(&self, list: &'a SkipList<K, V, C>) -> Option<&'a V> {
        self.live(list).map(|idx| &list.node(idx).value)
    }

    /// Position at the first node with key >= `key`.
    pub fn seek<K, V, C: Comparator<K>>(&mut self, list: &SkipList<K, V, C>, key: &K) {
        self.node = Self::handle(list, list.find_greater_or_equal(key, None));
    }

    pub fn seek_to_first<K, V, C: Comparator<K>>(&mut self, list: &SkipList<K, V, C>) {
        self.node = Self::handle(list, list.first());
    }

    pub fn seek_to_last<K, V, C: Comparator<K>>(&mut self, list: &SkipList<K, V, C>) {
        self.node = Self::handle(list, list.find_last());
    }

    /// Advance to the following node. No-op on an invalid cursor.
    pub fn next<K, V, C: Comparator<K>>(&mut self, list: &SkipList<K, V, C>) {
        self.node = match self.live(list) {
            Some(idx) => Self::handle(list, list.node(idx).forward[0]),
            None => None,
        };
    }

    /// Step back to the preceding node. No-op on an invalid cursor.
    pub fn prev<K, V, C: Comparator<K>>(&mut self, list: &SkipList<K, V, C>) {
        self.node = match self.live(list) {
            Some(idx) => Self::handle(list, list.find_less_than(&list.node(idx).key)),
            None => None,
        };
    }

    fn live<K, V, C: Comparator<K>>(&self, list: &SkipList<K, V, C>) -> Option<usize> {
        let node = self.node?;
        list.live(node.index, node.generation).map(|_| node.index)
    }

    fn handle<K, V, C: Comparator<K>>(list: &SkipList<K, V, C>, idx: Option<usize>) -> Option<NodeRef> {
        idx.map(|index| NodeRef {
            index,
            generation: list.generation(index),
        })
    }
}

/// Borrowing in-order iterator over a `SkipList`.
pub struct Iter<'a, K, V, C> {
    list: &'a SkipList<K, V, C>,
    next: Option<usize>,
}

impl<'a, K, V, C: Comparator<K>> Iter<'a, K, V, C> {
    pub(super) fn new(list: &'a SkipList<K, V, C>) -> Self {
        Self {
            list,
            next: list.first(),
        }
    }
}

impl<'a, K, V, C: Comparator<K>> Iterator for Iter<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = self.list.node(idx);
        self.next = node.forward[0];
        Some((&node.key, &node.value))
    }
}
