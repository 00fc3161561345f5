//! Handle-based circular doubly linked list.
//!
//! Entries live in a `Vec` and link to each other by index through a
//! sentinel at index 0, so "next"/"prev" are integer lookups. A `Handle`
//! carries the slot generation; once an entry is removed its slot generation
//! is bumped and every outstanding handle to it stops resolving.
//!
//! Used for the chain of live Versions and for the snapshot list.

/// Reference to an entry of a `Chain`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    generation: u32,
}

struct Entry<T> {
    value: Option<T>,
    prev: usize,
    next: usize,
    generation: u32,
}

const SENTINEL: usize = 0;

pub struct Chain<T> {
    entries: Vec<Entry<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Chain<T> {
    pub fn new() -> Self {
        Self {
            entries: vec![Entry {
                value: None,
                prev: SENTINEL,
                next: SENTINEL,
                generation: 0,
            }],
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `value` right before the sentinel, making it the newest entry.
    pub fn push_back(&mut self, value: T) -> Handle {
        let tail = self.entries[SENTINEL].prev;
        let index = match self.free.pop() {
            Some(index) => {
                let entry = &mut self.entries[index];
                entry.value = Some(value);
                entry.prev = tail;
                entry.next = SENTINEL;
                index
            }
            None => {
                self.entries.push(Entry {
                    value: Some(value),
                    prev: tail,
                    next: SENTINEL,
                    generation: 0,
                });
                self.entries.len() - 1
            }
        };
        self.entries[tail].next = index;
        self.entries[SENTINEL].prev = index;
        self.len += 1;
        self.handle(index)
    }

    /// Unlink the entry and return its value. Stale handles return `None`.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        let (prev, next) = {
            let entry = &self.entries[handle.index];
            (entry.prev, entry.next)
        };
        self.entries[prev].next = next;
        self.entries[next].prev = prev;

        let entry = &mut self.entries[handle.index];
        entry.generation = entry.generation.wrapping_add(1);
        entry.prev = handle.index;
        entry.next = handle.index;
        let value = entry.value.take();
        self.free.push(handle.index);
        self.len -= 1;
        value
    }

    pub fn contains(&self, handle: Handle) -> bool {
        handle.index != SENTINEL
            && self
                .entries
                .get(handle.index)
                .map_or(false, |e| e.generation == handle.generation && e.value.is_some())
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        if !self.contains(handle) {
            return None;
        }
        self.entries[handle.index].value.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if !self.contains(handle) {
            return None;
        }
        self.entries[handle.index].value.as_mut()
    }

    /// Oldest entry
    pub fn first(&self) -> Option<Handle> {
        self.link(self.entries[SENTINEL].next)
    }

    /// Newest entry
    pub fn last(&self) -> Option<Handle> {
        self.link(self.entries[SENTINEL].prev)
    }

    pub fn next(&self, handle: Handle) -> Option<Handle> {
        if !self.contains(handle) {
            return None;
        }
        self.link(self.entries[handle.index].next)
    }

    pub fn prev(&self, handle: Handle) -> Option<Handle> {
        if !self.contains(handle) {
            return None;
        }
        self.link(self.entries[handle.index].prev)
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        std::iter::successors(self.first(), move |h| self.next(*h))
            .filter_map(move |h| self.get(h).map(|v| (h, v)))
    }

    fn link(&self, index: usize) -> Option<Handle> {
        (index != SENTINEL).then(|| self.handle(index))
    }

    fn handle(&self, index: usize) -> Handle {
        Handle {
            index,
            generation: self.entries[index].generation,
        }
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}
