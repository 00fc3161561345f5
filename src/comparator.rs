//! Comparators
//!
//! Ordering is injected into the skip list and the memtable through the
//! `Comparator` trait instead of relying on `Ord` on the stored key type.

use std::cmp::Ordering;
use std::marker::PhantomData;

/// A total order over keys of type `K`.
pub trait Comparator<K: ?Sized> {
    /// Three-way comparison of `a` and `b`.
    fn compare(&self, a: &K, b: &K) -> Ordering;

    /// Name persisted in the MANIFEST; reopening with a comparator of a
    /// different name is rejected.
    fn name(&self) -> &'static str {
        "stratakv.Anonymous"
    }
}

/// Orders keys by their `Ord` implementation.
pub struct OrdComparator<K> {
    _marker: PhantomData<fn(&K)>,
}

impl<K> OrdComparator<K> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<K> Default for OrdComparator<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> Comparator<K> for OrdComparator<K> {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }

    fn name(&self) -> &'static str {
        "stratakv.Ord"
    }
}

/// Lexicographic byte order. The user-key comparator of every database.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytewiseComparator;

impl Comparator<[u8]> for BytewiseComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    fn name(&self) -> &'static str {
        "stratakv.BytewiseComparator"
    }
}
