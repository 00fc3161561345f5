//! Folds version edits over a base version.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::comparator::Comparator;
use crate::format::InternalKeyComparator;

use super::edit::{FileMetaData, VersionEdit, NUM_LEVELS};
use super::Version;

#[derive(Default)]
struct LevelState {
    deleted: BTreeSet<u64>,
    added: Vec<Arc<FileMetaData>>,
}

/// Accumulates edits against `base` without touching it.
///
/// `apply` may be called any number of times; `build` produces the folded
/// result. Scalar fields of an edit are ignored here; they belong to the
/// `VersionSet`.
pub struct VersionBuilder<'a> {
    base: &'a Version,
    levels: Vec<LevelState>,
    compact_pointers: Vec<Option<Vec<u8>>>,
    icmp: InternalKeyComparator,
}

impl<'a> VersionBuilder<'a> {
    pub fn new(base: &'a Version) -> Self {
        Self {
            base,
            levels: (0..NUM_LEVELS).map(|_| LevelState::default()).collect(),
            compact_pointers: vec![None; NUM_LEVELS],
            icmp: InternalKeyComparator::default(),
        }
    }

    pub fn apply(&mut self, edit: &VersionEdit) {
        for (level, key) in &edit.compact_pointers {
            self.compact_pointers[*level] = Some(key.clone());
        }

        for &(level, number) in &edit.deleted_files {
            self.levels[level].deleted.insert(number);
        }

        for (level, file) in &edit.new_files {
            let state = &mut self.levels[*level];
            state.deleted.remove(&file.number);
            state.added.push(Arc::new(file.clone()));
        }
    }

    pub fn build(self) -> Version {
        let mut version = Version::new();

        for (level, state) in self.levels.into_iter().enumerate() {
            let mut files: Vec<Arc<FileMetaData>> = self
                .base
                .files(level)
                .iter()
                .chain(state.added.iter())
                .filter(|f| !state.deleted.contains(&f.number))
                .cloned()
                .collect();

            files.sort_by(|a, b| by_smallest_key(&self.icmp, a, b));
            files.dedup_by_key(|f| f.number);
            version.files[level] = files;
        }

        for (level, pointer) in self.compact_pointers.into_iter().enumerate() {
            version.compact_pointers[level] = match pointer {
                Some(key) => Some(key),
                None => self.base.compact_pointer(level).map(<[u8]>::to_vec),
            };
        }

        version
    }
}

fn by_smallest_key(icmp: &InternalKeyComparator, a: &FileMetaData, b: &FileMetaData) -> Ordering {
    icmp.compare(&a.smallest, &b.smallest)
        .then_with(|| a.number.cmp(&b.number))
}
