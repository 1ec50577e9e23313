//! Exact-name merging of epic lists.
//!
//! Names are compared case-insensitively after trimming and nothing else:
//! "Payment" and "Payments" are different epics here.

use estimator_core::{Epic, name_key};
use std::collections::HashSet;

/// Set of epic names already taken.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    keys: HashSet<String>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_epics<'a>(epics: impl IntoIterator<Item = &'a Epic>) -> Self {
        let mut index = Self::new();
        for epic in epics {
            index.insert(&epic.name);
        }
        index
    }

    /// Returns false if the name was already taken.
    pub fn insert(&mut self, name: &str) -> bool {
        self.keys.insert(name_key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keys.contains(&name_key(name))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Keep the first epic of each name, preserving order.
pub fn dedup_by_name(epics: Vec<Epic>) -> Vec<Epic> {
    let mut index = NameIndex::new();
    epics.into_iter().filter(|epic| index.insert(&epic.name)).collect()
}

/// Append `candidates` to `base`, skipping names `base` or earlier
/// candidates already hold. Returns the names that were skipped.
pub fn merge_unique(base: &mut Vec<Epic>, candidates: Vec<Epic>) -> Vec<String> {
    let mut index = NameIndex::from_epics(base.iter());
    let mut skipped = Vec::new();
    for epic in candidates {
        if index.insert(&epic.name) {
            base.push(epic);
        } else {
            skipped.push(epic.name);
        }
    }
    skipped
}
