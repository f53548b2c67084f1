//! Deduplication sets keyed by event identifier

use std::collections::HashSet;

/// A grow-only set of event identifiers with an explicit reset
#[derive(Debug, Clone, Default)]
pub struct DedupSet {
    ids: HashSet<String>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`, returning true if it had not been seen before
    pub fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Identifiers from `ids` that are not yet in the set, in input order
    pub fn unseen<'a, I>(&self, ids: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().filter(|id| !self.ids.contains(*id)).collect()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
