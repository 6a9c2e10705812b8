use crate::record::{ChildRecord, RecordId};
use std::collections::HashMap;

/// Keyed store of previously generated children, one entry per parent
/// identity.
///
/// The cache itself is not synchronized. [`FleetGenerator`] keeps it behind
/// the same lock as its progress scalar so that a lookup and a progress reset
/// are observed together.
///
/// [`FleetGenerator`]: crate::FleetGenerator
#[derive(Debug, Default, Clone)]
pub struct GenerationCache {
    entries: HashMap<RecordId, Vec<ChildRecord>>,
}

impl GenerationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached children for `id`, in generation order.
    pub fn get(&self, id: &RecordId) -> Option<&[ChildRecord]> {
        self.entries.get(id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.entries.contains_key(id)
    }

    /// Stores `children` under `id`, replacing any previous entry.
    pub fn insert(&mut self, id: RecordId, children: Vec<ChildRecord>) {
        self.entries.insert(id, children);
    }

    /// Removes the entry for `id`. Returns whether one was present.
    pub fn invalidate(&mut self, id: &RecordId) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
