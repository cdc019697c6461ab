use std::collections::HashMap;

use crate::model::{Record, RecordId};

/// Secondary index: key -> record IDs in insertion order.
///
/// Holds no records itself; every list must be derivable from the record
/// store, so callers prune with [`SecondaryIndex::remove_from_all`] whenever
/// a record leaves the store.
#[derive(Debug, Default, Clone)]
pub struct SecondaryIndex {
    buckets: HashMap<String, Vec<RecordId>>,
}

impl SecondaryIndex {
    pub fn new() -> Self {
        Self { buckets: HashMap::new() }
    }

    /// Append `id` under `key`, creating the bucket on first use.
    /// No duplicate suppression: each submission appends exactly once.
    pub fn append(&mut self, key: &str, id: RecordId) {
        self.buckets.entry(key.to_string()).or_default().push(id);
    }

    /// IDs under `key` in insertion order; empty for unknown keys.
    pub fn list(&self, key: &str) -> Vec<RecordId> {
        self.buckets.get(key).cloned().unwrap_or_default()
    }

    /// Remove `id` from every bucket. Buckets left empty are dropped.
    /// Returns how many entries were removed.
    pub fn remove_from_all(&mut self, id: RecordId) -> usize {
        let mut removed = 0;
        self.buckets.retain(|_, ids| {
            let before = ids.len();
            ids.retain(|&x| x != id);
            removed += before - ids.len();
            !ids.is_empty()
        });
        removed
    }

    /// Recompute the index from store contents. `key_of` picks the bucket a
    /// record belongs to; records it maps to `None` are skipped.
    pub fn rebuild<'a, I, F>(&mut self, records: I, key_of: F)
    where
    I: IntoIterator<Item = &'a Record>,
    F: Fn(&Record) -> Option<&str>,
    {
        self.buckets.clear();
        for record in records {
            if let Some(key) = key_of(record) {
                self.append(key, record.id);
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.buckets.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// Total number of entries across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
