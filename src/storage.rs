use std::collections::BTreeMap;

use rkyv::Deserialize;

use crate::error::LedgerError;
use crate::model::{Record, RecordId};

/// Canonical mapping from ID to record. Ordered by ID, which is also
/// submission order.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    records: BTreeMap<RecordId, Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self { records: BTreeMap::new() }
    }

    /// Panics if `id` is already present: the allocator guarantees fresh IDs,
    /// so a collision means the ledger state is already broken.
    pub fn insert(&mut self, id: RecordId, record: Record) {
        let prev = self.records.insert(id, record);
        assert!(prev.is_none(), "record id {} inserted twice", id);
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn remove(&mut self, id: RecordId) -> Option<Record> {
        self.records.remove(&id)
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }
}

// --- LEDGER IMAGE ---

/// Everything needed to rebuild a ledger: the records of both journals and
/// where each allocator stood. Indexes are not stored; they are derived.
#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize, Debug, Clone, PartialEq, Default)]
#[archive(check_bytes)]
pub struct LedgerImage {
    pub thoughts: Vec<Record>,
    pub dreams: Vec<Record>,
    pub next_thought_id: RecordId,
    pub next_dream_id: RecordId,
}

impl LedgerImage {
    pub fn encode(&self) -> Result<Vec<u8>, LedgerError> {
        let bytes = rkyv::to_bytes::<_, 4096>(self)
        .map_err(|e| LedgerError::Snapshot(e.to_string()))?;
        Ok(bytes.into_vec())
    }

    pub fn decode(data: &[u8]) -> Result<Self, LedgerError> {
        // Archives need the alignment rkyv wrote them with
        let mut aligned = rkyv::AlignedVec::with_capacity(data.len());
        aligned.extend_from_slice(data);

        let archived = rkyv::check_archived_root::<LedgerImage>(&aligned)
        .map_err(|_| LedgerError::CorruptSnapshot)?;
        archived
        .deserialize(&mut rkyv::Infallible)
        .map_err(|_| LedgerError::CorruptSnapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thought(id: RecordId) -> Record {
        Record::thought(id, "alice", "hello", "c1", 100 + id)
    }

    #[test]
    fn test_insert_get_remove() {
        let mut store = RecordStore::new();
        store.insert(0, thought(0));
        store.insert(1, thought(1));
        assert_eq!(store.size(), 2);
        assert_eq!(store.get(1).map(|r| r.timestamp), Some(101));

        assert!(store.remove(0).is_some());
        assert!(store.remove(0).is_none());
        assert!(store.get(0).is_none());
        assert_eq!(store.size(), 1);
    }

    #[test]
    #[should_panic(expected = "inserted twice")]
    fn test_duplicate_insert_panics() {
        let mut store = RecordStore::new();
        store.insert(0, thought(0));
        store.insert(0, thought(0));
    }

    #[test]
    fn test_iter_is_id_ordered() {
        let mut store = RecordStore::new();
        for id in [2, 0, 1] {
            store.insert(id, thought(id));
        }
        let ids: Vec<_> = store.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_image_codec() {
        let image = LedgerImage {
            thoughts: vec![thought(0), thought(2)],
            dreams: vec![Record::dream(0, "bob", "stars", vec!["ocean".into(), "stars".into()], 5)],
            next_thought_id: 3,
            next_dream_id: 1,
        };
        let bytes = image.encode().unwrap();
        assert_eq!(LedgerImage::decode(&bytes).unwrap(), image);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(LedgerImage::decode(&[]), Err(LedgerError::CorruptSnapshot));
        assert_eq!(
            LedgerImage::decode(&[0xFF; 64]),
            Err(LedgerError::CorruptSnapshot)
        );
    }
}
