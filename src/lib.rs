pub mod allocator;
pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod parser;
pub mod protocol;
pub mod server;
pub mod storage;

use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

use tracing::{info, warn};

use crate::allocator::IdAllocator;
use crate::analysis::{Analysis, Analyzer};
use crate::error::LedgerError;
use crate::index::SecondaryIndex;
use crate::model::{now_millis, Record, RecordId};
use crate::storage::{LedgerImage, RecordStore};

/// Everything a mutation touches. Guarded as one unit so a store and its
/// indexes can never be observed out of step.
#[derive(Debug, Default)]
struct LedgerState {
    thought_ids: IdAllocator,
    thoughts: RecordStore,
    thoughts_by_author: SecondaryIndex,
    thoughts_by_category: SecondaryIndex,

    dream_ids: IdAllocator,
    dreams: RecordStore,
    dreams_by_author: SecondaryIndex,
}

impl LedgerState {
    fn from_image(image: LedgerImage) -> Result<Self, LedgerError> {
        let mut state = LedgerState::default();

        for record in image.thoughts {
            if record.id == RecordId::MAX || state.thoughts.contains(record.id) || record.category().is_none() {
                return Err(LedgerError::CorruptSnapshot);
            }
            state.thought_ids.resume_from(record.id + 1);
            state.thoughts.insert(record.id, record);
        }
        for record in image.dreams {
            if record.id == RecordId::MAX || state.dreams.contains(record.id) || record.category().is_some() {
                return Err(LedgerError::CorruptSnapshot);
            }
            state.dream_ids.resume_from(record.id + 1);
            state.dreams.insert(record.id, record);
        }
        state.thought_ids.resume_from(image.next_thought_id);
        state.dream_ids.resume_from(image.next_dream_id);

        state.thoughts_by_author.rebuild(state.thoughts.iter(), |r| Some(r.author.as_str()));
        state.thoughts_by_category.rebuild(state.thoughts.iter(), Record::category);
        state.dreams_by_author.rebuild(state.dreams.iter(), |r| Some(r.author.as_str()));

        Ok(state)
    }

    fn to_image(&self) -> LedgerImage {
        LedgerImage {
            thoughts: self.thoughts.iter().cloned().collect(),
            dreams: self.dreams.iter().cloned().collect(),
            next_thought_id: self.thought_ids.peek(),
            next_dream_id: self.dream_ids.peek(),
        }
    }
}

/// The thought and dream journals behind a single lock, plus the owner
/// principal allowed to delete thoughts.
///
/// Reads are public. Only the owner, fixed at construction, may delete.
pub struct Ledger {
    owner: String,
    state: Mutex<LedgerState>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Ledger");
        s.field("owner", &self.owner);
        if let Ok(state) = self.state.try_lock() {
            s.field("thoughts", &state.thoughts.size())
            .field("dreams", &state.dreams.size());
        }
        s.finish()
    }
}

impl Ledger {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    // --- THOUGHTS ---

    pub fn submit_thought(&self, author: &str, content: &str, category: &str) -> Result<RecordId, LedgerError> {
        if content.is_empty() {
            warn!(author = %author, "rejected thought: empty content");
            return Err(LedgerError::InvalidContent);
        }
        if category.is_empty() {
            warn!(author = %author, "rejected thought: empty category");
            return Err(LedgerError::InvalidCategory);
        }

        let mut state = self.state.lock().map_err(|_| LedgerError::Poisoned)?;
        let id = state.thought_ids.next_id().ok_or(LedgerError::IdsExhausted)?;
        let record = Record::thought(id, author, content, category, now_millis());

        state.thoughts.insert(id, record);
        state.thoughts_by_author.append(author, id);
        state.thoughts_by_category.append(category, id);

        info!(id, author = %author, category = %category, "thought submitted");
        Ok(id)
    }

    pub fn get_thought(&self, id: RecordId) -> Option<Record> {
        let state = self.state.lock().ok()?;
        state.thoughts.get(id).cloned()
    }

    /// Thought IDs submitted by `author`, oldest first.
    pub fn list_by_author(&self, author: &str) -> Vec<RecordId> {
        match self.state.lock() {
            Ok(state) => state.thoughts_by_author.list(author),
            Err(_) => vec![],
        }
    }

    /// Thought IDs filed under `category`, oldest first.
    pub fn list_by_category(&self, category: &str) -> Vec<RecordId> {
        match self.state.lock() {
            Ok(state) => state.thoughts_by_category.list(category),
            Err(_) => vec![],
        }
    }

    /// Owner-only. Removes the thought and prunes it from both thought indexes.
    pub fn delete_thought(&self, caller: &str, id: RecordId) -> Result<(), LedgerError> {
        if caller != self.owner {
            warn!(caller = %caller, id, "rejected delete: not owner");
            return Err(LedgerError::Unauthorized);
        }

        let mut state = self.state.lock().map_err(|_| LedgerError::Poisoned)?;
        if state.thoughts.remove(id).is_none() {
            return Err(LedgerError::NotFound(id));
        }
        let pruned = state.thoughts_by_author.remove_from_all(id)
            + state.thoughts_by_category.remove_from_all(id);

        info!(id, pruned, "thought deleted");
        Ok(())
    }

    pub fn thought_count(&self) -> usize {
        self.state.lock().map(|s| s.thoughts.size()).unwrap_or(0)
    }

    // --- DREAMS ---

    /// Dreams are accepted as given: empty content and empty themes are fine.
    pub fn submit_dream(&self, dreamer: &str, content: &str, themes: Vec<String>) -> Result<RecordId, LedgerError> {
        let mut state = self.state.lock().map_err(|_| LedgerError::Poisoned)?;
        let id = state.dream_ids.next_id().ok_or(LedgerError::IdsExhausted)?;
        let theme_count = themes.len();
        let record = Record::dream(id, dreamer, content, themes, now_millis());

        state.dreams.insert(id, record);
        state.dreams_by_author.append(dreamer, id);

        info!(id, dreamer = %dreamer, themes = theme_count, "dream submitted");
        Ok(id)
    }

    pub fn get_dream(&self, id: RecordId) -> Option<Record> {
        let state = self.state.lock().ok()?;
        state.dreams.get(id).cloned()
    }

    pub fn list_dreams_by_author(&self, dreamer: &str) -> Vec<RecordId> {
        match self.state.lock() {
            Ok(state) => state.dreams_by_author.list(dreamer),
            Err(_) => vec![],
        }
    }

    pub fn dream_count(&self) -> usize {
        self.state.lock().map(|s| s.dreams.size()).unwrap_or(0)
    }

    // --- ANALYSIS ---

    /// Runs `analyzer` over every thought's content in ID order. The lock is
    /// released before the analyzer is called.
    pub fn analyze_thoughts(&self, analyzer: &dyn Analyzer) -> Analysis {
        let contents = self.contents(|s| &s.thoughts);
        analyzer.analyze(&contents)
    }

    pub fn analyze_dreams(&self, analyzer: &dyn Analyzer) -> Analysis {
        let contents = self.contents(|s| &s.dreams);
        analyzer.analyze(&contents)
    }

    fn contents<F>(&self, journal: F) -> Vec<String>
    where
    F: Fn(&LedgerState) -> &RecordStore,
    {
        match self.state.lock() {
            Ok(state) => journal(&*state).iter().map(|r| r.content.clone()).collect(),
            Err(_) => vec![],
        }
    }

    // --- SNAPSHOTS ---

    pub fn snapshot(&self) -> Result<Vec<u8>, LedgerError> {
        let image = {
            let state = self.state.lock().map_err(|_| LedgerError::Poisoned)?;
            state.to_image()
        };
        let bytes = image.encode()?;
        info!(
            thoughts = image.thoughts.len(),
            dreams = image.dreams.len(),
            bytes = bytes.len(),
            "ledger snapshot taken"
        );
        Ok(bytes)
    }

    /// Replace the whole ledger with a snapshot. Indexes are rebuilt from the
    /// restored records. On error nothing changes.
    pub fn restore(&self, data: &[u8]) -> Result<(), LedgerError> {
        let image = LedgerImage::decode(data)?;
        let (thoughts, dreams) = (image.thoughts.len(), image.dreams.len());
        let restored = LedgerState::from_image(image)?;

        let mut state = self.state.lock().map_err(|_| LedgerError::Poisoned)?;
        *state = restored;

        info!(thoughts, dreams, "ledger restored");
        Ok(())
    }

    /// Checks that every index entry points at a stored record, every record
    /// sits in its buckets exactly once, and no bucket repeats an ID.
    pub fn verify_consistency(&self) -> Result<(), String> {
        let state = self.state.lock().map_err(|_| "Poisoned Lock".to_string())?;

        check_index(&state.thoughts, &state.thoughts_by_author, |r| Some(r.author.as_str()), "thought author")?;
        check_index(&state.thoughts, &state.thoughts_by_category, Record::category, "thought category")?;
        check_index(&state.dreams, &state.dreams_by_author, |r| Some(r.author.as_str()), "dream author")?;
        Ok(())
    }
}

fn check_index<F>(store: &RecordStore, index: &SecondaryIndex, key_of: F, name: &str) -> Result<(), String>
where
F: Fn(&Record) -> Option<&str>,
{
    let mut indexed = 0;
    for key in index.keys() {
        let ids = index.list(key);
        let unique: HashSet<_> = ids.iter().collect();
        if unique.len() != ids.len() {
            return Err(format!("{} index: duplicate id under '{}'", name, key));
        }
        for id in ids {
            match store.get(id) {
                None => return Err(format!("{} index: dangling id {} under '{}'", name, id, key)),
                Some(r) if key_of(r) != Some(key) => {
                    return Err(format!("{} index: id {} filed under wrong key '{}'", name, id, key));
                }
                Some(_) => indexed += 1,
            }
        }
    }

    let expected = store.iter().filter(|r| key_of(r).is_some()).count();
    if indexed != expected {
        return Err(format!("{} index: {} entries for {} records", name, indexed, expected));
    }
    Ok(())
}
