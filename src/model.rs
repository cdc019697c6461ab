use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub type RecordId = u64;

/// What a record is tagged with. Thoughts carry one category, dreams a list of themes.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[archive(check_bytes)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordTag {
    Thought { category: String },
    // Descriptive only, never validated or indexed
    Dream { themes: Vec<String> },
}

/// The atomic unit of the ledger. Immutable once stored.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[archive(check_bytes)]
pub struct Record {
    pub id: RecordId,

    /// Principal that submitted the record
    pub author: String,

    pub content: String,

    /// Milliseconds since the Unix epoch at submission
    pub timestamp: u64,

    pub tag: RecordTag,
}

impl Record {
    pub fn thought(id: RecordId, author: &str, content: &str, category: &str, ts: u64) -> Self {
        Self {
            id,
            author: author.to_string(),
            content: content.to_string(),
            timestamp: ts,
            tag: RecordTag::Thought { category: category.to_string() },
        }
    }

    pub fn dream(id: RecordId, dreamer: &str, content: &str, themes: Vec<String>, ts: u64) -> Self {
        Self {
            id,
            author: dreamer.to_string(),
            content: content.to_string(),
            timestamp: ts,
            tag: RecordTag::Dream { themes },
        }
    }

    pub fn category(&self) -> Option<&str> {
        match &self.tag {
            RecordTag::Thought { category } => Some(category),
            RecordTag::Dream { .. } => None,
        }
    }

    pub fn themes(&self) -> &[String] {
        match &self.tag {
            RecordTag::Dream { themes } => themes,
            RecordTag::Thought { .. } => &[],
        }
    }
}

/// Capture time for new records. Falls back to 0 on a clock set before 1970.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
