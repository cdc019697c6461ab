use crate::model::RecordId;

/// Hands out record IDs 0, 1, 2, ... IDs are never handed back, so a deleted
/// record's ID stays retired. `RecordId::MAX` is never issued.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    next: RecordId,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// `None` once the sequence is exhausted. The allocator does not advance.
    pub fn next_id(&mut self) -> Option<RecordId> {
        let id = self.next;
        self.next = id.checked_add(1)?;
        Some(id)
    }

    /// The ID the next call to `next_id` will return.
    pub fn peek(&self) -> RecordId {
        self.next
    }

    /// Reseed after restoring an image. Never moves backwards.
    pub fn resume_from(&mut self, next: RecordId) {
        self.next = self.next.max(next);
    }
}
