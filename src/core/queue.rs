use crate::{
    op::{ActionKind, EntryPayload, EntryTarget, MutationEntry},
    types::{EntryId, RecordId},
};

/// FIFO log of pending remote writes, ordered by enqueue time then entry id.
#[derive(Debug, Clone, Default)]
pub struct MutationQueue {
    entries: Vec<MutationEntry>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(mut entries: Vec<MutationEntry>) -> Self {
        entries.sort_by_key(MutationEntry::order_key);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn enqueue(&mut self, entry: MutationEntry) {
        let key = entry.order_key();
        let pos = self.entries.partition_point(|e| e.order_key() <= key);
        self.entries.insert(pos, entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &MutationEntry> {
        self.entries.iter()
    }

    /// Read-only FIFO snapshot.
    pub fn dequeue_in_order(&self) -> Vec<MutationEntry> {
        self.entries.clone()
    }

    pub fn ids_in_order(&self) -> Vec<EntryId> {
        self.entries.iter().map(|e| e.entry_id).collect()
    }

    pub fn get(&self, entry_id: EntryId) -> Option<&MutationEntry> {
        self.entries.iter().find(|e| e.entry_id == entry_id)
    }

    pub fn remove(&mut self, entry_id: EntryId) -> Option<MutationEntry> {
        let pos = self.entries.iter().position(|e| e.entry_id == entry_id)?;
        Some(self.entries.remove(pos))
    }

    /// Bumps the retry counter in place; queue position is unchanged.
    pub fn requeue_with_incremented_retry(&mut self, entry_id: EntryId) -> Option<&MutationEntry> {
        let entry = self.entries.iter_mut().find(|e| e.entry_id == entry_id)?;
        entry.retry_count = entry.retry_count.saturating_add(1);
        Some(entry)
    }

    /// Points every entry that references `from` at `to`, snapshots included.
    /// Returns the entries that changed.
    pub fn retarget(&mut self, from: &RecordId, to: &RecordId) -> Vec<MutationEntry> {
        let mut changed = Vec::new();
        for entry in &mut self.entries {
            let EntryTarget::Record(target) = &mut entry.target else {
                continue;
            };
            if target != from {
                continue;
            }
            *target = to.clone();
            if let EntryPayload::Record(rec) = &mut entry.payload {
                rec.id = to.clone();
            }
            changed.push(entry.clone());
        }
        changed
    }

    /// Drops every entry that references `record_id`.
    pub fn remove_for_record(&mut self, record_id: &RecordId) -> Vec<MutationEntry> {
        let (removed, kept) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.record_id() == Some(record_id));
        self.entries = kept;
        removed
    }

    pub fn has_entries_for(&self, record_id: &RecordId) -> bool {
        self.entries.iter().any(|e| e.record_id() == Some(record_id))
    }

    pub fn has_pending_create(&self, record_id: &RecordId) -> bool {
        self.entries
            .iter()
            .any(|e| e.action == ActionKind::Create && e.record_id() == Some(record_id))
    }

    /// True if a Create for the same record sits ahead of `entry_id`.
    pub fn create_ahead_of(&self, entry_id: EntryId) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.entry_id == entry_id) else {
            return false;
        };
        let Some(target) = self.entries[pos].record_id() else {
            return false;
        };
        self.entries[..pos]
            .iter()
            .any(|e| e.action == ActionKind::Create && e.record_id() == Some(target))
    }
}
