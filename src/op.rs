//! Mutation-queue entry model and persistence wrappers.

use serde::{Deserialize, Serialize};

use crate::{
    record::{Record, UserProfile},
    types::{EntryId, RecordId, TimestampMs, UserId},
};

/// Version number for serialized [`StoredEntryEnvelope`] payloads.
pub const ENTRY_FORMAT_VERSION: u16 = 1;

/// Remote operation an entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Create the record remotely and obtain its canonical id.
    Create,
    /// Overwrite the remote record with the local state.
    Update,
    /// Overwrite the remote profile.
    ProfileUpdate,
}

/// What an entry points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EntryTarget {
    /// A record, by its id at enqueue time (possibly retargeted since).
    Record(RecordId),
    /// A user profile.
    Profile(UserId),
}

/// Snapshot captured at enqueue time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EntryPayload {
    /// Full record snapshot.
    Record(Record),
    /// Full profile snapshot.
    Profile(UserProfile),
}

/// One outstanding write against the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationEntry {
    /// Monotonic entry id.
    pub entry_id: EntryId,
    /// Remote operation.
    pub action: ActionKind,
    /// Target reference.
    pub target: EntryTarget,
    /// Fallback snapshot.
    pub payload: EntryPayload,
    /// Enqueue time in milliseconds.
    pub enqueued_at_ms: TimestampMs,
    /// Failed attempts so far.
    #[serde(default)]
    pub retry_count: u32,
}

impl MutationEntry {
    /// Record id this entry targets, if any.
    pub fn record_id(&self) -> Option<&RecordId> {
        match &self.target {
            EntryTarget::Record(id) => Some(id),
            EntryTarget::Profile(_) => None,
        }
    }

    /// Queue ordering key: enqueue time, then entry id.
    pub fn order_key(&self) -> (TimestampMs, EntryId) {
        (self.enqueued_at_ms, self.entry_id)
    }

    /// Store key for the queue collection.
    pub fn store_key(&self) -> String {
        entry_store_key(self.entry_id)
    }

    /// Name used in user-facing messages.
    pub fn label(&self) -> String {
        match &self.payload {
            EntryPayload::Record(rec) => rec.label(),
            EntryPayload::Profile(profile) => format!("profile of {}", profile.display_name()),
        }
    }
}

/// Zero-padded key so lexical order matches numeric order.
pub fn entry_store_key(entry_id: EntryId) -> String {
    format!("{entry_id:020}")
}

/// Versioned wrapper for stable on-disk payload decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntryEnvelope {
    /// Payload format version.
    pub format_version: u16,
    /// Wrapped entry.
    pub entry: MutationEntry,
}

impl StoredEntryEnvelope {
    /// Constructs an envelope using [`ENTRY_FORMAT_VERSION`].
    pub fn new(entry: MutationEntry) -> Self {
        Self {
            format_version: ENTRY_FORMAT_VERSION,
            entry,
        }
    }
}
