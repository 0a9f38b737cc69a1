use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, distributions::Alphanumeric};

use crate::types::{EntryId, ONLINE_ID_PREFIX, RecordId, TEMPORARY_ID_PREFIX, TimestampMs};

const SUFFIX_LEN: usize = 5;

/// Mints record and entry identifiers.
///
/// Timestamps never go backwards within one minter, even if the wall clock does.
#[derive(Debug, Default)]
pub struct IdMinter {
    last_ms: TimestampMs,
    next_entry_id: EntryId,
}

impl IdMinter {
    pub fn new() -> Self {
        Self {
            last_ms: 0,
            next_entry_id: 1,
        }
    }

    /// `pending-<ms>-<suffix>` when offline, `rec-<ms>-<suffix>` when online.
    pub fn mint_record_id(&mut self, online: bool) -> RecordId {
        let prefix = if online {
            ONLINE_ID_PREFIX
        } else {
            TEMPORARY_ID_PREFIX
        };
        let ts = self.next_timestamp();
        RecordId::new(format!("{prefix}{ts}-{}", random_suffix()))
    }

    pub fn mint_comment_id(&mut self) -> String {
        format!("comment-{}-{}", self.next_timestamp(), random_suffix())
    }

    pub fn next_entry_id(&mut self) -> EntryId {
        let id = self.next_entry_id.max(1);
        self.next_entry_id = id + 1;
        id
    }

    /// Strictly increasing millisecond timestamp.
    pub fn next_timestamp(&mut self) -> TimestampMs {
        self.last_ms = now_ms().max(self.last_ms.saturating_add(1));
        self.last_ms
    }

    /// Bumps counters past ids and timestamps loaded from storage.
    pub fn observe_entry(&mut self, entry_id: EntryId, enqueued_at_ms: TimestampMs) {
        self.next_entry_id = self.next_entry_id.max(entry_id.saturating_add(1));
        self.last_ms = self.last_ms.max(enqueued_at_ms);
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

pub(crate) fn now_ms() -> TimestampMs {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
