//! Runtime event stream payloads.

use std::time::Duration;

use crate::{
    sync::engine::RunReport,
    types::{RecordId, UserId},
};

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Transient problem that will be retried.
    Warning,
    /// Needs user attention.
    Error,
}

/// What a notice is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    /// A remote attempt failed and will be retried.
    RetryScheduled {
        /// Affected record, if the entry targets one.
        record_id: Option<RecordId>,
        /// Failed attempts so far.
        attempt: u32,
        /// Retry budget.
        max: u32,
    },
    /// The retry budget is spent; no further automatic attempts.
    SyncFailedPermanently {
        /// Affected record, if the entry targets one.
        record_id: Option<RecordId>,
    },
    /// Local persistence failed; the session continues in memory only.
    StorageDegraded,
}

/// Auto-dismissing, user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NoticeLevel,
    /// Structured reason.
    pub kind: NoticeKind,
    /// Display text.
    pub message: String,
    /// How long the message stays visible.
    pub dismiss_after: Duration,
}

impl Notification {
    pub(crate) fn retry(
        item: &str,
        record_id: Option<RecordId>,
        attempt: u32,
        max: u32,
        dismiss_after: Duration,
    ) -> Self {
        Self {
            level: NoticeLevel::Warning,
            kind: NoticeKind::RetryScheduled {
                record_id,
                attempt,
                max,
            },
            message: format!("Could not sync {item} (attempt {attempt}/{max}); will retry."),
            dismiss_after,
        }
    }

    pub(crate) fn permanent_failure(
        item: &str,
        record_id: Option<RecordId>,
        dismiss_after: Duration,
    ) -> Self {
        Self {
            level: NoticeLevel::Error,
            kind: NoticeKind::SyncFailedPermanently { record_id },
            message: format!("{item} can no longer sync automatically. Retry or discard it."),
            dismiss_after,
        }
    }

    pub(crate) fn storage_degraded(reason: &str, dismiss_after: Duration) -> Self {
        Self {
            level: NoticeLevel::Warning,
            kind: NoticeKind::StorageDegraded,
            message: format!("Local storage unavailable ({reason}); changes are kept until the app closes."),
            dismiss_after,
        }
    }
}

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A record was created locally.
    RecordCreated {
        /// New record id.
        id: RecordId,
    },
    /// A record was changed locally or by the sync engine.
    RecordUpdated {
        /// Updated record id.
        id: RecordId,
    },
    /// A record was removed.
    RecordDeleted {
        /// Removed record id.
        id: RecordId,
    },
    /// A temporary id was replaced by the canonical one.
    RecordReconciled {
        /// Locally minted id.
        temporary: RecordId,
        /// Id assigned by the remote service.
        canonical: RecordId,
    },
    /// The session profile changed.
    ProfileUpdated {
        /// Profile owner.
        user_id: UserId,
    },
    /// A sync run took its queue snapshot.
    SyncStarted {
        /// Entries in the snapshot.
        pending: usize,
    },
    /// A sync run finished its snapshot.
    SyncFinished {
        /// Tally of the run.
        report: RunReport,
    },
    /// User-facing notice.
    Notice(Notification),
}
