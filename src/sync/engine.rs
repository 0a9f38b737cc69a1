use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    config::SyncConfig,
    record::{Record, UserProfile},
    remote::{RemoteError, RemoteService},
    runtime::handle::RuntimeError,
    types::{EntryId, RecordId},
};

/// Reentrancy guard: at most one run at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Running,
}

/// Result of one entry's remote attempt, as folded back into state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote accepted the write; carries the canonical id for creates.
    Applied(Option<RecordId>),
    /// Remote failed; the entry stays queued with a bumped retry count.
    Retriable(RemoteError),
    /// Retry budget spent; the entry is gone and the record flagged.
    Exhausted,
}

/// Pre-flight verdict for one entry of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCheck {
    /// Send it.
    Ready,
    /// Waits behind a Create for the same temporary record.
    Deferred,
    /// Budget already spent; handled without a remote attempt.
    Exhausted,
    /// Removed since the snapshot was taken.
    Gone,
}

/// What to send for an entry, resolved from current state at send time.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Create { record: Record },
    Update { id: RecordId, record: Record },
    Profile { profile: UserProfile },
}

/// Successful remote acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAck {
    Created(RecordId),
    Updated,
    ProfileUpdated,
}

/// Tally of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub attempted: usize,
    pub applied: usize,
    pub retried: usize,
    pub exhausted: usize,
    pub deferred: usize,
    /// True if any record changed during the run.
    pub records_changed: bool,
}

/// The state owner as seen by the engine. Each call is one short, atomic step.
#[async_trait]
pub trait EngineLink: Send + Sync {
    /// Claims the guard and returns the FIFO snapshot, or `None` if a run is active.
    async fn begin(&self) -> Result<Option<Vec<EntryId>>, RuntimeError>;
    async fn check(&self, entry_id: EntryId) -> Result<EntryCheck, RuntimeError>;
    /// Reads the current record (snapshot as fallback) for the entry.
    async fn dispatch(&self, entry_id: EntryId) -> Result<Option<Dispatch>, RuntimeError>;
    async fn complete(
        &self,
        entry_id: EntryId,
        result: Result<RemoteAck, RemoteError>,
    ) -> Result<SyncOutcome, RuntimeError>;
    /// Commits the run and releases the guard.
    async fn finish(&self) -> Result<RunReport, RuntimeError>;
}

/// Drains the mutation queue against a [`RemoteService`], one entry at a time.
pub struct SyncEngine<R> {
    remote: Arc<R>,
    pacing: Duration,
    remote_timeout: Duration,
}

impl<R: RemoteService> SyncEngine<R> {
    pub fn new(remote: Arc<R>, config: &SyncConfig) -> Self {
        Self {
            remote,
            pacing: config.pacing(),
            remote_timeout: config.remote_timeout(),
        }
    }

    /// Runs one pass over the queue snapshot. Returns `None` when another run
    /// already holds the guard.
    ///
    /// Entries are processed strictly sequentially, so no two remote calls are
    /// ever in flight together.
    pub async fn run<L: EngineLink + ?Sized>(&self, link: &L) -> Result<Option<RunReport>, RuntimeError> {
        let Some(snapshot) = link.begin().await? else {
            debug!("sync trigger coalesced into the active run");
            return Ok(None);
        };
        info!(pending = snapshot.len(), "sync run started");

        for entry_id in snapshot {
            match link.check(entry_id).await? {
                EntryCheck::Ready => {}
                verdict => {
                    debug!(entry_id, ?verdict, "entry skipped");
                    continue;
                }
            }

            tokio::time::sleep(self.pacing).await;

            // Resolve after the delay so edits made meanwhile are sent.
            let Some(dispatch) = link.dispatch(entry_id).await? else {
                continue;
            };
            let result = self.apply(&dispatch).await;
            if let Err(err) = &result {
                warn!(entry_id, error = %err, "remote apply failed");
            }
            let outcome = link.complete(entry_id, result).await?;
            debug!(entry_id, ?outcome, "entry processed");
        }

        let report = link.finish().await?;
        info!(
            applied = report.applied,
            retried = report.retried,
            exhausted = report.exhausted,
            "sync run finished"
        );
        Ok(Some(report))
    }

    async fn apply(&self, dispatch: &Dispatch) -> Result<RemoteAck, RemoteError> {
        let call = async {
            match dispatch {
                Dispatch::Create { record } => {
                    self.remote.apply_create(record).await.map(RemoteAck::Created)
                }
                Dispatch::Update { id, record } => self
                    .remote
                    .apply_update(id, record)
                    .await
                    .map(|()| RemoteAck::Updated),
                Dispatch::Profile { profile } => self
                    .remote
                    .apply_profile_update(profile)
                    .await
                    .map(|()| RemoteAck::ProfileUpdated),
            }
        };
        match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        }
    }
}
