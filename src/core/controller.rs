use std::time::Duration;

use chrono::{Offset, Utc};
use tracing::{debug, info, warn};

use crate::{
    config::SyncConfig,
    op::{ActionKind, EntryPayload, EntryTarget, MutationEntry, entry_store_key},
    persist::{
        Collection, DurableStore, SESSION_KEY, StorageError, StorageResult, StoreWrite, encode_entry,
    },
    record::{Comment, ProfilePatch, Record, RecordDraft, UserProfile},
    remote::RemoteError,
    runtime::events::{FeedEvent, Notification},
    sync::{
        connectivity::{ConnectivityMonitor, Transition},
        engine::{Dispatch, EntryCheck, RemoteAck, RunReport, SyncOutcome, SyncState},
    },
    types::{EntryId, RecordId},
};

use super::{
    ids::IdMinter,
    repository::{RenameOutcome, RepoError},
    state::AppState,
};

type PendingWrites = Vec<StorageResult<StoreWrite>>;

/// Sole owner of [`AppState`] and the durable store.
///
/// Every local mutation is written through to the store before the call
/// returns. If the store fails, the controller keeps serving from memory for
/// the rest of the session and emits a [`Notification`].
///
/// The engine-facing steps (`begin_sync` .. `finish_sync`) implement one
/// queue pass. They always read the *current* record at send time; the
/// enqueue-time snapshot is only used when the record is no longer in memory,
/// so a late sync never clobbers a newer local edit.
pub struct Controller {
    state: AppState,
    store: Box<dyn DurableStore>,
    ids: IdMinter,
    connectivity: ConnectivityMonitor,
    config: SyncConfig,
    sync_state: SyncState,
    sync_requested: bool,
    degraded: bool,
    run: RunReport,
    /// Record as handed to the remote by the last `dispatch`.
    in_flight: Option<(EntryId, Record)>,
    outbox: Vec<FeedEvent>,
}

impl Controller {
    /// Loads state from `store`. A store that cannot be read leaves the
    /// controller empty and degraded rather than failing.
    pub fn open(store: Box<dyn DurableStore>, config: SyncConfig, online: bool) -> Self {
        let offset = config.day_offset().unwrap_or_else(|| Utc.fix());
        match AppState::load(store.as_ref(), offset) {
            Ok(state) => Self::from_state(state, store, config, online),
            Err(err) => {
                let mut controller = Self::from_state(AppState::new(offset), store, config, online);
                controller.degrade(&err);
                controller
            }
        }
    }

    /// Wraps an already-built state, e.g. a fabricated one in tests.
    pub fn from_state(
        state: AppState,
        store: Box<dyn DurableStore>,
        config: SyncConfig,
        online: bool,
    ) -> Self {
        let mut ids = IdMinter::new();
        for entry in state.queue.iter() {
            ids.observe_entry(entry.entry_id, entry.enqueued_at_ms);
        }
        let sync_requested = online && !state.queue.is_empty();
        Self {
            state,
            store,
            ids,
            connectivity: ConnectivityMonitor::new(online),
            config,
            sync_state: SyncState::Idle,
            sync_requested,
            degraded: false,
            run: RunReport::default(),
            in_flight: None,
            outbox: Vec::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn connectivity_mut(&mut self) -> &mut ConnectivityMonitor {
        &mut self.connectivity
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn set_online(&mut self, online: bool) -> Transition {
        self.connectivity.observe(online)
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    /// True once the store failed and writes stopped.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// True if local work queued while online is waiting for a run.
    /// Never reports while a run is active; the next run picks the work up.
    pub fn take_sync_request(&mut self) -> bool {
        if self.sync_state == SyncState::Running {
            return false;
        }
        std::mem::take(&mut self.sync_requested)
    }

    /// Asks for a run. Ignored while offline or while a run is active.
    pub fn request_sync(&mut self) {
        if self.sync_state == SyncState::Running {
            debug!("sync trigger ignored; run in progress");
            return;
        }
        if self.is_online() {
            self.sync_requested = true;
        }
    }

    pub fn drain_events(&mut self) -> Vec<FeedEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.state.records.get(id)
    }

    pub fn list(&self) -> Vec<Record> {
        self.state.records.newest_first_cloned()
    }

    pub fn queue_snapshot(&self) -> Vec<MutationEntry> {
        self.state.queue.dequeue_in_order()
    }

    pub fn login(&mut self, profile: UserProfile) {
        self.state.users.insert(profile.id.clone(), profile.clone());
        self.state.session = Some(profile.clone());
        self.commit(vec![
            StoreWrite::put_json(Collection::Session, SESSION_KEY, &profile),
            StoreWrite::put_json(Collection::Users, profile.id.clone(), &profile),
        ]);
        info!(user_id = %profile.id, "session started");
    }

    pub fn logout(&mut self) {
        if let Some(profile) = self.state.session.take() {
            info!(user_id = %profile.id, "session ended");
        }
        self.commit(vec![Ok(StoreWrite::delete(Collection::Session, SESSION_KEY))]);
    }

    /// Creates a record for the session user.
    ///
    /// Offline, the record gets a temporary id and a Create entry. Creating an
    /// activity also ticks matching mandatory items on the owner's plan for
    /// the same day; that plan edit follows the normal update path.
    pub fn create_record(&mut self, draft: RecordDraft) -> Result<Record, RepoError> {
        let owner = self.session_user()?;
        let created_at = draft.created_at.unwrap_or_else(Utc::now);
        self.state
            .records
            .check_singleton(&owner, &draft.body, created_at)?;

        let online = self.is_online();
        let id = self.ids.mint_record_id(online);
        let record = Record::new(id.clone(), owner.clone(), created_at, draft.body, !online);
        self.state.records.insert_new(record.clone())?;

        let mut writes = vec![record_put(&record)];
        if !online {
            let entry = self.enqueue_record(ActionKind::Create, &record);
            writes.push(encode_entry(&entry));
        }
        self.outbox.push(FeedEvent::RecordCreated { id: id.clone() });

        let kind = record.kind();
        if kind.completes_plan_items() {
            let day = record.activity_day(self.state.records.day_offset());
            for plan_id in self.state.records.plans_awaiting(&owner, kind, day) {
                let (_, plan_writes) = self.apply_local_update(&plan_id, |plan| {
                    plan.complete_mandatory(kind);
                })?;
                writes.extend(plan_writes);
            }
        }

        self.commit(writes);
        debug!(record_id = %id, online, "record created");
        Ok(record)
    }

    /// Applies `mutator` and persists the result.
    ///
    /// Queues an Update (or a Create for a temporary record whose Create is
    /// gone) when offline or when the record had failed to sync.
    pub fn update_record<F>(&mut self, id: &RecordId, mutator: F) -> Result<Record, RepoError>
    where
        F: FnOnce(&mut Record),
    {
        let (record, writes) = self.apply_local_update(id, mutator)?;
        self.commit(writes);
        Ok(record)
    }

    /// Removes the record and every queue entry that references it.
    pub fn delete_record(&mut self, id: &RecordId) -> Result<Record, RepoError> {
        let record = self
            .state
            .records
            .remove(id)
            .ok_or_else(|| RepoError::MissingRecord(id.clone()))?;
        let purged = self.state.queue.remove_for_record(id);

        let mut writes = vec![Ok(StoreWrite::delete(Collection::Records, id.as_str()))];
        writes.extend(purged.iter().map(|e| entry_delete(e.entry_id)));
        self.commit(writes);

        self.outbox.push(FeedEvent::RecordDeleted { id: id.clone() });
        debug!(record_id = %id, purged = purged.len(), "record deleted");
        Ok(record)
    }

    pub fn update_profile(&mut self, patch: ProfilePatch) -> Result<UserProfile, RepoError> {
        let session = self.state.session.as_mut().ok_or(RepoError::NoSession)?;
        patch.apply_to(session);
        let profile = session.clone();
        self.state.users.insert(profile.id.clone(), profile.clone());

        let mut writes = vec![
            StoreWrite::put_json(Collection::Session, SESSION_KEY, &profile),
            StoreWrite::put_json(Collection::Users, profile.id.clone(), &profile),
        ];
        if !self.is_online() {
            let entry = self.enqueue(
                ActionKind::ProfileUpdate,
                EntryTarget::Profile(profile.id.clone()),
                EntryPayload::Profile(profile.clone()),
            );
            writes.push(encode_entry(&entry));
        }
        self.commit(writes);

        self.outbox.push(FeedEvent::ProfileUpdated {
            user_id: profile.id.clone(),
        });
        Ok(profile)
    }

    pub fn toggle_like(&mut self, id: &RecordId) -> Result<Record, RepoError> {
        let user = self.session_user()?;
        self.update_record(id, |rec| rec.toggle_like(&user))
    }

    /// Appends a comment by the session user. Blank text is ignored.
    pub fn add_comment(&mut self, id: &RecordId, text: &str) -> Result<Record, RepoError> {
        let author_id = self.session_user()?;
        let text = text.trim();
        if text.is_empty() {
            return self
                .state
                .records
                .get_cloned(id)
                .ok_or_else(|| RepoError::MissingRecord(id.clone()));
        }
        let comment = Comment {
            id: self.ids.mint_comment_id(),
            author_id,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.update_record(id, move |rec| rec.comments.push(comment))
    }

    /// Flips a non-mandatory plan item.
    pub fn toggle_todo(&mut self, id: &RecordId, todo_id: &str) -> Result<Record, RepoError> {
        self.update_record(id, |rec| {
            rec.toggle_todo(todo_id);
        })
    }

    /// Re-queues a permanently failed record with a fresh retry budget.
    pub fn retry_failed(&mut self, id: &RecordId) -> Result<Record, RepoError> {
        let failed = self
            .state
            .records
            .get(id)
            .ok_or_else(|| RepoError::MissingRecord(id.clone()))?
            .sync_failed;
        if !failed {
            return Err(RepoError::NotFailed(id.clone()));
        }

        let action = self.resync_action(id);
        let record = self
            .state
            .records
            .mutate(id, |rec| {
                rec.sync_failed = false;
                rec.offline = true;
            })?
            .clone();
        let entry = self.enqueue_record(action, &record);
        self.commit(vec![record_put(&record), encode_entry(&entry)]);

        if self.is_online() {
            self.sync_requested = true;
        }
        self.outbox.push(FeedEvent::RecordUpdated { id: id.clone() });
        info!(record_id = %id, ?action, "manual sync retry queued");
        Ok(record)
    }

    /// Claims the run guard and snapshots the queue in FIFO order.
    pub fn begin_sync(&mut self) -> Option<Vec<EntryId>> {
        if self.sync_state == SyncState::Running {
            return None;
        }
        self.sync_state = SyncState::Running;
        self.sync_requested = false;
        self.run = RunReport::default();
        self.in_flight = None;

        let snapshot = self.state.queue.ids_in_order();
        self.outbox.push(FeedEvent::SyncStarted {
            pending: snapshot.len(),
        });
        Some(snapshot)
    }

    pub fn check_entry(&mut self, entry_id: EntryId) -> EntryCheck {
        let Some(entry) = self.state.queue.get(entry_id) else {
            return EntryCheck::Gone;
        };
        if entry.retry_count >= self.config.max_retries {
            self.exhaust(entry_id);
            return EntryCheck::Exhausted;
        }
        let waits_for_create = entry.action == ActionKind::Update
            && entry.record_id().is_some_and(RecordId::is_temporary)
            && self.state.queue.create_ahead_of(entry_id);
        if waits_for_create {
            self.run.deferred += 1;
            return EntryCheck::Deferred;
        }
        EntryCheck::Ready
    }

    /// Resolves what to send for `entry_id` from current state and remembers
    /// it, so `complete` can tell whether the record moved on meanwhile.
    pub fn dispatch(&mut self, entry_id: EntryId) -> Option<Dispatch> {
        let entry = self.state.queue.get(entry_id)?;
        match &entry.target {
            EntryTarget::Record(id) => {
                let record = self.state.records.get_cloned(id).or_else(|| match &entry.payload {
                    EntryPayload::Record(snapshot) => Some(snapshot.clone()),
                    EntryPayload::Profile(_) => None,
                })?;
                let dispatch = match entry.action {
                    ActionKind::Create => Dispatch::Create {
                        record: record.clone(),
                    },
                    ActionKind::Update => Dispatch::Update {
                        id: record.id.clone(),
                        record: record.clone(),
                    },
                    ActionKind::ProfileUpdate => {
                        warn!(entry_id, record_id = %id, "profile update aimed at a record; not sent");
                        return None;
                    }
                };
                self.in_flight = Some((entry_id, record));
                Some(dispatch)
            }
            EntryTarget::Profile(user_id) => {
                let profile = self
                    .state
                    .session
                    .as_ref()
                    .filter(|p| &p.id == user_id)
                    .cloned()
                    .or_else(|| match &entry.payload {
                        EntryPayload::Profile(snapshot) => Some(snapshot.clone()),
                        EntryPayload::Record(_) => None,
                    })?;
                Some(Dispatch::Profile { profile })
            }
        }
    }

    /// Folds one remote result back into state.
    pub fn complete(
        &mut self,
        entry_id: EntryId,
        result: Result<RemoteAck, RemoteError>,
    ) -> SyncOutcome {
        let sent = self
            .in_flight
            .take()
            .filter(|(id, _)| *id == entry_id)
            .map(|(_, rec)| rec);
        let Some(entry) = self.state.queue.get(entry_id).cloned() else {
            debug!(entry_id, "entry removed while its remote call was in flight");
            return match result {
                Ok(RemoteAck::Created(id)) => SyncOutcome::Applied(Some(id)),
                Ok(_) => SyncOutcome::Applied(None),
                Err(err) => SyncOutcome::Retriable(err),
            };
        };
        self.run.attempted += 1;
        match result {
            Ok(ack) => self.apply_success(entry, ack, sent.as_ref()),
            Err(err) => self.apply_failure(entry, err),
        }
    }

    /// Commits the records collection if anything changed and releases the guard.
    pub fn finish_sync(&mut self) -> RunReport {
        if self.run.records_changed && !self.degraded {
            let values: StorageResult<Vec<(String, Vec<u8>)>> = self
                .state
                .records
                .iter()
                .map(|rec| -> StorageResult<(String, Vec<u8>)> {
                    Ok((rec.id.to_string(), serde_json::to_vec(rec)?))
                })
                .collect();
            if let Err(err) = values.and_then(|v| self.store.put_all(Collection::Records, &v)) {
                self.degrade(&err);
            }
        }

        self.sync_state = SyncState::Idle;
        let report = std::mem::take(&mut self.run);
        self.outbox.push(FeedEvent::SyncFinished {
            report: report.clone(),
        });
        report
    }

    /// Moves `temporary` to `canonical` in memory, store and queue.
    ///
    /// Safe to repeat: a second call finds the record already renamed and
    /// the queue already retargeted.
    pub fn reconcile(
        &mut self,
        temporary: &RecordId,
        canonical: &RecordId,
        fallback: &EntryPayload,
    ) -> PendingWrites {
        let outcome = self.state.records.rename(temporary, canonical);
        if outcome == RenameOutcome::Missing {
            if let EntryPayload::Record(snapshot) = fallback {
                let mut rec = snapshot.clone();
                rec.id = canonical.clone();
                rec.offline = false;
                rec.sync_failed = false;
                self.state.records.upsert(rec);
            }
        }

        let mut writes = Vec::new();
        if temporary != canonical {
            writes.push(Ok(StoreWrite::delete(Collection::Records, temporary.as_str())));
        }
        if let Some(rec) = self.state.records.get(canonical) {
            writes.push(record_put(rec));
        }
        for moved in self.state.queue.retarget(temporary, canonical) {
            writes.push(encode_entry(&moved));
        }

        if outcome != RenameOutcome::AlreadyReconciled {
            self.run.records_changed = true;
            self.outbox.push(FeedEvent::RecordReconciled {
                temporary: temporary.clone(),
                canonical: canonical.clone(),
            });
            debug!(%temporary, %canonical, "record reconciled");
        }
        writes
    }

    fn apply_success(&mut self, entry: MutationEntry, ack: RemoteAck, sent: Option<&Record>) -> SyncOutcome {
        self.state.queue.remove(entry.entry_id);
        self.run.applied += 1;

        let mut writes = vec![entry_delete(entry.entry_id)];
        let canonical = match (ack, entry.record_id()) {
            (RemoteAck::Created(canonical), Some(temporary)) => {
                writes.extend(self.reconcile(temporary, &canonical, &entry.payload));
                writes.extend(self.requeue_if_edited(&canonical, sent));
                Some(canonical)
            }
            (RemoteAck::Created(canonical), None) => Some(canonical),
            (RemoteAck::Updated, Some(id)) => {
                if let Ok(rec) = self.state.records.mutate(id, |rec| {
                    rec.offline = rec.id.is_temporary();
                    rec.sync_failed = false;
                }) {
                    writes.push(record_put(rec));
                    self.run.records_changed = true;
                    self.outbox.push(FeedEvent::RecordUpdated { id: id.clone() });
                }
                writes.extend(self.requeue_if_edited(id, sent));
                None
            }
            (RemoteAck::Updated | RemoteAck::ProfileUpdated, _) => None,
        };

        self.commit(writes);
        SyncOutcome::Applied(canonical)
    }

    /// Keeps a record unsynced if it was edited while `sent` was on the wire.
    /// Queues an Update under `id` unless an entry already covers the edit.
    fn requeue_if_edited(&mut self, id: &RecordId, sent: Option<&Record>) -> PendingWrites {
        let Some(sent) = sent else {
            return Vec::new();
        };
        let edited = self
            .state
            .records
            .get(id)
            .is_some_and(|current| !same_content(sent, current));
        if !edited {
            return Vec::new();
        }

        let covered = self.state.queue.has_entries_for(id);
        let Ok(record) = self
            .state
            .records
            .mutate(id, |rec| {
                rec.offline = true;
                rec.sync_failed = false;
            })
            .cloned()
        else {
            return Vec::new();
        };
        self.run.records_changed = true;

        let mut writes = vec![record_put(&record)];
        if !covered {
            let entry = self.enqueue_record(ActionKind::Update, &record);
            writes.push(encode_entry(&entry));
            if self.is_online() {
                self.sync_requested = true;
            }
        }
        debug!(record_id = %id, covered, "record edited during its remote call");
        writes
    }

    fn apply_failure(&mut self, entry: MutationEntry, err: RemoteError) -> SyncOutcome {
        let attempts = entry.retry_count.saturating_add(1);
        let max = self.config.max_retries;
        if attempts >= max {
            self.exhaust(entry.entry_id);
            return SyncOutcome::Exhausted;
        }

        let writes: PendingWrites = self
            .state
            .queue
            .requeue_with_incremented_retry(entry.entry_id)
            .map(encode_entry)
            .into_iter()
            .collect();
        self.run.retried += 1;

        let item = self.item_label(&entry);
        self.outbox.push(FeedEvent::Notice(Notification::retry(
            &item,
            entry.record_id().cloned(),
            attempts,
            max,
            Duration::from_millis(self.config.retry_notice_ms),
        )));
        self.commit(writes);
        SyncOutcome::Retriable(err)
    }

    /// Terminal failure: drop the entry, flag the record, tell the user once.
    fn exhaust(&mut self, entry_id: EntryId) {
        let Some(entry) = self.state.queue.remove(entry_id) else {
            return;
        };
        self.run.exhausted += 1;
        let item = self.item_label(&entry);

        let mut writes = vec![entry_delete(entry_id)];
        if let Some(id) = entry.record_id() {
            if entry.action == ActionKind::Create {
                // The remote never saw this record; later edits ride on the manual retry.
                for dependent in self.state.queue.remove_for_record(id) {
                    writes.push(entry_delete(dependent.entry_id));
                }
            }

            let flagged = match self.state.records.mutate(id, mark_failed) {
                Ok(rec) => Some(rec.clone()),
                Err(_) => match &entry.payload {
                    EntryPayload::Record(snapshot) => {
                        let mut rec = snapshot.clone();
                        mark_failed(&mut rec);
                        self.state.records.upsert(rec.clone());
                        Some(rec)
                    }
                    EntryPayload::Profile(_) => None,
                },
            };
            if let Some(rec) = flagged {
                writes.push(record_put(&rec));
                self.run.records_changed = true;
                self.outbox.push(FeedEvent::RecordUpdated { id: rec.id });
            }
        }

        warn!(entry_id, action = ?entry.action, "sync retry budget exhausted");
        self.outbox.push(FeedEvent::Notice(Notification::permanent_failure(
            &item,
            entry.record_id().cloned(),
            Duration::from_millis(self.config.failure_notice_ms),
        )));
        self.commit(writes);
    }

    fn apply_local_update<F>(&mut self, id: &RecordId, mutator: F) -> Result<(Record, PendingWrites), RepoError>
    where
        F: FnOnce(&mut Record),
    {
        let was_failed = self
            .state
            .records
            .get(id)
            .ok_or_else(|| RepoError::MissingRecord(id.clone()))?
            .sync_failed;
        let online = self.is_online();
        let orphaned = id.is_temporary() && !self.state.queue.has_pending_create(id);
        let needs_entry = !online || was_failed || orphaned;
        let has_queued = self.state.queue.has_entries_for(id);

        let record = self
            .state
            .records
            .mutate(id, |rec| {
                mutator(rec);
                if needs_entry {
                    rec.offline = true;
                    rec.sync_failed = false;
                } else {
                    rec.offline = rec.id.is_temporary() || has_queued;
                }
            })?
            .clone();

        let mut writes = vec![record_put(&record)];
        if needs_entry {
            let action = self.resync_action(id);
            let entry = self.enqueue_record(action, &record);
            writes.push(encode_entry(&entry));
            if online {
                self.sync_requested = true;
            }
        }
        self.outbox.push(FeedEvent::RecordUpdated { id: id.clone() });
        Ok((record, writes))
    }

    /// Create for a temporary record without a pending Create, else Update.
    fn resync_action(&self, id: &RecordId) -> ActionKind {
        if id.is_temporary() && !self.state.queue.has_pending_create(id) {
            ActionKind::Create
        } else {
            ActionKind::Update
        }
    }

    fn enqueue_record(&mut self, action: ActionKind, record: &Record) -> MutationEntry {
        self.enqueue(
            action,
            EntryTarget::Record(record.id.clone()),
            EntryPayload::Record(record.clone()),
        )
    }

    fn enqueue(&mut self, action: ActionKind, target: EntryTarget, payload: EntryPayload) -> MutationEntry {
        let entry = MutationEntry {
            entry_id: self.ids.next_entry_id(),
            action,
            target,
            payload,
            enqueued_at_ms: self.ids.next_timestamp(),
            retry_count: 0,
        };
        self.state.queue.enqueue(entry.clone());
        entry
    }

    fn session_user(&self) -> Result<String, RepoError> {
        self.state
            .session
            .as_ref()
            .map(|p| p.id.clone())
            .ok_or(RepoError::NoSession)
    }

    fn item_label(&self, entry: &MutationEntry) -> String {
        entry
            .record_id()
            .and_then(|id| self.state.records.get(id))
            .map(Record::label)
            .unwrap_or_else(|| entry.label())
    }

    fn commit(&mut self, writes: PendingWrites) {
        if self.degraded {
            return;
        }
        let result = writes
            .into_iter()
            .collect::<StorageResult<Vec<_>>>()
            .and_then(|batch| self.store.write_batch(&batch));
        if let Err(err) = result {
            self.degrade(&err);
        }
    }

    fn degrade(&mut self, err: &StorageError) {
        warn!(error = %err, "durable store failed; continuing in memory only");
        self.degraded = true;
        self.outbox.push(FeedEvent::Notice(Notification::storage_degraded(
            &err.to_string(),
            Duration::from_millis(self.config.failure_notice_ms),
        )));
    }
}

/// Equal apart from identity and sync flags.
fn same_content(sent: &Record, current: &Record) -> bool {
    sent.owner_id == current.owner_id
        && sent.created_at == current.created_at
        && sent.body == current.body
        && sent.liked_by == current.liked_by
        && sent.comments == current.comments
}

fn mark_failed(rec: &mut Record) {
    rec.sync_failed = true;
    rec.offline = true;
}

fn record_put(rec: &Record) -> StorageResult<StoreWrite> {
    StoreWrite::put_json(Collection::Records, rec.id.as_str(), rec)
}

fn entry_delete(entry_id: EntryId) -> StorageResult<StoreWrite> {
    Ok(StoreWrite::delete(Collection::Queue, entry_store_key(entry_id)))
}
