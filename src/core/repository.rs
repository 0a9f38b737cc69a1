use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use hashbrown::HashMap;

use crate::{
    record::{Record, RecordBody},
    types::{RecordId, TaskKind},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    #[error("record {0} not found")]
    MissingRecord(RecordId),
    #[error("record {0} already exists")]
    AlreadyExists(RecordId),
    #[error("a {kind} record already exists for {day} ({existing})")]
    DuplicateForDay {
        kind: TaskKind,
        day: NaiveDate,
        existing: RecordId,
    },
    #[error("no user is logged in")]
    NoSession,
    #[error("update may not change the id or owner of record {0}")]
    IdentityChanged(RecordId),
    #[error("record {0} has not failed to sync")]
    NotFailed(RecordId),
}

/// Result of folding a canonical id into the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The temporary record now lives under the canonical id.
    Renamed,
    /// Only the canonical record exists; nothing to do.
    AlreadyReconciled,
    /// Neither id is present.
    Missing,
}

/// In-memory mirror of all records, keyed by id.
#[derive(Debug, Clone)]
pub struct RecordRepository {
    records: HashMap<RecordId, Record>,
    offset: FixedOffset,
}

impl Default for RecordRepository {
    fn default() -> Self {
        Self::new(utc())
    }
}

impl RecordRepository {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            records: HashMap::new(),
            offset,
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = Record>, offset: FixedOffset) -> Self {
        let mut repo = Self::new(offset);
        for rec in records {
            repo.records.insert(rec.id.clone(), rec);
        }
        repo
    }

    /// Offset that decides calendar-day boundaries.
    pub fn day_offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn get_cloned(&self, id: &RecordId) -> Option<Record> {
        self.get(id).cloned()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Feed order: newest submission first, id as tie-breaker.
    pub fn newest_first(&self) -> Vec<&Record> {
        let mut out: Vec<&Record> = self.records.values().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn newest_first_cloned(&self) -> Vec<Record> {
        self.newest_first().into_iter().cloned().collect()
    }

    /// Rejects a second wake-up or plan for the same owner and day.
    ///
    /// Only the local mirror is consulted.
    pub fn check_singleton(
        &self,
        owner_id: &str,
        body: &RecordBody,
        created_at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        let kind = body.kind();
        if !kind.is_singleton_per_day() {
            return Ok(());
        }
        let day = body.activity_day(created_at, self.offset);
        match self
            .records
            .values()
            .find(|r| r.owner_id == owner_id && r.kind() == kind && r.activity_day(self.offset) == day)
        {
            Some(existing) => Err(RepoError::DuplicateForDay {
                kind,
                day,
                existing: existing.id.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn insert_new(&mut self, record: Record) -> Result<(), RepoError> {
        if self.records.contains_key(&record.id) {
            return Err(RepoError::AlreadyExists(record.id));
        }
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Inserts or replaces a record wholesale.
    pub fn upsert(&mut self, record: Record) {
        self.records.insert(record.id.clone(), record);
    }

    /// Applies `f` to the record; id and owner must survive unchanged.
    pub fn mutate<F>(&mut self, id: &RecordId, f: F) -> Result<&Record, RepoError>
    where
        F: FnOnce(&mut Record),
    {
        let rec = self
            .records
            .get_mut(id)
            .ok_or_else(|| RepoError::MissingRecord(id.clone()))?;
        let before = rec.clone();
        f(rec);
        if rec.id != before.id || rec.owner_id != before.owner_id {
            *rec = before;
            return Err(RepoError::IdentityChanged(id.clone()));
        }
        Ok(rec)
    }

    pub fn remove(&mut self, id: &RecordId) -> Option<Record> {
        self.records.remove(id)
    }

    /// Moves the record at `from` to `to` and marks it synced.
    ///
    /// Idempotent: a second call with the same pair is a no-op. If both ids are
    /// present the temporary copy is dropped and the canonical one refreshed
    /// from it.
    pub fn rename(&mut self, from: &RecordId, to: &RecordId) -> RenameOutcome {
        match self.records.remove(from) {
            Some(mut rec) => {
                rec.id = to.clone();
                rec.offline = false;
                rec.sync_failed = false;
                self.records.insert(to.clone(), rec);
                RenameOutcome::Renamed
            }
            None if from == to || self.records.contains_key(to) => RenameOutcome::AlreadyReconciled,
            None => RenameOutcome::Missing,
        }
    }

    /// Plans of `owner_id` on `day` with an open mandatory item for `kind`.
    pub fn plans_awaiting(&self, owner_id: &str, kind: TaskKind, day: NaiveDate) -> Vec<RecordId> {
        self.records
            .values()
            .filter(|r| r.owner_id == owner_id && r.activity_day(self.offset) == day)
            .filter(|r| match &r.body {
                RecordBody::DailyPlan { todos, .. } => todos
                    .iter()
                    .any(|t| t.mandatory_for == Some(kind) && !t.is_completed),
                _ => false,
            })
            .map(|r| r.id.clone())
            .collect()
    }

    /// Replaces the whole mirror.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = Record>) {
        self.records.clear();
        for rec in records {
            self.records.insert(rec.id.clone(), rec);
        }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}
