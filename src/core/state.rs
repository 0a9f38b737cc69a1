use chrono::FixedOffset;
use hashbrown::HashMap;

use crate::{
    persist::{Collection, DurableStore, SESSION_KEY, StorageResult, StoreExt},
    record::{Record, UserProfile},
    types::UserId,
};

use super::{queue::MutationQueue, repository::RecordRepository};

/// Everything the client knows, owned by a single controller.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Logged-in user.
    pub session: Option<UserProfile>,
    /// Known users, including the session user.
    pub users: HashMap<UserId, UserProfile>,
    /// Record mirror.
    pub records: RecordRepository,
    /// Pending remote writes.
    pub queue: MutationQueue,
}

impl AppState {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            records: RecordRepository::new(offset),
            ..Self::default()
        }
    }

    /// Hydrates all four collections from `store`.
    pub fn load(store: &dyn DurableStore, offset: FixedOffset) -> StorageResult<Self> {
        let session = store.get_json::<UserProfile>(Collection::Session, SESSION_KEY)?;
        let users = store
            .scan_json::<UserProfile>(Collection::Users)?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let records = store.scan_json::<Record>(Collection::Records)?;
        let entries = store.scan_entries()?;

        Ok(Self {
            session,
            users,
            records: RecordRepository::from_records(records, offset),
            queue: MutationQueue::from_entries(entries),
        })
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        self.session.as_ref()
    }
}
