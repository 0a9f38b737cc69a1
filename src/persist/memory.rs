//! In-process store for ephemeral sessions and tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use hashbrown::HashMap;

use super::{Collection, DurableStore, StorageError, StorageResult, StoreWrite};

type Tables = HashMap<Collection, BTreeMap<String, Vec<u8>>>;

/// Map-backed [`DurableStore`]. Clones share the same tables, so a clone
/// outlives a dropped controller the way a file outlives a process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys in `collection`.
    pub fn len(&self, collection: Collection) -> usize {
        self.lock()
            .map(|t| t.get(&collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".to_string()))
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, collection: Collection, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .lock()?
            .get(&collection)
            .and_then(|t| t.get(key).cloned()))
    }

    fn scan(&self, collection: Collection) -> StorageResult<Vec<(String, Vec<u8>)>> {
        Ok(self
            .lock()?
            .get(&collection)
            .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn write_batch(&mut self, writes: &[StoreWrite]) -> StorageResult<()> {
        let mut tables = self.lock()?;
        for write in writes {
            match write {
                StoreWrite::Put {
                    collection,
                    key,
                    value,
                } => {
                    tables
                        .entry(*collection)
                        .or_default()
                        .insert(key.clone(), value.clone());
                }
                StoreWrite::Delete { collection, key } => {
                    if let Some(table) = tables.get_mut(collection) {
                        table.remove(key);
                    }
                }
            }
        }
        Ok(())
    }

    fn put_all(&mut self, collection: Collection, values: &[(String, Vec<u8>)]) -> StorageResult<()> {
        let table = values.iter().cloned().collect();
        self.lock()?.insert(collection, table);
        Ok(())
    }
}
