pub mod memory;
pub mod sqlite;

use serde::{Serialize, de::DeserializeOwned};

use crate::op::{ENTRY_FORMAT_VERSION, MutationEntry, StoredEntryEnvelope};

/// Logical collections of the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Current session identity, under [`SESSION_KEY`].
    Session,
    /// User directory keyed by user id.
    Users,
    /// Records keyed by record id.
    Records,
    /// Mutation queue keyed by zero-padded entry id.
    Queue,
}

impl Collection {
    /// Stable name used as the storage key prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Users => "users",
            Self::Records => "records",
            Self::Queue => "queue",
        }
    }
}

/// Key of the current user inside [`Collection::Session`].
pub const SESSION_KEY: &str = "current";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("unsupported entry format version {0}")]
    UnsupportedFormat(u16),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Put {
        collection: Collection,
        key: String,
        value: Vec<u8>,
    },
    Delete {
        collection: Collection,
        key: String,
    },
}

impl StoreWrite {
    pub fn put_json<T: Serialize + ?Sized>(
        collection: Collection,
        key: impl Into<String>,
        value: &T,
    ) -> StorageResult<Self> {
        Ok(Self::Put {
            collection,
            key: key.into(),
            value: serde_json::to_vec(value)?,
        })
    }

    pub fn delete(collection: Collection, key: impl Into<String>) -> Self {
        Self::Delete {
            collection,
            key: key.into(),
        }
    }
}

/// Crash-safe key-value store: every call commits all of its writes or none.
pub trait DurableStore: Send {
    fn get(&self, collection: Collection, key: &str) -> StorageResult<Option<Vec<u8>>>;
    fn scan(&self, collection: Collection) -> StorageResult<Vec<(String, Vec<u8>)>>;
    fn write_batch(&mut self, writes: &[StoreWrite]) -> StorageResult<()>;
    /// Atomically replaces the whole collection with `values`.
    fn put_all(&mut self, collection: Collection, values: &[(String, Vec<u8>)]) -> StorageResult<()>;

    fn put(&mut self, collection: Collection, key: &str, value: &[u8]) -> StorageResult<()> {
        self.write_batch(&[StoreWrite::Put {
            collection,
            key: key.to_string(),
            value: value.to_vec(),
        }])
    }

    fn delete(&mut self, collection: Collection, key: &str) -> StorageResult<()> {
        self.write_batch(&[StoreWrite::delete(collection, key)])
    }
}

/// JSON helpers over any [`DurableStore`].
pub trait StoreExt: DurableStore {
    fn get_json<T: DeserializeOwned>(&self, collection: Collection, key: &str) -> StorageResult<Option<T>> {
        match self.get(collection, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T: DeserializeOwned>(&self, collection: Collection) -> StorageResult<Vec<T>> {
        self.scan(collection)?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(StorageError::from))
            .collect()
    }

    fn scan_entries(&self) -> StorageResult<Vec<MutationEntry>> {
        self.scan(Collection::Queue)?
            .into_iter()
            .map(|(_, bytes)| decode_entry_payload(&bytes))
            .collect()
    }
}

impl<S: DurableStore + ?Sized> StoreExt for S {}

pub fn encode_entry(entry: &MutationEntry) -> StorageResult<StoreWrite> {
    StoreWrite::put_json(
        Collection::Queue,
        entry.store_key(),
        &StoredEntryEnvelope::new(entry.clone()),
    )
}

pub fn decode_entry_payload(payload: &[u8]) -> StorageResult<MutationEntry> {
    if let Ok(envelope) = serde_json::from_slice::<StoredEntryEnvelope>(payload) {
        if envelope.format_version != ENTRY_FORMAT_VERSION {
            return Err(StorageError::UnsupportedFormat(envelope.format_version));
        }
        return Ok(envelope.entry);
    }

    // Entries written before the envelope existed hold a bare MutationEntry.
    Ok(serde_json::from_slice::<MutationEntry>(payload)?)
}
