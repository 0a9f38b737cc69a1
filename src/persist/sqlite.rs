//! SQLite-backed durable key-value store.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Transaction, params};

use super::{Collection, DurableStore, StorageResult, StoreWrite};
use crate::core::ids::now_ms;

/// SQLite implementation of [`crate::persist::DurableStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates a SQLite-backed store at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`: a process crash keeps
    /// every committed transaction.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite store.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Number of rows stored in `collection`.
    pub fn count(&self, collection: Collection) -> StorageResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM kv WHERE collection = ?1",
            params![collection.as_str()],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

impl DurableStore for SqliteStore {
    fn get(&self, collection: Collection, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE collection = ?1 AND key = ?2",
                params![collection.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn scan(&self, collection: Collection) -> StorageResult<Vec<(String, Vec<u8>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM kv WHERE collection = ?1 ORDER BY key ASC")?;
        let rows = stmt.query_map(params![collection.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn write_batch(&mut self, writes: &[StoreWrite]) -> StorageResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        let ts_ms = now_ms() as i64;
        for write in writes {
            match write {
                StoreWrite::Put {
                    collection,
                    key,
                    value,
                } => upsert(&tx, *collection, key, value, ts_ms)?,
                StoreWrite::Delete { collection, key } => {
                    tx.execute(
                        "DELETE FROM kv WHERE collection = ?1 AND key = ?2",
                        params![collection.as_str(), key],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn put_all(&mut self, collection: Collection, values: &[(String, Vec<u8>)]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        let ts_ms = now_ms() as i64;
        tx.execute(
            "DELETE FROM kv WHERE collection = ?1",
            params![collection.as_str()],
        )?;
        for (key, value) in values {
            upsert(&tx, collection, key, value, ts_ms)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn upsert(
    tx: &Transaction<'_>,
    collection: Collection,
    key: &str,
    value: &[u8],
    ts_ms: i64,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO kv(collection, key, value, updated_ms) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(collection, key) DO UPDATE SET value = excluded.value, updated_ms = excluded.updated_ms",
        params![collection.as_str(), key, value, ts_ms],
    )?;
    Ok(())
}
