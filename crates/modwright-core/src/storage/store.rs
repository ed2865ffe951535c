//! The persistence port: a key/value store with per-entry expiry.
//!
//! Context snapshots are saved under a fixed key with a TTL; entries past
//! their TTL read back as absent (lazy expiry -- nothing sweeps the store).
//! The engine treats every store failure as non-fatal: the in-memory
//! context stays authoritative for the lifetime of the process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};

use crate::error::StorageError;
use crate::storage::data_dir;

/// Durable key/value store with per-entry expiry.
pub trait SnapshotStore: Send + Sync {
    /// Save `value` under `key`; the entry expires `ttl` from now.
    fn save(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError>;

    /// Load the value for `key`, or `None` when absent or expired.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
}

/// SQLite-backed snapshot store at `~/.config/modwright/modwright.db`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the store, creating the database file and schema if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir()
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?
            .join("modwright.db");
        Self::open_at(path)
    }

    /// Open the store at an explicit path.
    pub fn open_at(path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&path)
            .map_err(|source| StorageError::OpenFailed { path, source })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory store (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        let conn = self.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SnapshotStore for SqliteStore {
    fn save(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        let expires_at = Utc::now() + ttl;
        self.lock().execute(
            "INSERT OR REPLACE INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)",
            params![key, value, expires_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT value, expires_at FROM kv WHERE key = ?1")?;
        let row = stmt.query_row(params![key], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        });
        let (value, expires_at) = match row {
            Ok(pair) => pair,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let expires_at: DateTime<Utc> = expires_at
            .parse()
            .map_err(|e: chrono::ParseError| StorageError::CorruptEntry {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        if Utc::now() >= expires_at {
            // Lazy expiry: drop the row on the way out.
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            return Ok(None);
        }
        Ok(Some(value))
    }
}

/// In-memory snapshot store (for tests and ephemeral hosts).
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        let expires_at = Utc::now() + ttl;
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match entries.get(key) {
            Some((_, expires_at)) if Utc::now() >= *expires_at => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(store: &dyn SnapshotStore) {
        assert!(store.load("ctx").unwrap().is_none());
        store.save("ctx", "{\"a\":1}", Duration::hours(24)).unwrap();
        assert_eq!(store.load("ctx").unwrap().unwrap(), "{\"a\":1}");

        // Overwrite replaces wholesale.
        store.save("ctx", "{\"a\":2}", Duration::hours(24)).unwrap();
        assert_eq!(store.load("ctx").unwrap().unwrap(), "{\"a\":2}");
    }

    fn expiry(store: &dyn SnapshotStore) {
        store.save("gone", "x", Duration::zero()).unwrap();
        assert!(store.load("gone").unwrap().is_none());
        // And it stays gone.
        assert!(store.load("gone").unwrap().is_none());
    }

    #[test]
    fn sqlite_roundtrip_and_expiry() {
        let store = SqliteStore::open_memory().unwrap();
        roundtrip(&store);
        expiry(&store);
    }

    #[test]
    fn memory_roundtrip_and_expiry() {
        let store = MemoryStore::new();
        roundtrip(&store);
        expiry(&store);
    }

    #[test]
    fn sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modwright.db");
        {
            let store = SqliteStore::open_at(path.clone()).unwrap();
            store.save("ctx", "persisted", Duration::hours(1)).unwrap();
        }
        let store = SqliteStore::open_at(path).unwrap();
        assert_eq!(store.load("ctx").unwrap().unwrap(), "persisted");
    }
}
