use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Key holding `{ items: {..}, lists: {..} }`
pub const TODO_KEY: &str = "todo";
/// Key holding `{ list: .., options: {..} }`
pub const VIEW_OPTIONS_KEY: &str = "viewOptions";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create storage directory: {0}")]
    DirectoryError(String),
    #[error("Stored value for '{key}' cannot be read: {source}")]
    CorruptValue {
        key: String,
        source: serde_json::Error,
    },
    #[error("Write refused for '{0}': storage is full")]
    QuotaExceeded(String),
}

/// Durable string-keyed store of JSON values.
///
/// A key that was never written reads back as `Ok(None)`, not as an error.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the store file and initialize the schema
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;
        let store = SqliteStore { conn };
        store.initialize_schema()?;
        tracing::debug!(path = %path.display(), "opened sqlite store");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = SqliteStore {
            conn: Connection::open_in_memory()?,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|source| StoreError::CorruptValue {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value.to_string(), now],
        )?;
        Ok(())
    }
}

/// Process-local store, for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, Value>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every write fails, as a full browser store would
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Seed a value directly, bypassing the write-failure switch
    pub fn with_entry(self, key: &str, value: Value) -> Self {
        self.entries.borrow_mut().insert(key.to_string(), value);
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::QuotaExceeded(key.to_string()));
        }
        self.entries.borrow_mut().insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_key_reads_as_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get("nothing").unwrap().is_none());
        assert!(MemoryStore::new().get("nothing").unwrap().is_none());
    }

    #[test]
    fn sqlite_overwrites_existing_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set(TODO_KEY, &json!({"items": {}})).unwrap();
        store.set(TODO_KEY, &json!({"items": {"1": {"id": 1}}})).unwrap();
        assert_eq!(
            store.get(TODO_KEY).unwrap(),
            Some(json!({"items": {"1": {"id": 1}}}))
        );
    }

    #[test]
    fn sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("todo.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.set(VIEW_OPTIONS_KEY, &json!({"list": "all"})).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get(VIEW_OPTIONS_KEY).unwrap(), Some(json!({"list": "all"})));
    }

    #[test]
    fn corrupt_value_is_reported() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO kv (key, value, updated_at) VALUES ('todo', '{oops', 'now')",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.get(TODO_KEY),
            Err(StoreError::CorruptValue { .. })
        ));
    }

    #[test]
    fn failing_store_refuses_writes_but_serves_seeded_reads() {
        let store = MemoryStore::failing_writes().with_entry("k", json!(1));
        assert!(matches!(
            store.set("k", &json!(2)),
            Err(StoreError::QuotaExceeded(_))
        ));
        assert_eq!(store.get("k").unwrap(), Some(json!(1)));
    }
}
