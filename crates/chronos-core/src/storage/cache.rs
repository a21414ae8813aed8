//! SQLite-backed local durable cache.
//!
//! A single key/value table holds JSON documents under fixed keys:
//! - `chronos-timer-data`: counters, settings and the save date
//! - `chronos-tasks`: the task list and its last update
//! - `chronos-timer-runtime`: the live countdown (local only)

use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use super::data_dir;
use crate::error::{CoreError, ParseError, StorageError};
use crate::task::TaskRecord;
use crate::timer::{TimerRecord, TimerRuntime};

pub const TIMER_KEY: &str = "chronos-timer-data";
pub const TASKS_KEY: &str = "chronos-tasks";
pub const RUNTIME_KEY: &str = "chronos-timer-runtime";

pub struct LocalCache {
    conn: Connection,
}

impl LocalCache {
    /// Open the cache at `~/.config/chronos/chronos.db`.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("chronos.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let cache = Self { conn };
        cache.migrate()?;
        Ok(cache)
    }

    /// Open an in-memory cache (tests and throwaway sessions).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.migrate()?;
        Ok(cache)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Decode a stored document, distinguishing corrupt JSON from storage
    /// failures.
    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CoreError> {
        let Some(raw) = self.kv_get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|source| {
            CoreError::Parse(ParseError {
                key: key.to_string(),
                source,
            })
        })
    }

    pub fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        self.kv_set(key, &json)
    }

    /// Read a document, treating corrupt or unreadable entries as absent.
    fn read_or_empty<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.read_json(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    pub fn load_timer(&self) -> Option<TimerRecord> {
        self.read_or_empty(TIMER_KEY)
    }

    pub fn save_timer(&self, record: &TimerRecord) -> Result<(), StorageError> {
        self.write_json(TIMER_KEY, record)
    }

    pub fn load_tasks(&self) -> Option<TaskRecord> {
        self.read_or_empty(TASKS_KEY)
    }

    pub fn save_tasks(&self, record: &TaskRecord) -> Result<(), StorageError> {
        self.write_json(TASKS_KEY, record)
    }

    pub fn load_runtime(&self) -> Option<TimerRuntime> {
        self.read_or_empty(RUNTIME_KEY)
    }

    pub fn save_runtime(&self, runtime: &TimerRuntime) -> Result<(), StorageError> {
        self.write_json(RUNTIME_KEY, runtime)
    }
}
