//! SQLite-backed [`KeyValueStore`].
//!
//! Stores string key/value pairs in the `kv_store` table. This is what the
//! CLI persists through so projects, history and preferences survive across
//! invocations.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::StoreResult;
use crate::kv::{KeyValueStore, SharedStore, check_quota, entry_size};

/// Persistent key-value store over a migrated [`Database`].
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    db: Database,
    quota: Option<usize>,
}

impl SqliteKeyValueStore {
    /// Create a store backed by `db`. The database must already be migrated.
    pub fn new(db: Database) -> Self {
        Self { db, quota: None }
    }

    /// Limit the total bytes (keys plus values) the table may hold.
    pub fn with_quota(mut self, quota: Option<usize>) -> Self {
        self.quota = quota;
        self
    }

    /// Wrap in an `Arc` ready to share between datasets.
    pub fn shared(self) -> SharedStore {
        Arc::new(self)
    }

    /// List all keys, sorted.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        self.db.execute(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(keys)
        })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    #[instrument(skip(self))]
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.db.execute(|conn| {
            let result = conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            );
            match result {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let quota = self.quota;
        let now = Utc::now().timestamp();
        self.db.execute_mut(|conn| {
            let tx = conn.transaction()?;
            if quota.is_some() {
                let used: i64 = tx.query_row(
                    "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0) \
                     FROM kv_store",
                    [],
                    |row| row.get(0),
                )?;
                let previous: i64 = tx.query_row(
                    "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0) \
                     FROM kv_store WHERE key = ?1",
                    rusqlite::params![key],
                    |row| row.get(0),
                )?;
                check_quota(
                    key,
                    used.max(0) as usize,
                    previous.max(0) as usize,
                    entry_size(key, value),
                    quota,
                )?;
            }
            tx.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                rusqlite::params![key, value, now],
            )?;
            tx.commit()?;
            debug!(key, "kv_store updated");
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn remove(&self, key: &str) -> StoreResult<()> {
        self.db.execute(|conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])?;
            Ok(())
        })
    }

    fn clear(&self) -> StoreResult<()> {
        self.db.execute(|conn| {
            let removed = conn.execute("DELETE FROM kv_store", [])?;
            debug!(removed, "kv_store cleared");
            Ok(())
        })
    }

    fn used_bytes(&self) -> StoreResult<usize> {
        self.db.execute(|conn| {
            let used: i64 = conn.query_row(
                "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0) \
                 FROM kv_store",
                [],
                |row| row.get(0),
            )?;
            Ok(used.max(0) as usize)
        })
    }
}

// ── tests ────────────────────────────────────────────────────────────
