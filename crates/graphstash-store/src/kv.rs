//! The key-value seam every dataset in this crate persists through.
//!
//! A [`KeyValueStore`] maps string keys to string values with synchronous
//! `get` / `set` / `remove` / `clear`. Writes are single-key blob
//! replacements and may fail with [`StoreError::QuotaExceeded`] when the
//! store is full. Two implementations ship with the crate:
//!
//! - [`MemoryKeyValueStore`] (this module): in-process `HashMap`.
//! - [`SqliteKeyValueStore`](crate::sqlite_kv::SqliteKeyValueStore): the
//!   on-disk store used by the CLI.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// Synchronous string key/value storage.
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, or `None` if the key is absent.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Remove every key.
    fn clear(&self) -> StoreResult<()>;

    /// Bytes currently charged against the quota (keys plus values).
    fn used_bytes(&self) -> StoreResult<usize>;
}

/// Shared handle to a store, as handed to every dataset.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Bytes an entry occupies for quota purposes.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Fail if replacing `key`'s current entry (`previous` bytes) with `next`
/// bytes would take `used` over `quota`.
pub(crate) fn check_quota(
    key: &str,
    used: usize,
    previous: usize,
    next: usize,
    quota: Option<usize>,
) -> StoreResult<()> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let needed = used.saturating_sub(previous) + next;
    if needed > quota {
        warn!(key, needed, quota, "write rejected: quota exceeded");
        return Err(StoreError::QuotaExceeded {
            key: key.to_string(),
            needed,
            quota,
        });
    }
    Ok(())
}

// ── memory store ─────────────────────────────────────────────────────

/// In-process store with an optional byte quota.
///
/// Behaves like browser local storage: a rejected write leaves the previous
/// value in place.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryKeyValueStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes once keys plus values exceed
    /// `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Wrap in an `Arc` ready to share between datasets.
    pub fn shared(self) -> SharedStore {
        Arc::new(self)
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| StoreError::Poisoned(format!("memory store: {e}")))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.lock()?;
        let used: usize = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
        let previous = entries.get(key).map(|v| entry_size(key, v)).unwrap_or(0);
        check_quota(key, used, previous, entry_size(key, value), self.quota)?;

        entries.insert(key.to_string(), value.to_string());
        debug!(key, bytes = value.len(), "memory store set");
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.lock()?.remove(key);
        debug!(key, "memory store remove");
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn used_bytes(&self) -> StoreResult<usize> {
        Ok(self.lock()?.iter().map(|(k, v)| entry_size(k, v)).sum())
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_returns_none() {
        let store = MemoryKeyValueStore::new();
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn set_overwrites() {
        let store = MemoryKeyValueStore::new();
        store.set("k", "old").unwrap();
        store.set("k", "new").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("new"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_missing_is_ok() {
        let store = MemoryKeyValueStore::new();
        store.remove("missing").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let store = MemoryKeyValueStore::new();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.used_bytes().unwrap(), 0);
    }

    #[test]
    fn quota_rejects_oversized_write_and_keeps_old_value() {
        let store = MemoryKeyValueStore::with_quota(10);
        store.set("k", "abc").unwrap();

        let err = store.set("k", "0123456789").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { needed: 11, quota: 10, .. }));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn quota_credits_the_replaced_entry() {
        let store = MemoryKeyValueStore::with_quota(10);
        store.set("k", "123456789").unwrap();
        // Replacing a 10-byte entry with another 10-byte entry fits.
        store.set("k", "987654321").unwrap();
        assert_eq!(store.used_bytes().unwrap(), 10);
    }

    #[test]
    fn quota_counts_other_keys() {
        let store = MemoryKeyValueStore::with_quota(8);
        store.set("a", "123").unwrap();
        store.set("b", "12").unwrap();
        assert!(store.set("c", "12").is_err());
    }
}
