//! JSON blob read/write path shared by every dataset.
//!
//! Each dataset stores one serialized value under one key. Reads go through
//! [`read_json`], which separates "missing" (`Ok(None)`), "malformed"
//! (`Err(StoreError::Json)`) and backend failures. [`read_or_default`] then
//! applies the single recovery policy used everywhere: log the malformed
//! blob and substitute the empty value.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::kv::KeyValueStore;

/// Read and parse the blob under `key`.
pub(crate) fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> StoreResult<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Read the blob under `key`, falling back to `fallback()` when the key is
/// missing or its contents do not parse. Backend errors still propagate.
pub(crate) fn read_or_else<T, F>(
    store: &dyn KeyValueStore,
    key: &str,
    fallback: F,
) -> StoreResult<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match read_json(store, key) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(fallback()),
        Err(StoreError::Json(err)) => {
            warn!(key, %err, "discarding unreadable blob");
            Ok(fallback())
        }
        Err(err) => Err(err),
    }
}

pub(crate) fn read_or_default<T>(store: &dyn KeyValueStore, key: &str) -> StoreResult<T>
where
    T: DeserializeOwned + Default,
{
    read_or_else(store, key, T::default)
}

/// Serialize `value` compactly and write it under `key`.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::kv::MemoryKeyValueStore;

    #[test]
    fn missing_key_is_none() {
        let store = MemoryKeyValueStore::new();
        let value: Option<Vec<u32>> = read_json(&store, "k").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn malformed_blob_is_json_error() {
        let store = MemoryKeyValueStore::new();
        store.set("k", "{not json").unwrap();
        let err = read_json::<Vec<u32>>(&store, "k").unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }

    #[test]
    fn wrong_shape_falls_back_to_default() {
        let store = MemoryKeyValueStore::new();
        store.set("k", r#"{"a": 1}"#).unwrap();
        let value: Vec<u32> = read_or_default(&store, "k").unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn write_then_read() {
        let store = MemoryKeyValueStore::new();
        let mut map = BTreeMap::new();
        map.insert("x".to_string(), 3u32);
        write_json(&store, "k", &map).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some(r#"{"x":3}"#));
        let back: BTreeMap<String, u32> = read_or_default(&store, "k").unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn write_failure_propagates() {
        let store = MemoryKeyValueStore::with_quota(4);
        let err = write_json(&store, "key", &vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));
    }
}
