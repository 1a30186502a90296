//! Named project storage with capacity-based eviction.
//!
//! A [`ProjectStorage`] keeps every [`Record`] of one dataset in a single
//! JSON object under one store key, keyed by record name. Saving past
//! `max_items` keeps only the `max_items` most recently created records;
//! the rest are discarded for good, including the record just saved if its
//! timestamp does not rank (a client clock set in the past can cause that).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::blob;
use crate::clock::{Clock, Timekeeper, TimestampFormatter, iso_millis};
use crate::error::StoreResult;
use crate::kv::SharedStore;

/// Default cap on records per dataset.
pub const DEFAULT_MAX_ITEMS: usize = 50;

/// One saved project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Creation time in milliseconds since the Unix epoch.
    pub id: i64,
    /// Unique within a dataset; saving the same name again overwrites.
    pub name: String,
    pub payload: Value,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    pub display_timestamp: String,
}

/// All records of one dataset, by name.
pub type Collection = BTreeMap<String, Record>;

/// Outcome of [`ProjectStorage::import`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportResult {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Size summary of one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub count: usize,
    /// Serialized size in KiB, two decimals (`"0.00"` for an empty set).
    pub size_kb: String,
}

/// Bounded, eviction-aware store of named records over one key.
#[derive(Clone)]
pub struct ProjectStorage {
    store: SharedStore,
    key: String,
    max_items: usize,
    timekeeper: Timekeeper,
}

impl ProjectStorage {
    /// Create a dataset under `key` holding at most `max_items` records
    /// (at least one).
    pub fn new(store: SharedStore, key: impl Into<String>, max_items: usize) -> Self {
        Self {
            store,
            key: key.into(),
            max_items: max_items.max(1),
            timekeeper: Timekeeper::default(),
        }
    }

    /// Create a dataset with [`DEFAULT_MAX_ITEMS`].
    pub fn with_default_capacity(store: SharedStore, key: impl Into<String>) -> Self {
        Self::new(store, key, DEFAULT_MAX_ITEMS)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.timekeeper.set_clock(clock);
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn TimestampFormatter>) -> Self {
        self.timekeeper.set_formatter(formatter);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Save `payload` under `name`, replacing any record of that name, then
    /// evict down to `max_items` by creation time. Always writes.
    ///
    /// Returns the record that was built, which may already have been
    /// evicted if its timestamp is older than every retained record.
    #[instrument(skip(self, payload), fields(key = %self.key))]
    pub fn save(&self, name: &str, payload: Value) -> StoreResult<Record> {
        let mut entries = self.read_entries()?;
        let stamp = self.timekeeper.stamp();
        let record = Record {
            id: stamp.id,
            name: name.to_string(),
            payload,
            created_at: stamp.created_at,
            display_timestamp: stamp.display,
        };

        let replaced = entries
            .insert(name.to_string(), serde_json::to_value(&record)?)
            .is_some();
        if entries.len() > self.max_items {
            entries = evict(entries, self.max_items);
            if !entries.contains_key(name) {
                warn!(name, "saved record ranked below the capacity cut and was evicted");
            }
        }

        blob::write_json(self.store.as_ref(), &self.key, &entries)?;
        debug!(name, replaced, count = entries.len(), "project saved");
        Ok(record)
    }

    /// Every readable record in the dataset. A missing or unparseable blob
    /// yields an empty collection; entries that are not records are skipped
    /// here but stay in the store.
    pub fn get_all(&self) -> StoreResult<Collection> {
        Ok(self
            .read_entries()?
            .into_iter()
            .filter_map(|(name, value)| decode(&name, value).map(|r| (name, r)))
            .collect())
    }

    pub fn get(&self, name: &str) -> StoreResult<Option<Record>> {
        Ok(self
            .read_entries()?
            .remove(name)
            .and_then(|value| decode(name, value)))
    }

    /// Record names, newest first.
    pub fn names(&self) -> StoreResult<Vec<String>> {
        let mut records: Vec<Record> = self.get_all()?.into_values().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records.into_iter().map(|r| r.name).collect())
    }

    /// Remove `name` if present and write the collection back either way.
    /// Returns whether an entry was removed.
    #[instrument(skip(self), fields(key = %self.key))]
    pub fn delete(&self, name: &str) -> StoreResult<bool> {
        let mut entries = self.read_entries()?;
        let removed = entries.remove(name).is_some();
        blob::write_json(self.store.as_ref(), &self.key, &entries)?;
        debug!(name, removed, "project delete");
        Ok(removed)
    }

    /// Drop the backing key entirely.
    pub fn clear(&self) -> StoreResult<()> {
        self.store.remove(&self.key)?;
        info!(key = %self.key, "project storage cleared");
        Ok(())
    }

    /// Pretty-printed JSON of the stored collection, unreadable entries
    /// included.
    pub fn export(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(&self.read_entries()?)?)
    }

    /// Replace the whole collection with `json`.
    ///
    /// Any valid JSON is accepted and written as-is: no shape check, no merge
    /// and no capacity enforcement (the next [`save`](Self::save) evicts).
    /// Invalid JSON leaves the store untouched. Never returns an error; both
    /// parse and write failures are reported in the result.
    #[instrument(skip(self, json), fields(key = %self.key, bytes = json.len()))]
    pub fn import(&self, json: &str) -> ImportResult {
        let value: Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "import rejected: invalid JSON");
                return ImportResult::failed(err.to_string());
            }
        };

        match blob::write_json(self.store.as_ref(), &self.key, &value) {
            Ok(()) => {
                info!("projects imported");
                ImportResult::ok()
            }
            Err(err) => {
                warn!(%err, "import failed to persist");
                ImportResult::failed(err.to_string())
            }
        }
    }

    /// Entry count and serialized size of the stored collection.
    pub fn get_stats(&self) -> StoreResult<StorageStats> {
        let entries = self.read_entries()?;
        let bytes = serde_json::to_string(&entries)?.len();
        Ok(StorageStats {
            count: entries.len(),
            size_kb: format!("{:.2}", bytes as f64 / 1024.0),
        })
    }

    /// The stored object, entry by entry, without decoding the records.
    fn read_entries(&self) -> StoreResult<Map<String, Value>> {
        blob::read_or_default(self.store.as_ref(), &self.key)
    }
}

impl std::fmt::Debug for ProjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStorage")
            .field("key", &self.key)
            .field("max_items", &self.max_items)
            .finish_non_exhaustive()
    }
}

/// Decode one stored entry, logging and skipping it if it is not a record.
fn decode(name: &str, value: Value) -> Option<Record> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(name, %err, "skipping unreadable project entry");
            None
        }
    }
}

/// `createdAt` of a stored entry, if it has a readable one.
fn created_at(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.get("createdAt")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Keep the `max_items` most recently created entries. Entries without a
/// readable `createdAt` rank oldest. The sort is stable, so equal timestamps
/// keep name order.
fn evict(entries: Map<String, Value>, max_items: usize) -> Map<String, Value> {
    let mut ranked: Vec<(Option<DateTime<Utc>>, String, Value)> = entries
        .into_iter()
        .map(|(name, value)| (created_at(&value), name, value))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    let dropped = ranked.split_off(max_items.min(ranked.len()));
    if !dropped.is_empty() {
        info!(
            evicted = dropped.len(),
            names = ?dropped.iter().map(|(_, name, _)| name.as_str()).collect::<Vec<_>>(),
            "evicting oldest projects"
        );
    }
    ranked
        .into_iter()
        .map(|(_, name, value)| (name, value))
        .collect()
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::clock::{FixedOffsetFormatter, MockClock};
    use crate::error::StoreError;
    use crate::kv::MemoryKeyValueStore;

    const KEY: &str = "graph_projects";

    fn setup(max_items: usize) -> (ProjectStorage, Arc<MockClock>, SharedStore) {
        let store = MemoryKeyValueStore::new().shared();
        let clock = MockClock::fixed().shared();
        let projects = ProjectStorage::new(Arc::clone(&store), KEY, max_items)
            .with_clock(clock.clone())
            .with_formatter(Arc::new(FixedOffsetFormatter::utc()));
        (projects, clock, store)
    }

    #[test]
    fn empty_store_reads_empty() {
        let (projects, _, _) = setup(5);
        assert!(projects.get_all().unwrap().is_empty());
        assert!(projects.get("missing").unwrap().is_none());
    }

    #[test]
    fn save_builds_stamped_record() {
        let (projects, clock, _) = setup(5);
        let record = projects.save("k4", json!({"nodes": "A,B,C,D"})).unwrap();

        assert_eq!(record.name, "k4");
        assert_eq!(record.id, clock.now().timestamp_millis());
        assert_eq!(record.created_at, clock.now());
        assert_eq!(record.display_timestamp, "2026/01/15 12:00:00");
        assert_eq!(projects.get("k4").unwrap(), Some(record));
    }

    #[test]
    fn persisted_shape_uses_camel_case_fields() {
        let (projects, _, store) = setup(5);
        projects.save("p", json!(1)).unwrap();

        let raw: Value = serde_json::from_str(&store.get(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw["p"]["createdAt"], "2026-01-15T12:00:00.000Z");
        assert_eq!(raw["p"]["displayTimestamp"], "2026/01/15 12:00:00");
        assert_eq!(raw["p"]["id"], 1_768_478_400_000_i64);
    }

    #[test]
    fn overwrite_keeps_count_and_refreshes_stamp() {
        let (projects, clock, _) = setup(5);
        projects.save("a", json!("v1")).unwrap();
        projects.save("b", json!("v1")).unwrap();
        clock.advance(Duration::seconds(5));
        let updated = projects.save("a", json!("v2")).unwrap();

        let all = projects.get_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"].payload, json!("v2"));
        assert_eq!(all["a"].created_at, updated.created_at);
        assert_eq!(projects.names().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn count_never_exceeds_cap() {
        let (projects, clock, _) = setup(3);
        for i in 0..10 {
            projects.save(&format!("p{i}"), json!(i)).unwrap();
            clock.advance(Duration::milliseconds(1));
            assert!(projects.get_all().unwrap().len() <= 3);
        }
    }

    #[test]
    fn overflow_keeps_most_recent_records() {
        let (projects, clock, _) = setup(3);
        for name in ["a", "b", "c", "d", "e"] {
            projects.save(name, json!(name)).unwrap();
            clock.advance(Duration::seconds(1));
        }

        let names: Vec<String> = projects.get_all().unwrap().into_keys().collect();
        assert_eq!(names, vec!["c", "d", "e"]);
    }

    #[test]
    fn save_with_clock_in_the_past_self_evicts() {
        let (projects, clock, _) = setup(2);
        projects.save("a", json!(1)).unwrap();
        clock.advance(Duration::seconds(1));
        projects.save("b", json!(2)).unwrap();

        clock.advance(Duration::days(-365));
        let stale = projects.save("stale", json!(3)).unwrap();

        assert_eq!(stale.name, "stale");
        assert!(projects.get("stale").unwrap().is_none());
        assert_eq!(projects.get_all().unwrap().len(), 2);
    }

    #[test]
    fn equal_timestamps_evict_deterministically() {
        let (projects, _, _) = setup(2);
        for name in ["c", "a", "b"] {
            projects.save(name, json!(null)).unwrap();
        }
        // Stable sort over name order keeps the first two names.
        let names: Vec<String> = projects.get_all().unwrap().into_keys().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn delete_present_and_absent() {
        let (projects, _, store) = setup(5);
        projects.save("a", json!(1)).unwrap();

        assert!(projects.delete("a").unwrap());
        assert!(!projects.delete("a").unwrap());
        // Deleting always writes back, even when nothing changed.
        assert_eq!(store.get(KEY).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn clear_removes_backing_key() {
        let (projects, _, store) = setup(5);
        projects.save("a", json!(1)).unwrap();
        projects.clear().unwrap();
        assert!(store.get(KEY).unwrap().is_none());
    }

    #[test]
    fn corrupted_blob_reads_as_empty_and_save_recovers() {
        let (projects, _, store) = setup(5);
        store.set(KEY, "{\"a\": oops").unwrap();

        assert!(projects.get_all().unwrap().is_empty());
        projects.save("fresh", json!(true)).unwrap();
        assert_eq!(projects.get_all().unwrap().len(), 1);
    }

    #[test]
    fn export_is_pretty_json() {
        let (projects, _, _) = setup(5);
        assert_eq!(projects.export().unwrap(), "{}");

        projects.save("a", json!({"x": 1})).unwrap();
        let exported = projects.export().unwrap();
        assert!(exported.contains('\n'));
        assert!(exported.contains("  \"a\": {"));
    }

    #[test]
    fn export_import_round_trip_ignores_cap() {
        let (source, clock, _) = setup(10);
        for name in ["a", "b", "c", "d"] {
            source.save(name, json!({"graph": name})).unwrap();
            clock.advance(Duration::seconds(1));
        }
        let exported = source.export().unwrap();

        let (target, _, _) = setup(2);
        let result = target.import(&exported);
        assert_eq!(result, ImportResult { success: true, error: None });
        assert_eq!(target.get_all().unwrap(), source.get_all().unwrap());
        assert_eq!(target.get_all().unwrap().len(), 4);
    }

    #[test]
    fn import_of_empty_export_yields_empty() {
        let (source, _, _) = setup(5);
        let (target, _, _) = setup(5);
        target.save("old", json!(1)).unwrap();

        assert!(target.import(&source.export().unwrap()).success);
        assert!(target.get_all().unwrap().is_empty());
    }

    fn imported_with_one_partial_record() -> String {
        json!({
            "good": {
                "id": 1_768_000_000_000_i64,
                "name": "good",
                "payload": {"nodes": "A,B"},
                "createdAt": "2026-01-10T00:00:00.000Z",
                "displayTimestamp": "2026/01/10 08:00:00"
            },
            "old": {
                "id": 1_700_000_000_000_i64,
                "name": "old",
                "payload": {},
                "createdAt": "2023-11-14T22:13:20.000Z"
            }
        })
        .to_string()
    }

    #[test]
    fn partial_record_does_not_hide_the_rest() {
        let (projects, _, _) = setup(5);
        assert!(projects.import(&imported_with_one_partial_record()).success);

        let all = projects.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["good"].payload, json!({"nodes": "A,B"}));
        assert!(projects.get("old").unwrap().is_none());
        assert_eq!(projects.get_stats().unwrap().count, 2);
    }

    #[test]
    fn save_after_partial_import_keeps_every_entry() {
        let (projects, _, store) = setup(5);
        assert!(projects.import(&imported_with_one_partial_record()).success);

        projects.save("new", json!(1)).unwrap();

        assert_eq!(projects.names().unwrap(), vec!["new", "good"]);
        let raw: Value = serde_json::from_str(&store.get(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw["old"]["createdAt"], "2023-11-14T22:13:20.000Z");
        assert!(projects.export().unwrap().contains("\"old\""));
    }

    #[test]
    fn unreadable_entries_rank_by_created_at_when_evicting() {
        let (projects, _, store) = setup(2);
        assert!(projects.import(&imported_with_one_partial_record()).success);

        projects.save("new", json!(1)).unwrap();

        let raw: Map<String, Value> =
            serde_json::from_str(&store.get(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw.keys().collect::<Vec<_>>(), vec!["good", "new"]);
    }

    #[test]
    fn import_invalid_json_preserves_prior_contents() {
        let (projects, _, store) = setup(5);
        projects.save("keep", json!(1)).unwrap();
        let before = store.get(KEY).unwrap();

        let result = projects.import("not json");
        assert!(!result.success);
        assert!(result.error.is_some());
        assert_eq!(store.get(KEY).unwrap(), before);
    }

    #[test]
    fn import_reports_write_failure_instead_of_erroring() {
        let store = MemoryKeyValueStore::with_quota(64).shared();
        let projects = ProjectStorage::new(store, KEY, 5);
        let big = format!("{{\"blob\": \"{}\"}}", "x".repeat(128));

        let result = projects.import(&big);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("quota"));
    }

    #[test]
    fn save_propagates_quota_failure_and_keeps_old_blob() {
        let store = MemoryKeyValueStore::with_quota(400).shared();
        let projects = ProjectStorage::new(Arc::clone(&store), KEY, 5)
            .with_clock(MockClock::fixed().shared());
        projects.save("small", json!(1)).unwrap();
        let before = store.get(KEY).unwrap();

        let err = projects.save("huge", json!("y".repeat(1000))).unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));
        assert_eq!(store.get(KEY).unwrap(), before);
    }

    #[test]
    fn stats_on_empty_store() {
        let (projects, _, _) = setup(5);
        let stats = projects.get_stats().unwrap();
        assert_eq!(stats, StorageStats { count: 0, size_kb: "0.00".into() });
    }

    #[test]
    fn stats_reflect_serialized_size() {
        let (projects, _, store) = setup(5);
        projects.save("a", json!("z".repeat(2048))).unwrap();

        let stats = projects.get_stats().unwrap();
        let bytes = store.get(KEY).unwrap().unwrap().len();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.size_kb, format!("{:.2}", bytes as f64 / 1024.0));
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let store = MemoryKeyValueStore::new().shared();
        assert_eq!(ProjectStorage::new(store, KEY, 0).max_items(), 1);
    }
}
