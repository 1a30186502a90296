//! User preferences with default-backed reads.
//!
//! Only keys that were explicitly set are persisted. Every read merges the
//! persisted map over [`default_preferences`], so new defaults show up for
//! existing users without a migration.

use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use crate::blob;
use crate::error::StoreResult;
use crate::kv::SharedStore;

/// Preference key to JSON value.
pub type Preferences = Map<String, Value>;

pub const THEME: &str = "theme";
pub const AUTO_SAVE: &str = "autoSave";
pub const SHOW_HISTORY: &str = "showHistory";
pub const ANIMATION_ENABLED: &str = "animationEnabled";
pub const DEFAULT_LAYOUT: &str = "defaultLayout";
pub const NODE_COLOR: &str = "nodeColor";
pub const EDGE_COLOR: &str = "edgeColor";

/// The fixed default table.
pub fn default_preferences() -> Preferences {
    let mut defaults = Map::new();
    defaults.insert(THEME.into(), json!("light"));
    defaults.insert(AUTO_SAVE.into(), json!(true));
    defaults.insert(SHOW_HISTORY.into(), json!(true));
    defaults.insert(ANIMATION_ENABLED.into(), json!(true));
    defaults.insert(DEFAULT_LAYOUT.into(), json!("force"));
    defaults.insert(NODE_COLOR.into(), json!("#4a90d9"));
    defaults.insert(EDGE_COLOR.into(), json!("#999999"));
    defaults
}

/// Settings store over one key.
#[derive(Clone)]
pub struct PreferenceStore {
    store: SharedStore,
    key: String,
}

impl PreferenceStore {
    pub fn new(store: SharedStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The persisted value for `key` if one was ever set (even `false`,
    /// `0`, `""` or `null`), else its default, else `None`.
    pub fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let persisted = self.persisted()?;
        Ok(persisted
            .get(key)
            .cloned()
            .or_else(|| default_preferences().remove(key)))
    }

    /// [`get`](Self::get) narrowed to a boolean.
    pub fn get_bool(&self, key: &str) -> StoreResult<Option<bool>> {
        Ok(self.get(key)?.and_then(|v| v.as_bool()))
    }

    /// [`get`](Self::get) narrowed to a string.
    pub fn get_string(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .get(key)?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Persist `value` under `key`. Defaults are never written alongside it.
    #[instrument(skip(self, value), fields(store_key = %self.key))]
    pub fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let mut persisted = self.persisted()?;
        persisted.insert(key.to_string(), value);
        blob::write_json(self.store.as_ref(), &self.key, &persisted)?;
        debug!(key, "preference set");
        Ok(())
    }

    /// Defaults overlaid with everything persisted; persisted values win.
    pub fn get_all(&self) -> StoreResult<Preferences> {
        let mut merged = default_preferences();
        merged.extend(self.persisted()?);
        Ok(merged)
    }

    /// Overwrite the persisted map with the default table.
    pub fn reset(&self) -> StoreResult<()> {
        blob::write_json(self.store.as_ref(), &self.key, &default_preferences())?;
        info!(key = %self.key, "preferences reset");
        Ok(())
    }

    fn persisted(&self) -> StoreResult<Preferences> {
        blob::read_or_default(self.store.as_ref(), &self.key)
    }
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::kv::MemoryKeyValueStore;

    const KEY: &str = "user_preferences";

    fn setup() -> (PreferenceStore, SharedStore) {
        let store = MemoryKeyValueStore::new().shared();
        (PreferenceStore::new(Arc::clone(&store), KEY), store)
    }

    #[test]
    fn default_table_has_seven_entries() {
        assert_eq!(default_preferences().len(), 7);
    }

    #[test]
    fn theme_defaults_to_light_then_follows_set() {
        let (prefs, _) = setup();
        assert_eq!(prefs.get(THEME).unwrap(), Some(json!("light")));

        prefs.set(THEME, json!("dark")).unwrap();
        assert_eq!(prefs.get(THEME).unwrap(), Some(json!("dark")));
        assert_eq!(prefs.get_string(THEME).unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn unknown_key_is_none() {
        let (prefs, _) = setup();
        assert_eq!(prefs.get("nonexistentKey").unwrap(), None);
    }

    #[test]
    fn falsy_persisted_values_win_over_defaults() {
        let (prefs, _) = setup();
        prefs.set(AUTO_SAVE, json!(false)).unwrap();
        prefs.set(NODE_COLOR, json!("")).unwrap();
        prefs.set(THEME, Value::Null).unwrap();

        assert_eq!(prefs.get_bool(AUTO_SAVE).unwrap(), Some(false));
        assert_eq!(prefs.get(NODE_COLOR).unwrap(), Some(json!("")));
        assert_eq!(prefs.get(THEME).unwrap(), Some(Value::Null));
    }

    #[test]
    fn set_persists_only_explicit_keys() {
        let (prefs, store) = setup();
        prefs.set("zoom", json!(1.5)).unwrap();

        let raw = store.get(KEY).unwrap().unwrap();
        assert_eq!(raw, r#"{"zoom":1.5}"#);
        assert_eq!(prefs.get("zoom").unwrap(), Some(json!(1.5)));
    }

    #[test]
    fn get_all_merges_defaults_under_persisted() {
        let (prefs, _) = setup();
        prefs.set(DEFAULT_LAYOUT, json!("circle")).unwrap();
        prefs.set("extra", json!(3)).unwrap();

        let all = prefs.get_all().unwrap();
        assert_eq!(all.len(), 8);
        assert_eq!(all[DEFAULT_LAYOUT], json!("circle"));
        assert_eq!(all[THEME], json!("light"));
        assert_eq!(all["extra"], json!(3));
    }

    #[test]
    fn corrupted_blob_yields_defaults() {
        let (prefs, store) = setup();
        store.set(KEY, "not json at all").unwrap();

        assert_eq!(prefs.get_all().unwrap(), default_preferences());
        assert_eq!(prefs.get(THEME).unwrap(), Some(json!("light")));
    }

    #[test]
    fn reset_restores_exact_default_table() {
        let (prefs, store) = setup();
        prefs.set(THEME, json!("dark")).unwrap();
        prefs.set("extra", json!(true)).unwrap();

        prefs.reset().unwrap();
        assert_eq!(prefs.get_all().unwrap(), default_preferences());

        let raw: Preferences = serde_json::from_str(&store.get(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw, default_preferences());
    }
}
