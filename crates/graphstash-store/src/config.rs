//! Storage configuration.
//!
//! [`StorageConfig`] names the store key and capacity of every dataset and
//! the byte quota of the backing store. Defaults match what the editor has
//! always used, so an absent config file changes nothing. Values can be
//! overridden from the `[storage]` table of a TOML file:
//!
//! ```toml
//! [storage]
//! max_projects = 100
//! quota_bytes = 10485760   # 0 for no limit
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{DEFAULT_DISPLAY_OFFSET_SECS, DEFAULT_DISPLAY_PATTERN};
use crate::error::{StoreError, StoreResult};
use crate::history::DEFAULT_MAX_ENTRIES;
use crate::projects::DEFAULT_MAX_ITEMS;

/// Browser-style 5 MiB quota.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Keys, capacities and limits for a [`Workspace`](crate::workspace::Workspace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store key of the general project dataset.
    pub projects_key: String,
    /// Store key of the Hamming-graph project dataset.
    pub hamming_projects_key: String,
    pub history_key: String,
    pub preferences_key: String,

    /// Default: **50**.
    pub max_projects: usize,
    /// Default: **50**.
    pub max_hamming_projects: usize,
    /// Default: **20**.
    pub max_history_entries: usize,

    /// Byte quota of the backing store; `None` for unbounded. In TOML,
    /// `quota_bytes = 0` means unbounded.
    ///
    /// Default: **5 MiB**.
    pub quota_bytes: Option<usize>,

    /// Offset east of UTC, in seconds, used to render display timestamps.
    ///
    /// Default: **28 800** (UTC+08:00).
    pub display_offset_secs: i32,
    /// `chrono` format string for display timestamps.
    pub display_pattern: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            projects_key: "graph_projects".into(),
            hamming_projects_key: "hamming_projects".into(),
            history_key: "activity_history".into(),
            preferences_key: "user_preferences".into(),
            max_projects: DEFAULT_MAX_ITEMS,
            max_hamming_projects: DEFAULT_MAX_ITEMS,
            max_history_entries: DEFAULT_MAX_ENTRIES,
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
            display_offset_secs: DEFAULT_DISPLAY_OFFSET_SECS,
            display_pattern: DEFAULT_DISPLAY_PATTERN.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    storage: StorageConfig,
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `[storage]` table of a TOML document. Other tables are
    /// ignored; a missing table yields the defaults.
    pub fn from_toml_str(content: &str) -> StoreResult<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        file.storage.validate()
    }

    /// Load from `path`, falling back to defaults when the file does not
    /// exist. A file that exists but does not parse is an error.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading storage config");
                Self::from_toml_str(&content)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(StoreError::Config(format!(
                "failed to read {}: {err}",
                path.display()
            ))),
        }
    }

    pub fn with_max_projects(mut self, max: usize) -> Self {
        self.max_projects = max;
        self
    }

    pub fn with_max_hamming_projects(mut self, max: usize) -> Self {
        self.max_hamming_projects = max;
        self
    }

    pub fn with_max_history_entries(mut self, max: usize) -> Self {
        self.max_history_entries = max;
        self
    }

    pub fn with_quota_bytes(mut self, quota: Option<usize>) -> Self {
        self.quota_bytes = quota;
        self
    }

    fn validate(mut self) -> StoreResult<Self> {
        if self.quota_bytes == Some(0) {
            self.quota_bytes = None;
        }

        let keys = [
            &self.projects_key,
            &self.hamming_projects_key,
            &self.history_key,
            &self.preferences_key,
        ];
        if keys.iter().any(|k| k.is_empty()) {
            return Err(StoreError::Config("store keys must not be empty".into()));
        }
        for (i, key) in keys.iter().enumerate() {
            if keys[i + 1..].contains(key) {
                return Err(StoreError::Config(format!(
                    "store key {key:?} is used by more than one dataset"
                )));
            }
        }
        if self.max_projects == 0 || self.max_hamming_projects == 0 || self.max_history_entries == 0
        {
            return Err(StoreError::Config("capacities must be at least 1".into()));
        }
        Ok(self)
    }
}
