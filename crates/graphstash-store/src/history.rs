//! Append-only activity log, newest first, with a fixed length cap.
//!
//! Unlike [`ProjectStorage`](crate::projects::ProjectStorage), order here is
//! insertion order: index 0 is always the entry added last, whatever the
//! clock said when it was added.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::blob;
use crate::clock::{Clock, Timekeeper, TimestampFormatter, iso_millis};
use crate::error::StoreResult;
use crate::kv::SharedStore;

/// Default cap on log entries.
pub const DEFAULT_MAX_ENTRIES: usize = 20;

/// What happened. Unknown kinds read back as [`ActivityKind::Other`] so a log
/// written by a newer client still parses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityKind {
    Save,
    Load,
    Delete,
    Import,
    Export,
    Generate,
    Analyze,
    Other(String),
}

impl ActivityKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Save => "save",
            Self::Load => "load",
            Self::Delete => "delete",
            Self::Import => "import",
            Self::Export => "export",
            Self::Generate => "generate",
            Self::Analyze => "analyze",
            Self::Other(kind) => kind,
        }
    }
}

impl From<String> for ActivityKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "save" => Self::Save,
            "load" => Self::Load,
            "delete" => Self::Delete,
            "import" => Self::Import,
            "export" => Self::Export,
            "generate" => Self::Generate,
            "analyze" => Self::Analyze,
            _ => Self::Other(kind),
        }
    }
}

impl From<&str> for ActivityKind {
    fn from(kind: &str) -> Self {
        Self::from(kind.to_string())
    }
}

impl From<ActivityKind> for String {
    fn from(kind: ActivityKind) -> Self {
        match kind {
            ActivityKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub description: String,
    /// Free-form detail; `{}` when there is none.
    #[serde(default = "empty_object")]
    pub payload: Value,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    pub display_timestamp: String,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Length-capped, newest-first activity trail over one key.
#[derive(Clone)]
pub struct ActivityHistory {
    store: SharedStore,
    key: String,
    max_entries: usize,
    timekeeper: Timekeeper,
}

impl ActivityHistory {
    pub fn new(store: SharedStore, key: impl Into<String>, max_entries: usize) -> Self {
        Self {
            store,
            key: key.into(),
            max_entries: max_entries.max(1),
            timekeeper: Timekeeper::default(),
        }
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

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Prepend an entry and drop whatever falls past `max_entries`.
    /// A `null` payload is stored as `{}`.
    #[instrument(skip(self, kind, description, payload), fields(key = %self.key, kind = %kind))]
    pub fn add(
        &self,
        kind: ActivityKind,
        description: impl Into<String>,
        payload: Value,
    ) -> StoreResult<LogEntry> {
        let mut entries = self.get_all()?;
        let stamp = self.timekeeper.stamp();
        let entry = LogEntry {
            id: stamp.id,
            kind,
            description: description.into(),
            payload: if payload.is_null() {
                empty_object()
            } else {
                payload
            },
            created_at: stamp.created_at,
            display_timestamp: stamp.display,
        };

        entries.insert(0, entry.clone());
        entries.truncate(self.max_entries);

        blob::write_json(self.store.as_ref(), &self.key, &entries)?;
        debug!(len = entries.len(), "activity recorded");
        Ok(entry)
    }

    /// All entries, newest first. Missing or unreadable blobs yield an empty
    /// log.
    pub fn get_all(&self) -> StoreResult<Vec<LogEntry>> {
        blob::read_or_default(self.store.as_ref(), &self.key)
    }

    /// The `n` newest entries.
    pub fn recent(&self, n: usize) -> StoreResult<Vec<LogEntry>> {
        let mut entries = self.get_all()?;
        entries.truncate(n);
        Ok(entries)
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.store.remove(&self.key)?;
        info!(key = %self.key, "activity history cleared");
        Ok(())
    }
}

impl fmt::Debug for ActivityHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityHistory")
            .field("key", &self.key)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

// ── tests ────────────────────────────────────────────────────────────
