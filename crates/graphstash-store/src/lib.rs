//! # graphstash-store
//!
//! Client-side persistence for the graph editor: named projects, an activity
//! log and user preferences, each stored as one JSON blob under one key of a
//! capacity-limited key-value store.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │  Workspace (explicit bundle, built from StorageConfig) │
//! ├────────────────┬─────────────────┬────────────────────┤
//! │ ProjectStorage │ ActivityHistory │ PreferenceStore    │
//! │ (evict by age) │ (truncate tail) │ (merge defaults)   │
//! ├────────────────┴─────────────────┴────────────────────┤
//! │  blob: JSON read/write, log-and-default on bad data    │
//! ├───────────────────────────────────────────────────────┤
//! │  KeyValueStore: Memory │ Sqlite (rusqlite + migrations)│
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use graphstash_store::{MemoryKeyValueStore, StorageConfig, Workspace};
//! use serde_json::json;
//!
//! let store = MemoryKeyValueStore::with_quota(5 * 1024 * 1024).shared();
//! let ws = Workspace::open(store, &StorageConfig::default());
//! ws.projects.save("triangle", json!({"nodes": "A,B,C", "edges": "A-B\nB-C\nC-A"}))?;
//! ```

mod blob;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod kv;
pub mod migration;
pub mod preferences;
pub mod projects;
pub mod sqlite_kv;
pub mod templates;
pub mod workspace;

// ── re-exports ───────────────────────────────────────────────────────

pub use clock::{Clock, FixedOffsetFormatter, MockClock, SystemClock, TimestampFormatter};
pub use config::StorageConfig;
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use history::{ActivityHistory, ActivityKind, LogEntry};
pub use kv::{KeyValueStore, MemoryKeyValueStore, SharedStore};
pub use preferences::{PreferenceStore, Preferences, default_preferences};
pub use projects::{Collection, ImportResult, ProjectStorage, Record, StorageStats};
pub use sqlite_kv::SqliteKeyValueStore;
pub use templates::GraphTemplate;
pub use workspace::Workspace;
