//! Shared helper functions used across CLI subcommands.
//!
//! Includes tracing initialization, database path resolution, workspace
//! setup and input parsing.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use graphstash_store::{Database, SqliteKeyValueStore, StorageConfig, Workspace};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Database location when neither `--db` nor `GRAPHSTASH_DB` is given.
pub const DEFAULT_DB_PATH: &str = "data/graphstash.db";

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Pick the database path: `--db`, then `GRAPHSTASH_DB`, then the default.
pub fn resolve_db_path(cli_db: Option<PathBuf>) -> PathBuf {
    cli_db
        .or_else(|| std::env::var_os("GRAPHSTASH_DB").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
}

/// Open (creating if needed) the database at `db_path` and build a workspace
/// over it.
pub fn open_workspace(
    db_path: &Path,
    config: &StorageConfig,
) -> Result<(Workspace, SqliteKeyValueStore)> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let db = Database::open_and_migrate(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    let store = SqliteKeyValueStore::new(db).with_quota(config.quota_bytes);
    info!(path = %db_path.display(), "store initialized");

    Ok((Workspace::open(store.clone().shared(), config), store))
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Read a file, or stdin when `path` is `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Interpret a preference value typed on the command line: JSON if it
/// parses (`true`, `3`, `"x"`, `{...}`), otherwise the raw text as a string.
pub fn parse_pref_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}
