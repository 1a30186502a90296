//! Schema setup.
//!
//! The schema version lives in SQLite's `user_version` pragma. A database
//! below [`SCHEMA_VERSION`] gets the schema batch applied in one
//! transaction; anything at or above it is left alone.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// Version written to `user_version` once the schema is in place.
pub const SCHEMA_VERSION: u32 = 1;

/// String key/value blobs backing projects, history and preferences.
const SCHEMA: &str = r#"
    BEGIN IMMEDIATE;
    CREATE TABLE IF NOT EXISTS kv_store (
        key        TEXT PRIMARY KEY,
        value      TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    );
    PRAGMA user_version = 1;
    COMMIT;
"#;

/// Bring `conn` up to [`SCHEMA_VERSION`].
pub fn run_all(conn: &Connection) -> StoreResult<()> {
    let current = current_version(conn)?;
    if current >= SCHEMA_VERSION {
        debug!(current_version = current, "database schema is up to date");
        return Ok(());
    }

    info!(from = current, to = SCHEMA_VERSION, "applying schema");
    if let Err(e) = conn.execute_batch(SCHEMA) {
        warn!(%e, "schema setup failed, rolling back");
        let _ = conn.execute_batch("ROLLBACK;");
        return Err(StoreError::Migration {
            version: SCHEMA_VERSION,
            message: e.to_string(),
        });
    }
    Ok(())
}

/// The schema version recorded in the database, 0 for a fresh file.
pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| StoreError::Migration {
            version: 0,
            message: format!("failed to read user_version: {e}"),
        })
}

// ── tests ────────────────────────────────────────────────────────────
