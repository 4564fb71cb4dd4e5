//! Schema creation.
//!
//! The baseline SQL is embedded at compile time via `include_str!` and is
//! written entirely with `IF NOT EXISTS`, so it runs on every open. There is
//! no versioning: the schema is fixed.

use rusqlite::Connection;

const BASELINE_SQL: &str = include_str!("schema/baseline.sql");

/// Create every table and index that does not exist yet.
pub fn ensure_schema(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(BASELINE_SQL)
        .map_err(|e| format!("Failed to apply baseline schema: {}", e))
}
