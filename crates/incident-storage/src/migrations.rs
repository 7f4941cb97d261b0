//! Database schema migrations.
//!
//! Applies the initial schema: the incidents table and the schema_migrations
//! tracking table.

use rusqlite::Connection;
use tracing::info;

use incident_core::error::IncidentError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), IncidentError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| IncidentError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| IncidentError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
///
/// `seq` is the insertion order of a row and breaks ties between incidents
/// sharing a timestamp, both when listing and when evicting.
fn apply_v1(conn: &Connection) -> Result<(), IncidentError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS incidents (
            id                INTEGER PRIMARY KEY NOT NULL,
            seq               INTEGER NOT NULL,
            timestamp_millis  INTEGER NOT NULL CHECK (timestamp_millis >= 0),
            error_code        TEXT NOT NULL,
            severity          TEXT NOT NULL,
            message           TEXT NOT NULL,
            screen_name       TEXT,
            metadata_json     TEXT NOT NULL DEFAULT '{}'
        );

        CREATE INDEX IF NOT EXISTS idx_incidents_timestamp
            ON incidents (timestamp_millis, seq);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| IncidentError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
