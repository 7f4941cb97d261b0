//! SQLite-backed incident storage with FIFO eviction.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::Connection;
use tracing::debug;

use incident_core::error::{IncidentError, Result};
use incident_core::types::Incident;

use crate::db::Database;
use crate::entity::{IncidentRow, SELECT_COLUMNS};
use crate::traits::IncidentStorage;

/// Persistent storage on the `incidents` table.
///
/// `save` inserts (replacing on id collision) and trims the table back to
/// `max_size` rows in the same transaction, keeping the newest by
/// `(timestamp_millis, seq)`. A `max_size` of zero is treated as one. SQLite
/// work runs on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteIncidentStorage {
    db: Arc<Database>,
    max_size: usize,
}

impl SqliteIncidentStorage {
    pub fn new(db: Arc<Database>, max_size: usize) -> Self {
        Self {
            db,
            max_size: max_size.max(1),
        }
    }

    async fn run_blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| IncidentError::Storage(format!("Storage task failed: {}", e)))?
    }
}

fn insert_and_evict(conn: &Connection, row: &IncidentRow, max_size: usize) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| IncidentError::Storage(format!("Failed to begin transaction: {}", e)))?;

    tx.execute(
        "INSERT OR REPLACE INTO incidents
            (id, seq, timestamp_millis, error_code, severity, message, screen_name, metadata_json)
         VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM incidents), ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.id,
            row.timestamp_millis,
            row.error_code,
            row.severity,
            row.message,
            row.screen_name,
            row.metadata_json,
        ],
    )
    .map_err(|e| IncidentError::Storage(format!("Failed to save incident: {}", e)))?;

    let count: i64 = tx
        .query_row("SELECT COUNT(*) FROM incidents", [], |r| r.get(0))
        .map_err(|e| IncidentError::Storage(e.to_string()))?;

    let mut evicted = 0;
    if count as usize > max_size {
        evicted = tx
            .execute(
                "DELETE FROM incidents WHERE id NOT IN (
                    SELECT id FROM incidents
                    ORDER BY timestamp_millis DESC, seq DESC
                    LIMIT ?1
                 )",
                rusqlite::params![max_size as i64],
            )
            .map_err(|e| IncidentError::Storage(format!("Failed to evict incidents: {}", e)))?;
    }

    tx.commit()
        .map_err(|e| IncidentError::Storage(format!("Failed to commit incident: {}", e)))?;
    Ok(evicted)
}

#[async_trait]
impl IncidentStorage for SqliteIncidentStorage {
    async fn save(&self, incident: &Incident) -> Result<()> {
        let row = IncidentRow::from_incident(incident)?;
        let id = row.id;
        let max_size = self.max_size;
        let evicted = self
            .run_blocking(move |conn| insert_and_evict(conn, &row, max_size))
            .await?;
        if evicted > 0 {
            debug!(id, evicted, max_size, "Evicted oldest incidents");
        }
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Incident>> {
        let rows = self
            .run_blocking(|conn| {
                let sql = format!(
                    "SELECT {} FROM incidents ORDER BY timestamp_millis ASC, seq ASC",
                    SELECT_COLUMNS
                );
                let mut stmt = conn
                    .prepare(&sql)
                    .map_err(|e| IncidentError::Storage(e.to_string()))?;
                let rows = stmt
                    .query_map([], IncidentRow::from_sql_row)
                    .map_err(|e| IncidentError::Storage(e.to_string()))?;

                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(|e| IncidentError::Storage(e.to_string()))?);
                }
                Ok(out)
            })
            .await?;

        Ok(rows.into_iter().map(IncidentRow::into_incident).collect())
    }

    async fn clear_all(&self) -> Result<()> {
        let deleted = self
            .run_blocking(|conn| {
                conn.execute("DELETE FROM incidents", [])
                    .map_err(|e| IncidentError::Storage(format!("Failed to clear incidents: {}", e)))
            })
            .await?;
        debug!(deleted, "Cleared incidents");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        self.run_blocking(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM incidents", [], |r| r.get(0))
                .map_err(|e| IncidentError::Storage(e.to_string()))?;
            Ok(count as usize)
        })
        .await
    }
}
