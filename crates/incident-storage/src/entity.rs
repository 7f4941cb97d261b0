//! Row representation of an incident and the mapping to and from the domain type.

use tracing::debug;

use incident_core::error::IncidentError;
use incident_core::types::{Incident, IncidentId, Metadata, Severity};

/// One row of the `incidents` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentRow {
    pub id: i64,
    pub timestamp_millis: i64,
    pub error_code: String,
    /// Severity name, e.g. `"HIGH"`.
    pub severity: String,
    pub message: String,
    pub screen_name: Option<String>,
    /// JSON object of string to string.
    pub metadata_json: String,
}

/// Column list matching [`IncidentRow::from_sql_row`].
pub(crate) const SELECT_COLUMNS: &str =
    "id, timestamp_millis, error_code, severity, message, screen_name, metadata_json";

impl IncidentRow {
    pub fn from_incident(incident: &Incident) -> Result<Self, IncidentError> {
        Ok(Self {
            id: incident.id.0,
            timestamp_millis: incident.timestamp_millis,
            error_code: incident.error_code.clone(),
            severity: incident.severity.as_str().to_string(),
            message: incident.message.clone(),
            screen_name: incident.screen_name.clone(),
            metadata_json: serde_json::to_string(&incident.metadata)?,
        })
    }

    /// Convert back to the domain type. Never fails: an unknown severity reads
    /// as `Low` and unparseable metadata reads as empty.
    pub fn into_incident(self) -> Incident {
        let severity = self.severity.parse::<Severity>().unwrap_or_else(|_| {
            debug!(id = self.id, severity = %self.severity, "Unknown severity, defaulting to LOW");
            Severity::Low
        });

        let metadata = match serde_json::from_str::<Option<Metadata>>(&self.metadata_json) {
            Ok(metadata) => metadata.unwrap_or_default(),
            Err(e) => {
                debug!(id = self.id, error = %e, "Unreadable incident metadata, using empty map");
                Metadata::new()
            }
        };

        Incident {
            id: IncidentId(self.id),
            timestamp_millis: self.timestamp_millis,
            error_code: self.error_code,
            severity,
            message: self.message,
            screen_name: self.screen_name,
            metadata,
        }
    }

    /// Read a row selected with [`SELECT_COLUMNS`].
    pub(crate) fn from_sql_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp_millis: row.get(1)?,
            error_code: row.get(2)?,
            severity: row.get(3)?,
            message: row.get(4)?,
            screen_name: row.get(5)?,
            metadata_json: row.get(6)?,
        })
    }
}
