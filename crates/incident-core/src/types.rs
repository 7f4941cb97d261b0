use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Label used in aggregations for incidents recorded without a screen.
pub const UNKNOWN_SCREEN: &str = "unknown";

/// Metadata key carrying the host application version.
pub const META_APP_VERSION: &str = "appVersion";

/// Metadata key carrying the host environment (debug, staging, ...).
pub const META_ENVIRONMENT: &str = "environment";

/// Free-form string metadata attached to an incident.
pub type Metadata = BTreeMap<String, String>;

// =============================================================================
// Severity
// =============================================================================

/// Severity level of an incident, ordered by ascending impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Minor issue, cosmetic or non-critical warning.
    Low,
    /// Functionality affected but a workaround exists.
    Medium,
    /// Core functionality impacted.
    High,
    /// Crash, data loss or complete feature breakdown.
    Critical,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Persisted name of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Parse a persisted severity name, falling back to `Low` for anything
    /// that is not a recognized name.
    pub fn from_name_or_default(name: &str) -> Severity {
        name.parse().unwrap_or(Severity::Low)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

// =============================================================================
// Incident
// =============================================================================

/// Unique incident identifier, derived from creation time in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(pub i64);

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single recorded incident. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    /// Milliseconds since the Unix epoch.
    pub timestamp_millis: i64,
    pub error_code: String,
    pub severity: Severity,
    pub message: String,
    /// Screen the incident happened on. `None` is not the same as `Some("")`.
    pub screen_name: Option<String>,
    pub metadata: Metadata,
}

impl Incident {
    /// Label used when grouping by screen.
    pub fn screen_label(&self) -> &str {
        self.screen_name.as_deref().unwrap_or(UNKNOWN_SCREEN)
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
