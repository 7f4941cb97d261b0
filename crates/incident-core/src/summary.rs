//! Aggregate views over the stored incident log.
//!
//! A summary is a pure function of the incidents it is computed from. It is
//! never cached or persisted; every read re-scans storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Incident, Severity, UNKNOWN_SCREEN};

/// Timestamp of one incident together with the screen it happened on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampWithScreen {
    pub timestamp_millis: i64,
    pub screen_name: Option<String>,
}

impl TimestampWithScreen {
    /// Label used when grouping by screen.
    pub fn screen_label(&self) -> &str {
        self.screen_name.as_deref().unwrap_or(UNKNOWN_SCREEN)
    }
}

/// Aggregated statistics over every stored incident.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentSummary {
    pub total_incidents: usize,
    /// Screen label to count. Incidents without a screen count as `"unknown"`.
    pub incidents_by_screen: BTreeMap<String, usize>,
    /// Only severities present in the data appear here.
    pub incidents_by_severity: BTreeMap<Severity, usize>,
    /// Every timestamp, newest first.
    pub incident_timestamps: Vec<i64>,
    /// Every timestamp with its screen, newest first.
    pub timestamps_with_screen: Vec<TimestampWithScreen>,
}

impl IncidentSummary {
    /// Compute the summary of `incidents`. Input order does not matter.
    pub fn from_incidents(incidents: &[Incident]) -> Self {
        let mut incidents_by_screen: BTreeMap<String, usize> = BTreeMap::new();
        let mut incidents_by_severity: BTreeMap<Severity, usize> = BTreeMap::new();

        for incident in incidents {
            *incidents_by_screen
                .entry(incident.screen_label().to_string())
                .or_insert(0) += 1;
            *incidents_by_severity.entry(incident.severity).or_insert(0) += 1;
        }

        let mut incident_timestamps: Vec<i64> =
            incidents.iter().map(|i| i.timestamp_millis).collect();
        incident_timestamps.sort_unstable_by(|a, b| b.cmp(a));

        let mut timestamps_with_screen: Vec<TimestampWithScreen> = incidents
            .iter()
            .map(|i| TimestampWithScreen {
                timestamp_millis: i.timestamp_millis,
                screen_name: i.screen_name.clone(),
            })
            .collect();
        timestamps_with_screen.sort_by(|a, b| b.timestamp_millis.cmp(&a.timestamp_millis));

        Self {
            total_incidents: incidents.len(),
            incidents_by_screen,
            incidents_by_severity,
            incident_timestamps,
            timestamps_with_screen,
        }
    }

    /// Screens sorted by incident count, highest first. Ties are ordered by label.
    pub fn screen_breakdown(&self) -> Vec<(String, usize)> {
        let mut screens: Vec<(String, usize)> = self
            .incidents_by_screen
            .iter()
            .map(|(screen, count)| (screen.clone(), *count))
            .collect();
        screens.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        screens
    }

    /// Severities present in the data, most severe first.
    pub fn severity_breakdown(&self) -> Vec<(Severity, usize)> {
        self.incidents_by_severity
            .iter()
            .rev()
            .map(|(severity, count)| (*severity, *count))
            .collect()
    }
}
