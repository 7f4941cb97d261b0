use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use incident_core::error::Result;
use incident_core::types::Incident;

use crate::traits::IncidentStorage;

/// In-memory incident storage for tests and ephemeral runs.
///
/// A deque behind an async mutex. `save` drops from the front until there is
/// room, then appends, so the length never exceeds `max_size`. A `max_size`
/// of zero is treated as one, matching [`SqliteIncidentStorage`](crate::SqliteIncidentStorage).
#[derive(Debug)]
pub struct InMemoryIncidentStorage {
    incidents: Mutex<VecDeque<Incident>>,
    max_size: usize,
}

impl InMemoryIncidentStorage {
    pub fn new(max_size: usize) -> Self {
        Self {
            incidents: Mutex::new(VecDeque::new()),
            max_size: max_size.max(1),
        }
    }
}

#[async_trait]
impl IncidentStorage for InMemoryIncidentStorage {
    async fn save(&self, incident: &Incident) -> Result<()> {
        let mut incidents = self.incidents.lock().await;
        while incidents.len() >= self.max_size {
            incidents.pop_front();
        }
        incidents.push_back(incident.clone());
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Incident>> {
        let incidents = self.incidents.lock().await;
        Ok(incidents.iter().cloned().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        self.incidents.lock().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.incidents.lock().await.len())
    }
}
