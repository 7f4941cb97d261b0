use async_trait::async_trait;

use incident_core::error::Result;
use incident_core::types::Incident;

/// Storage capability for incidents.
///
/// Implementations own the retention bound: after `save` returns, the backend
/// holds at most its configured maximum, oldest incidents evicted first. Calls
/// on one instance are serialized by the backend itself.
#[async_trait]
pub trait IncidentStorage: Send + Sync {
    async fn save(&self, incident: &Incident) -> Result<()>;

    /// All stored incidents, oldest first.
    async fn get_all(&self) -> Result<Vec<Incident>>;

    async fn clear_all(&self) -> Result<()>;

    async fn count(&self) -> Result<usize>;
}
