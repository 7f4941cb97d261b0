//! Incident repository: id/timestamp assignment, background writes and summaries.
//!
//! Writes go through an unbounded queue drained by one worker task, so they are
//! applied to storage in submission order without blocking the caller and
//! without dropping any while the worker is busy. Reads
//! do not pass through the queue and may miss writes that are still queued;
//! `flush` waits for everything submitted before it.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use incident_core::error::{IncidentError, Result};
use incident_core::summary::IncidentSummary;
use incident_core::types::{now_millis, Incident, Metadata, Severity};
use incident_storage::IncidentStorage;

use crate::id::IdGenerator;

enum WriteCommand {
    Save(Incident),
    Flush(oneshot::Sender<()>),
    Clear(oneshot::Sender<Result<()>>),
}

/// Mediates between the tracker and an [`IncidentStorage`] backend.
///
/// Dropping the repository closes the queue; the worker finishes the writes
/// already queued and exits.
pub struct IncidentRepository {
    storage: Arc<dyn IncidentStorage>,
    sender: mpsc::UnboundedSender<WriteCommand>,
    ids: &'static IdGenerator,
}

impl IncidentRepository {
    /// Create a repository and spawn its write worker on the current Tokio runtime.
    ///
    /// Fails if called outside a runtime.
    pub fn new(storage: Arc<dyn IncidentStorage>) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            IncidentError::Config(format!(
                "Incident repository requires a Tokio runtime: {}",
                e
            ))
        })?;

        let (sender, receiver) = mpsc::unbounded_channel();
        runtime.spawn(run_write_worker(Arc::clone(&storage), receiver));
        info!("Incident write worker started");

        Ok(Self {
            storage,
            sender,
            ids: IdGenerator::shared(),
        })
    }

    /// Build an incident stamped with a fresh id and the current time and queue
    /// it for persistence. Returns immediately.
    ///
    /// The incident is only lost if the worker has already stopped, which
    /// happens once the runtime shuts down; a warning is logged then.
    pub fn record_incident(
        &self,
        error_code: &str,
        severity: Severity,
        message: &str,
        screen_name: Option<String>,
        metadata: Metadata,
    ) {
        let timestamp_millis = now_millis();
        let incident = Incident {
            id: self.ids.next_id(timestamp_millis),
            timestamp_millis,
            error_code: error_code.to_string(),
            severity,
            message: message.to_string(),
            screen_name,
            metadata,
        };
        let id = incident.id;

        match self.sender.send(WriteCommand::Save(incident)) {
            Ok(()) => debug!(%id, error_code, %severity, "Incident queued"),
            Err(_) => warn!(%id, error_code, "Write queue closed, dropping incident"),
        }
    }

    /// Load every stored incident and aggregate it.
    ///
    /// Aggregation runs on the blocking pool, off the runtime's worker threads.
    pub async fn get_summary(&self) -> Result<IncidentSummary> {
        let incidents = self.storage.get_all().await?;
        let summary =
            tokio::task::spawn_blocking(move || IncidentSummary::from_incidents(&incidents))
                .await
                .map_err(|e| IncidentError::Storage(format!("Summary task failed: {}", e)))?;
        debug!(total = summary.total_incidents, "Summary computed");
        Ok(summary)
    }

    /// Wait until every write queued before this call has been applied.
    pub async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(WriteCommand::Flush(ack))
            .map_err(|_| IncidentError::QueueClosed)?;
        done.await.map_err(|_| IncidentError::QueueClosed)
    }

    /// Delete every stored incident once the writes queued before this call
    /// have been applied.
    pub async fn clear(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(WriteCommand::Clear(ack))
            .map_err(|_| IncidentError::QueueClosed)?;
        done.await.map_err(|_| IncidentError::QueueClosed)?
    }
}

impl std::fmt::Debug for IncidentRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncidentRepository")
            .field("worker_running", &!self.sender.is_closed())
            .finish()
    }
}

/// Drain the write queue until every sender is gone.
///
/// Each save runs in its own task so that an error or panic in the backend
/// is logged and the worker moves on to the next command.
async fn run_write_worker(
    storage: Arc<dyn IncidentStorage>,
    mut receiver: mpsc::UnboundedReceiver<WriteCommand>,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            WriteCommand::Save(incident) => {
                let id = incident.id;
                let storage = Arc::clone(&storage);
                match tokio::spawn(async move { storage.save(&incident).await }).await {
                    Ok(Ok(())) => debug!(%id, "Incident persisted"),
                    Ok(Err(e)) => warn!(%id, error = %e, "Failed to persist incident"),
                    Err(e) => warn!(%id, error = %e, "Incident persist task aborted"),
                }
            }
            WriteCommand::Flush(ack) => {
                let _ = ack.send(());
            }
            WriteCommand::Clear(ack) => {
                let result = storage.clear_all().await;
                match &result {
                    Ok(()) => info!("Incident storage cleared"),
                    Err(e) => warn!(error = %e, "Failed to clear incident storage"),
                }
                let _ = ack.send(result);
            }
        }
    }
    debug!("Incident write worker stopped");
}
