//! The tracker handle: initialization guard, current-screen context and
//! metadata enrichment.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use incident_core::config::{StorageType, TrackerConfig};
use incident_core::error::{IncidentError, Result};
use incident_core::summary::IncidentSummary;
use incident_core::timeline::{build_timeline, TimeWindow, Timeline};
use incident_core::types::{Metadata, Severity, META_APP_VERSION, META_ENVIRONMENT};
use incident_storage::{Database, InMemoryIncidentStorage, IncidentStorage, SqliteIncidentStorage};

use crate::repository::IncidentRepository;

struct Ready {
    config: TrackerConfig,
    repository: IncidentRepository,
}

enum TrackerState {
    Uninitialized,
    Ready(Arc<Ready>),
}

/// Entry point for recording incidents and reading summaries.
///
/// Create one per process at startup, call [`init`](Self::init) once, and
/// share it (typically as `Arc<IncidentTracker>`) with every call site. Every
/// tracking or read operation fails with [`IncidentError::NotInitialized`]
/// until `init` has succeeded.
///
/// ```no_run
/// # async fn run() -> incident_core::Result<()> {
/// use incident_core::{Metadata, Severity, TrackerConfig};
/// use incident_tracker::IncidentTracker;
///
/// let tracker = IncidentTracker::new();
/// tracker.init(TrackerConfig::new("1.0.0").with_environment("release"))?;
///
/// tracker.track_screen("Profile")?;
/// tracker.track_incident("NETWORK_001", Severity::High, "Fetch failed", None, Metadata::new())?;
///
/// tracker.flush().await?;
/// let summary = tracker.get_summary().await?;
/// assert_eq!(summary.incidents_by_screen["Profile"], 1);
/// # Ok(())
/// # }
/// ```
pub struct IncidentTracker {
    state: RwLock<TrackerState>,
    current_screen: RwLock<Option<String>>,
}

impl Default for IncidentTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl IncidentTracker {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TrackerState::Uninitialized),
            current_screen: RwLock::new(None),
        }
    }

    /// Initialize the tracker with the backend selected by `config`.
    ///
    /// Calling this again once initialized does nothing: state and
    /// configuration from the first call are kept. Concurrent first calls
    /// build exactly one backend. Must be called from within a Tokio runtime.
    pub fn init(&self, config: TrackerConfig) -> Result<()> {
        if self.is_initialized() {
            debug!("IncidentTracker already initialized");
            return Ok(());
        }

        let mut state = self.write_state();
        if matches!(*state, TrackerState::Ready(_)) {
            debug!("IncidentTracker already initialized");
            return Ok(());
        }

        config.validate()?;
        let storage: Arc<dyn IncidentStorage> = match config.storage_type {
            StorageType::Sqlite => {
                let db = Database::open_shared(&config.database_path)?;
                Arc::new(SqliteIncidentStorage::new(db, config.max_stored_incidents))
            }
            StorageType::InMemory => {
                Arc::new(InMemoryIncidentStorage::new(config.max_stored_incidents))
            }
        };

        Self::install(&mut state, config, storage)
    }

    /// Initialize the tracker with a caller-supplied backend.
    ///
    /// Same guard as [`init`](Self::init); `config.storage_type` is ignored.
    pub fn init_with_storage(
        &self,
        config: TrackerConfig,
        storage: Arc<dyn IncidentStorage>,
    ) -> Result<()> {
        let mut state = self.write_state();
        if matches!(*state, TrackerState::Ready(_)) {
            debug!("IncidentTracker already initialized");
            return Ok(());
        }

        config.validate()?;
        Self::install(&mut state, config, storage)
    }

    fn install(
        state: &mut TrackerState,
        config: TrackerConfig,
        storage: Arc<dyn IncidentStorage>,
    ) -> Result<()> {
        let repository = IncidentRepository::new(storage)?;
        info!(
            app_version = %config.app_version,
            environment = %config.environment,
            storage_type = ?config.storage_type,
            max_stored_incidents = config.max_stored_incidents,
            "IncidentTracker initialized"
        );
        *state = TrackerState::Ready(Arc::new(Ready { config, repository }));
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.read_state(), TrackerState::Ready(_))
    }

    /// Configuration passed to the successful `init`, if any.
    pub fn config(&self) -> Option<TrackerConfig> {
        match &*self.read_state() {
            TrackerState::Ready(ready) => Some(ready.config.clone()),
            TrackerState::Uninitialized => None,
        }
    }

    /// Screen that incidents without an explicit screen will be recorded on.
    pub fn current_screen(&self) -> Option<String> {
        self.current_screen
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set the current screen. Last write wins.
    pub fn track_screen(&self, screen_name: impl Into<String>) -> Result<()> {
        self.ready()?;
        let screen_name = screen_name.into();
        debug!(screen = %screen_name, "Screen tracked");
        *self.screen_mut() = Some(screen_name);
        Ok(())
    }

    /// Record an incident without blocking on persistence.
    ///
    /// With `screen_name` of `None` the current screen is used (which may
    /// itself be unset). Either way the current screen becomes the incident's
    /// screen. When neither is set the incident has no screen and the current
    /// screen stays unset rather than becoming `""`.
    ///
    /// `appVersion` and `environment` from the configuration are added to
    /// `metadata`, replacing caller values under those keys.
    pub fn track_incident(
        &self,
        error_code: &str,
        severity: Severity,
        message: &str,
        screen_name: Option<&str>,
        mut metadata: Metadata,
    ) -> Result<()> {
        let ready = self.ready()?;

        let effective_screen = {
            let mut current = self.screen_mut();
            if let Some(screen) = screen_name {
                *current = Some(screen.to_string());
            }
            current.clone()
        };

        metadata.insert(META_APP_VERSION.to_string(), ready.config.app_version.clone());
        metadata.insert(META_ENVIRONMENT.to_string(), ready.config.environment.clone());

        ready
            .repository
            .record_incident(error_code, severity, message, effective_screen, metadata);
        Ok(())
    }

    /// Aggregate every stored incident.
    ///
    /// Incidents tracked just before this call may still be queued; call
    /// [`flush`](Self::flush) first when they must be included.
    pub async fn get_summary(&self) -> Result<IncidentSummary> {
        let ready = self.ready()?;
        ready.repository.get_summary().await
    }

    /// Per-minute incident counts over `window`, ending at `now_millis`.
    pub async fn get_timeline(&self, window: TimeWindow, now_millis: i64) -> Result<Timeline> {
        let summary = self.get_summary().await?;
        Ok(build_timeline(
            &summary.timestamps_with_screen,
            window,
            now_millis,
        ))
    }

    /// Wait until every incident tracked before this call is persisted.
    pub async fn flush(&self) -> Result<()> {
        let ready = self.ready()?;
        ready.repository.flush().await
    }

    /// Delete every stored incident, after pending writes have been applied.
    pub async fn clear(&self) -> Result<()> {
        let ready = self.ready()?;
        ready.repository.clear().await
    }

    /// Return to the uninitialized state and forget the current screen.
    ///
    /// Writes already queued are still applied by the old worker. Meant for
    /// test isolation, not for production use.
    pub fn reset(&self) {
        *self.write_state() = TrackerState::Uninitialized;
        *self.screen_mut() = None;
        info!("IncidentTracker reset");
    }

    fn ready(&self) -> Result<Arc<Ready>> {
        match &*self.read_state() {
            TrackerState::Ready(ready) => Ok(Arc::clone(ready)),
            TrackerState::Uninitialized => Err(IncidentError::NotInitialized),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, TrackerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, TrackerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn screen_mut(&self) -> RwLockWriteGuard<'_, Option<String>> {
        self.current_screen
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for IncidentTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncidentTracker")
            .field("initialized", &self.is_initialized())
            .field("current_screen", &self.current_screen())
            .finish()
    }
}
