use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{IncidentError, Result};

/// Default number of incidents kept before the oldest are evicted.
pub const DEFAULT_MAX_STORED_INCIDENTS: usize = 1_000;

/// Storage backend used to persist incidents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// Durable SQLite table. Survives restarts.
    #[default]
    Sqlite,
    /// Process-local ring buffer, lost on exit.
    InMemory,
}

/// Tracker configuration, supplied once at initialization.
///
/// Can be built in code with [`TrackerConfig::new`] or loaded from TOML:
///
/// ```toml
/// app_version = "1.4.2"
/// environment = "staging"
/// storage_type = "sqlite"
/// max_stored_incidents = 500
/// database_path = "/var/lib/myapp/incidents.db"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Host application version, attached to every incident.
    pub app_version: String,
    /// Host environment, attached to every incident.
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub storage_type: StorageType,
    /// Retention bound. Oldest incidents are evicted first.
    #[serde(default = "default_max_stored_incidents")]
    pub max_stored_incidents: usize,
    /// SQLite file used by the `sqlite` backend.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_environment() -> String {
    "debug".to_string()
}

fn default_max_stored_incidents() -> usize {
    DEFAULT_MAX_STORED_INCIDENTS
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data").join("incidents.db")
}

impl TrackerConfig {
    /// Configuration with defaults for everything but the app version.
    pub fn new(app_version: impl Into<String>) -> Self {
        Self {
            app_version: app_version.into(),
            environment: default_environment(),
            storage_type: StorageType::default(),
            max_stored_incidents: DEFAULT_MAX_STORED_INCIDENTS,
            database_path: default_database_path(),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_storage_type(mut self, storage_type: StorageType) -> Self {
        self.storage_type = storage_type;
        self
    }

    pub fn with_max_stored_incidents(mut self, max: usize) -> Self {
        self.max_stored_incidents = max;
        self
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Reject values the tracker cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_stored_incidents == 0 {
            return Err(IncidentError::Config(
                "max_stored_incidents must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TrackerConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to `fallback` if the
    /// file does not exist or is invalid.
    pub fn load_or(path: &Path, fallback: TrackerConfig) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                fallback
            }
        }
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}
