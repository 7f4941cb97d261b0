use thiserror::Error;

/// Top-level error type for the incident tracker.
///
/// Storage backends map their driver errors into `Storage` at each call site;
/// configuration and serialization failures convert automatically so that the
/// `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IncidentError {
    #[error(
        "IncidentTracker has not been initialized. Call IncidentTracker::init(config) first, \
         typically during application startup."
    )]
    NotInitialized,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Write queue closed")]
    QueueClosed,
}

impl From<toml::de::Error> for IncidentError {
    fn from(err: toml::de::Error) -> Self {
        IncidentError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for IncidentError {
    fn from(err: toml::ser::Error) -> Self {
        IncidentError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for IncidentError {
    fn from(err: serde_json::Error) -> Self {
        IncidentError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for incident tracker operations.
pub type Result<T> = std::result::Result<T, IncidentError>;
