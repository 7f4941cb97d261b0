//! CLI argument definitions for `incidentctl`.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use incident_core::{Metadata, Severity, StorageType, TimeWindow, TrackerConfig};

/// incidentctl: record incidents and inspect the local incident log.
#[derive(Parser, Debug)]
#[command(name = "incidentctl", version, about)]
pub struct CliArgs {
    /// Path to the tracker configuration file (TOML).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path, overriding the configuration file.
    #[arg(long = "db", global = true)]
    pub db: Option<PathBuf>,

    /// Maximum number of incidents to keep.
    #[arg(long = "max-stored", global = true)]
    pub max_stored: Option<usize>,

    /// Keep incidents in memory only.
    #[arg(long = "in-memory", global = true)]
    pub in_memory: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a single incident.
    Record {
        /// Error code, e.g. NETWORK_001.
        #[arg(long = "code")]
        code: String,

        /// low, medium, high or critical.
        #[arg(long = "severity", value_parser = parse_severity)]
        severity: Severity,

        #[arg(long = "message")]
        message: String,

        /// Screen the incident happened on. Defaults to the current screen.
        #[arg(long = "screen")]
        screen: Option<String>,

        /// Extra metadata as key=value. May be repeated.
        #[arg(long = "meta", value_parser = parse_meta)]
        meta: Vec<(String, String)>,
    },

    /// Switch to a screen and record a burst of incidents on it.
    Simulate {
        #[arg(long = "screen")]
        screen: String,

        #[arg(long = "count", default_value_t = 10)]
        count: usize,
    },

    /// Print aggregated statistics.
    Summary {
        #[arg(long = "json")]
        json: bool,
    },

    /// Print per-minute incident counts.
    Timeline {
        /// Window in minutes: 15, 30, 60 or 90.
        #[arg(long = "window", default_value = "30")]
        window: TimeWindow,

        #[arg(long = "json")]
        json: bool,
    },

    /// Delete every stored incident.
    Clear,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > INCIDENT_CONFIG env var.
    /// Returns `None` when neither is set (use built-in defaults).
    pub fn resolve_config_path(&self) -> Option<PathBuf> {
        if let Some(ref p) = self.config {
            return Some(p.clone());
        }
        std::env::var("INCIDENT_CONFIG").ok().map(PathBuf::from)
    }

    /// Resolve the log filter directive.
    ///
    /// Priority: --log-level flag > RUST_LOG env var > "info".
    pub fn resolve_log_level(&self) -> String {
        if let Some(ref level) = self.log_level {
            return level.clone();
        }
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    }

    /// Build the tracker configuration: file (or defaults), then flag overrides.
    pub fn resolve_tracker_config(&self) -> TrackerConfig {
        let defaults = default_tracker_config();
        let config = match self.resolve_config_path() {
            Some(path) => TrackerConfig::load_or(&path, defaults),
            None => defaults,
        };
        self.apply_overrides(config)
    }

    fn apply_overrides(&self, mut config: TrackerConfig) -> TrackerConfig {
        if let Some(ref db) = self.db {
            config.database_path = db.clone();
        }
        if let Some(max) = self.max_stored {
            config.max_stored_incidents = max;
        }
        if self.in_memory {
            config.storage_type = StorageType::InMemory;
        }
        config
    }
}

/// Configuration used when no file is given or the file is unusable.
pub fn default_tracker_config() -> TrackerConfig {
    TrackerConfig::new(env!("CARGO_PKG_VERSION"))
}

/// Parse a severity name, case-insensitively.
pub fn parse_severity(s: &str) -> Result<Severity, String> {
    s.trim().to_ascii_uppercase().parse()
}

/// Parse a `key=value` metadata pair. The value may itself contain `=`.
pub fn parse_meta(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid metadata '{}': expected key=value", s)),
    }
}

/// Collect parsed pairs into metadata. Later duplicates win.
pub fn metadata_from_pairs(pairs: Vec<(String, String)>) -> Metadata {
    pairs.into_iter().collect()
}
