//! Incident Core crate - domain types, configuration, errors and aggregation.
//!
//! Shared by the storage backends and the tracker. Everything here is pure
//! apart from loading and saving the TOML configuration file.

pub mod config;
pub mod error;
pub mod summary;
pub mod timeline;
pub mod types;

pub use config::{StorageType, TrackerConfig};
pub use error::{IncidentError, Result};
pub use summary::{IncidentSummary, TimestampWithScreen};
pub use timeline::{build_timeline, TimeWindow, Timeline, TimelinePoint};
pub use types::*;
