//! Incident Storage crate - bounded incident persistence.
//!
//! Defines the `IncidentStorage` capability and its two backends: a WAL-mode
//! SQLite table with FIFO eviction, and an in-memory ring buffer used for
//! tests and ephemeral runs. Both enforce the retention bound themselves.

pub mod db;
pub mod entity;
pub mod memory;
pub mod migrations;
pub mod sqlite;
pub mod traits;

pub use db::Database;
pub use entity::IncidentRow;
pub use memory::InMemoryIncidentStorage;
pub use sqlite::SqliteIncidentStorage;
pub use traits::IncidentStorage;
