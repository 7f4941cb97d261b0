//! Incident Tracker crate - the write and read paths of the incident log.
//!
//! `IncidentTracker` is the handle the host application creates once at
//! startup and shares with every call site. It enriches incidents with the
//! configured app version and environment, hands them to the
//! `IncidentRepository` for background persistence, and computes summaries
//! on demand.

pub mod id;
pub mod repository;
pub mod tracker;

pub use id::IdGenerator;
pub use repository::IncidentRepository;
pub use tracker::IncidentTracker;
