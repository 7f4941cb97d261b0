//! Incident id generation.

use std::sync::atomic::{AtomicI64, Ordering};

use incident_core::types::IncidentId;

/// Hands out ids derived from the creation time in milliseconds.
///
/// Two incidents created in the same millisecond would collide on the raw
/// clock, so each id is bumped to at least one past the previous one. Ids are
/// strictly increasing within a generator and equal the clock reading whenever
/// the clock has moved on.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide generator shared by every repository, so trackers writing
    /// to the same store never hand out the same id.
    pub fn shared() -> &'static IdGenerator {
        static SHARED: IdGenerator = IdGenerator {
            last: AtomicI64::new(0),
        };
        &SHARED
    }

    pub fn next_id(&self, now_millis: i64) -> IncidentId {
        let next = |prev: i64| now_millis.max(prev.saturating_add(1));
        // fetch_update only fails when the closure returns None.
        let prev = match self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| Some(next(prev)))
        {
            Ok(prev) | Err(prev) => prev,
        };
        IncidentId(next(prev))
    }
}
