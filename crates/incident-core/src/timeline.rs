//! Per-minute incident buckets over a recent time window.
//!
//! Feeds time-series charts: one point per minute, newest last, with empty
//! minutes included so the series always has `window.minutes()` points.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::summary::TimestampWithScreen;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Look-back window for a timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Last15Minutes,
    #[default]
    Last30Minutes,
    Last60Minutes,
    Last90Minutes,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 4] = [
        TimeWindow::Last15Minutes,
        TimeWindow::Last30Minutes,
        TimeWindow::Last60Minutes,
        TimeWindow::Last90Minutes,
    ];

    pub fn minutes(&self) -> i64 {
        match self {
            TimeWindow::Last15Minutes => 15,
            TimeWindow::Last30Minutes => 30,
            TimeWindow::Last60Minutes => 60,
            TimeWindow::Last90Minutes => 90,
        }
    }

    /// Short display label, e.g. `"30 min"`.
    pub fn label(&self) -> String {
        format!("{} min", self.minutes())
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl std::str::FromStr for TimeWindow {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "15" => Ok(TimeWindow::Last15Minutes),
            "30" => Ok(TimeWindow::Last30Minutes),
            "60" => Ok(TimeWindow::Last60Minutes),
            "90" => Ok(TimeWindow::Last90Minutes),
            other => Err(format!(
                "Unknown time window: {} (expected 15, 30, 60 or 90)",
                other
            )),
        }
    }
}

/// Incidents that fell into one minute of the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    /// Minutes relative to now: `0` is the current minute, `-1` the one before.
    pub minute_offset: i64,
    pub count: usize,
    /// Per-screen counts, keyed by screen label.
    pub by_screen: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub window: TimeWindow,
    /// Oldest minute first.
    pub points: Vec<TimelinePoint>,
    pub incidents_in_range: usize,
    pub max_count: usize,
}

/// Bucket `entries` into per-minute points covering `window`, relative to `now_millis`.
///
/// An entry `d` milliseconds old lands in bucket `-(d / 60_000)`. Entries older
/// than the window are ignored, as is an entry exactly one full window old
/// (its bucket is one past the oldest point).
pub fn build_timeline(
    entries: &[TimestampWithScreen],
    window: TimeWindow,
    now_millis: i64,
) -> Timeline {
    let minutes = window.minutes();
    let cutoff = now_millis - minutes * MILLIS_PER_MINUTE;

    let mut buckets: BTreeMap<i64, Vec<&TimestampWithScreen>> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.timestamp_millis >= cutoff) {
        let offset = -((now_millis - entry.timestamp_millis) / MILLIS_PER_MINUTE);
        buckets.entry(offset).or_default().push(entry);
    }

    let points: Vec<TimelinePoint> = (-(minutes - 1)..=0)
        .map(|minute_offset| {
            let items = buckets.get(&minute_offset).map(Vec::as_slice).unwrap_or(&[]);
            let mut by_screen: BTreeMap<String, usize> = BTreeMap::new();
            for item in items {
                *by_screen.entry(item.screen_label().to_string()).or_insert(0) += 1;
            }
            TimelinePoint {
                minute_offset,
                count: items.len(),
                by_screen,
            }
        })
        .collect();

    let incidents_in_range = points.iter().map(|p| p.count).sum();
    let max_count = points.iter().map(|p| p.count).max().unwrap_or(0);

    Timeline {
        window,
        points,
        incidents_in_range,
        max_count,
    }
}
