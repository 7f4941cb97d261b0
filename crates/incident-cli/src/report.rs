//! Plain-text rendering of summaries and timelines.

use std::fmt::Write;

use chrono::DateTime;

use incident_core::{IncidentSummary, Timeline};

/// Number of most recent incidents listed under a summary.
const RECENT_LIMIT: usize = 10;

/// Widest bar drawn for a timeline point.
const BAR_WIDTH: usize = 40;

pub fn format_timestamp(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        None => millis.to_string(),
    }
}

pub fn render_summary(summary: &IncidentSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total incidents: {}", summary.total_incidents);
    if summary.total_incidents == 0 {
        return out;
    }

    let _ = writeln!(out, "\nBy screen:");
    for (screen, count) in summary.screen_breakdown() {
        let _ = writeln!(out, "  {:<24} {:>6}", screen, count);
    }

    let _ = writeln!(out, "\nBy severity:");
    for (severity, count) in summary.severity_breakdown() {
        let _ = writeln!(out, "  {:<24} {:>6}", severity.as_str(), count);
    }

    let _ = writeln!(out, "\nMost recent:");
    for entry in summary.timestamps_with_screen.iter().take(RECENT_LIMIT) {
        let _ = writeln!(
            out,
            "  {}  {}",
            format_timestamp(entry.timestamp_millis),
            entry.screen_label()
        );
    }
    out
}

pub fn render_timeline(timeline: &Timeline) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Last {}: {} incidents (peak {}/min)",
        timeline.window, timeline.incidents_in_range, timeline.max_count
    );

    for point in &timeline.points {
        let bar_len = if timeline.max_count == 0 {
            0
        } else {
            (point.count * BAR_WIDTH).div_ceil(timeline.max_count)
        };
        let _ = writeln!(
            out,
            "{:>4} min | {:<width$} {}",
            point.minute_offset,
            "#".repeat(bar_len),
            point.count,
            width = BAR_WIDTH
        );
    }
    out
}
