use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use incident_core::{
    now_millis, Incident, IncidentError, Metadata, Result, Severity, StorageType, TimeWindow,
    TrackerConfig,
};
use incident_storage::IncidentStorage;
use incident_tracker::IncidentTracker;

fn sqlite_config(dir: &tempfile::TempDir) -> TrackerConfig {
    TrackerConfig::new("3.1.0")
        .with_environment("integration")
        .with_storage_type(StorageType::Sqlite)
        .with_database_path(dir.path().join("incidents.db"))
}

fn meta(pairs: &[(&str, &str)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn sqlite_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = IncidentTracker::new();
    tracker.init(sqlite_config(&dir)).unwrap();

    tracker.track_screen("Home").unwrap();
    tracker
        .track_incident("NETWORK_001", Severity::High, "Fetch failed", None, meta(&[("userId", "42")]))
        .unwrap();
    tracker
        .track_incident("UI_002", Severity::Low, "Layout glitch", Some("Settings"), Metadata::new())
        .unwrap();
    tracker
        .track_incident("DB_003", Severity::Critical, "Write failed", None, Metadata::new())
        .unwrap();
    tracker.flush().await.unwrap();

    let summary = tracker.get_summary().await.unwrap();
    assert_eq!(summary.total_incidents, 3);
    assert_eq!(summary.incidents_by_screen["Home"], 1);
    assert_eq!(summary.incidents_by_screen["Settings"], 2);
    assert_eq!(summary.incidents_by_severity[&Severity::Critical], 1);
    assert_eq!(summary.incident_timestamps.len(), 3);
    for pair in summary.incident_timestamps.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
    assert_eq!(
        summary.screen_breakdown(),
        vec![("Settings".to_string(), 2), ("Home".to_string(), 1)]
    );
    assert!(dir.path().join("incidents.db").exists());
}

#[tokio::test]
async fn sqlite_retention_keeps_newest() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = IncidentTracker::new();
    tracker
        .init(sqlite_config(&dir).with_max_stored_incidents(3))
        .unwrap();

    for i in 0..5 {
        tracker
            .track_incident(&format!("E{}", i), Severity::Medium, "m", Some("Home"), Metadata::new())
            .unwrap();
    }
    tracker.flush().await.unwrap();

    let summary = tracker.get_summary().await.unwrap();
    assert_eq!(summary.total_incidents, 3);
    assert_eq!(summary.incidents_by_screen["Home"], 3);
}

#[tokio::test]
async fn sqlite_burst_is_stored_in_full() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = IncidentTracker::new();
    tracker
        .init(sqlite_config(&dir).with_max_stored_incidents(10_000))
        .unwrap();

    for i in 0..5_000 {
        tracker
            .track_incident(&format!("E{}", i), Severity::Low, "burst", Some("Home"), Metadata::new())
            .unwrap();
    }
    tracker.flush().await.unwrap();

    let summary = tracker.get_summary().await.unwrap();
    assert_eq!(summary.total_incidents, 5_000);
    assert_eq!(summary.incidents_by_screen["Home"], 5_000);
}

#[tokio::test]
async fn incidents_persist_across_reset_and_reinit() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = IncidentTracker::new();
    tracker.init(sqlite_config(&dir)).unwrap();
    tracker
        .track_incident("E1", Severity::Low, "before restart", Some("Home"), Metadata::new())
        .unwrap();
    tracker.flush().await.unwrap();

    tracker.reset();
    tracker.init(sqlite_config(&dir)).unwrap();
    assert_eq!(tracker.current_screen(), None);

    tracker
        .track_incident("E2", Severity::Low, "after restart", Some("Detail"), Metadata::new())
        .unwrap();
    tracker.flush().await.unwrap();

    let summary = tracker.get_summary().await.unwrap();
    assert_eq!(summary.total_incidents, 2);
    assert_eq!(summary.incidents_by_screen["Home"], 1);
    assert_eq!(summary.incidents_by_screen["Detail"], 1);
}

#[tokio::test]
async fn trackers_on_the_same_path_share_one_store() {
    let dir = tempfile::tempdir().unwrap();
    let first = IncidentTracker::new();
    let second = IncidentTracker::new();
    first.init(sqlite_config(&dir)).unwrap();
    second.init(sqlite_config(&dir)).unwrap();

    first
        .track_incident("E1", Severity::Low, "m", Some("A"), Metadata::new())
        .unwrap();
    second
        .track_incident("E2", Severity::Low, "m", Some("B"), Metadata::new())
        .unwrap();
    first.flush().await.unwrap();
    second.flush().await.unwrap();

    assert_eq!(first.get_summary().await.unwrap().total_incidents, 2);
    assert_eq!(second.get_summary().await.unwrap().total_incidents, 2);
}

#[tokio::test]
async fn clear_through_facade_empties_database() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = IncidentTracker::new();
    tracker.init(sqlite_config(&dir)).unwrap();
    for i in 0..3 {
        tracker
            .track_incident(&format!("E{}", i), Severity::Low, "m", None, Metadata::new())
            .unwrap();
    }
    tracker.clear().await.unwrap();

    let summary = tracker.get_summary().await.unwrap();
    assert_eq!(summary.total_incidents, 0);
}

#[tokio::test]
async fn timeline_over_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = IncidentTracker::new();
    tracker.init(sqlite_config(&dir)).unwrap();
    tracker.track_screen("Checkout").unwrap();
    tracker
        .track_incident("PAY_001", Severity::High, "Card declined", None, Metadata::new())
        .unwrap();
    tracker
        .track_incident("PAY_002", Severity::Medium, "Retry", Some("Cart"), Metadata::new())
        .unwrap();
    tracker.flush().await.unwrap();

    let timeline = tracker
        .get_timeline(TimeWindow::Last30Minutes, now_millis())
        .await
        .unwrap();
    assert_eq!(timeline.points.len(), 30);
    assert_eq!(timeline.incidents_in_range, 2);
    assert_eq!(timeline.max_count, 2);

    let current = timeline.points.last().unwrap();
    assert_eq!(current.minute_offset, 0);
    assert_eq!(current.by_screen["Checkout"], 1);
    assert_eq!(current.by_screen["Cart"], 1);

    // An hour from now both incidents have left the window.
    let later = tracker
        .get_timeline(TimeWindow::Last30Minutes, now_millis() + 60 * 60_000)
        .await
        .unwrap();
    assert_eq!(later.incidents_in_range, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tracking_stays_bounded() {
    let tracker = Arc::new(IncidentTracker::new());
    tracker
        .init(
            TrackerConfig::new("1.0.0")
                .with_storage_type(StorageType::InMemory)
                .with_max_stored_incidents(50),
        )
        .unwrap();

    let mut handles = Vec::new();
    for task in 0..8 {
        let tracker = Arc::clone(&tracker);
        handles.push(tokio::spawn(async move {
            let screen = format!("Screen{}", task);
            for i in 0..25 {
                tracker
                    .track_incident(
                        &format!("T{}_{}", task, i),
                        Severity::ALL[i % 4],
                        "concurrent",
                        Some(screen.as_str()),
                        Metadata::new(),
                    )
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    tracker.flush().await.unwrap();

    let summary = tracker.get_summary().await.unwrap();
    assert_eq!(summary.total_incidents, 50);
    let by_screen: usize = summary.incidents_by_screen.values().sum();
    assert_eq!(by_screen, 50);
}

/// Backend that fails or panics on selected error codes.
#[derive(Default)]
struct FlakyStorage {
    saved: Mutex<Vec<Incident>>,
}

#[async_trait]
impl IncidentStorage for FlakyStorage {
    async fn save(&self, incident: &Incident) -> Result<()> {
        match incident.error_code.as_str() {
            "FAIL" => Err(IncidentError::Storage("disk full".to_string())),
            "PANIC" => panic!("backend crashed"),
            _ => {
                self.saved.lock().unwrap().push(incident.clone());
                Ok(())
            }
        }
    }

    async fn get_all(&self) -> Result<Vec<Incident>> {
        Ok(self.saved.lock().unwrap().clone())
    }

    async fn clear_all(&self) -> Result<()> {
        self.saved.lock().unwrap().clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.saved.lock().unwrap().len())
    }
}

#[tokio::test]
async fn write_worker_survives_backend_failures() {
    let storage = Arc::new(FlakyStorage::default());
    let tracker = IncidentTracker::new();
    tracker
        .init_with_storage(TrackerConfig::new("1.0.0"), storage.clone())
        .unwrap();

    for code in ["OK_1", "FAIL", "OK_2", "PANIC", "OK_3"] {
        tracker
            .track_incident(code, Severity::High, "m", Some("Home"), Metadata::new())
            .unwrap();
    }
    tracker.flush().await.unwrap();

    let codes: Vec<String> = storage
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.error_code)
        .collect();
    assert_eq!(codes, vec!["OK_1", "OK_2", "OK_3"]);

    let summary = tracker.get_summary().await.unwrap();
    assert_eq!(summary.total_incidents, 3);
}

#[tokio::test]
async fn config_file_drives_initialization() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("tracker.toml");
    sqlite_config(&dir)
        .with_max_stored_incidents(2)
        .save(&config_path)
        .unwrap();

    let config = TrackerConfig::load(&config_path).unwrap();
    let tracker = IncidentTracker::new();
    tracker.init(config).unwrap();
    for i in 0..4 {
        tracker
            .track_incident(&format!("E{}", i), Severity::Low, "m", None, Metadata::new())
            .unwrap();
    }
    tracker.flush().await.unwrap();

    let loaded = tracker.config().unwrap();
    assert_eq!(loaded.app_version, "3.1.0");
    assert_eq!(loaded.max_stored_incidents, 2);
    assert_eq!(tracker.get_summary().await.unwrap().total_incidents, 2);
}
