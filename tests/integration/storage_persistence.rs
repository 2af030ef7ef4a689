//! Monitor persistence through the SQLite backend

use std::sync::Arc;

use pretty_assertions::assert_eq;
use pulse_monitor::{
    config::MonitorConfig,
    storage::{StorageBackend, sqlite::SqliteBackend},
};
use tempfile::tempdir;

use crate::helpers::{calm, cpu_spike, settle, spawn_monitor};

#[tokio::test]
async fn test_readings_and_alerts_are_persisted() {
    let temp_dir = tempdir().unwrap();
    let store = Arc::new(SqliteBackend::new(temp_dir.path().join("pulse.db")).await.unwrap());

    let t = spawn_monitor(
        store.clone(),
        vec!["oncall@example.com"],
        vec![calm(), cpu_spike(), calm()],
        MonitorConfig::default(),
    );
    t.monitor.initialize().await;

    let mut generated = Vec::new();
    for _ in 0..3 {
        generated.push(t.monitor.generate_once().await.unwrap());
        t.clock.advance(2_000);
    }
    settle().await;

    let history = store.recent_history(120).await.unwrap();
    assert_eq!(history, generated);

    let alerts = store.recent_alerts(20).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].message, "CPU high: 97.3%");
    assert_eq!(t.sender.sent().len(), 1);
}

#[tokio::test]
async fn test_history_survives_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("pulse.db");

    {
        let store = Arc::new(SqliteBackend::new(&db_path).await.unwrap());
        let t = spawn_monitor(store.clone(), vec![], vec![calm()], MonitorConfig::default());
        for _ in 0..5 {
            t.monitor.generate_once().await.unwrap();
            t.clock.advance(2_000);
        }
        store.close().await.unwrap();
    }

    let reopened = SqliteBackend::new(&db_path).await.unwrap();
    assert_eq!(reopened.recent_history(120).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_old_history_expires_after_initialize() {
    let temp_dir = tempdir().unwrap();
    let store = Arc::new(SqliteBackend::new(temp_dir.path().join("pulse.db")).await.unwrap());
    let t = spawn_monitor(store.clone(), vec![], vec![calm()], MonitorConfig::default());

    t.monitor.initialize().await;
    t.monitor.generate_once().await.unwrap();

    // a day and a bit later, the first reading is past the horizon
    t.clock.advance(25 * 60 * 60 * 1000);
    let fresh = t.monitor.generate_once().await.unwrap();

    let history = store.recent_history(120).await.unwrap();
    assert_eq!(history, vec![fresh]);
}
