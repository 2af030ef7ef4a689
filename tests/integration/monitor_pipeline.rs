//! End-to-end behaviour of the generation loop against the in-memory store

use std::sync::Arc;

use pretty_assertions::assert_eq;
use pulse_monitor::{
    config::MonitorConfig,
    storage::{MemoryBackend, StorageBackend},
};

use crate::helpers::{calm, cpu_spike, overheating, settle, spawn_monitor};

#[tokio::test]
async fn test_alerting_reading_flows_to_store_and_mail() {
    let store = Arc::new(MemoryBackend::new());
    let t = spawn_monitor(
        store.clone(),
        vec!["oncall@example.com", "backup@example.com"],
        vec![calm(), overheating()],
        MonitorConfig::default(),
    );

    t.monitor.initialize().await;
    let first = t.monitor.generate_once().await.unwrap();
    t.clock.advance(2_000);
    let second = t.monitor.generate_once().await.unwrap();
    settle().await;

    assert!(!first.is_alert);
    assert_eq!(first.alert_message, None);
    assert!(second.is_alert);
    assert_eq!(
        second.alert_message.as_deref(),
        Some("CPU high: 92.0%; Temperature high: 88.4°C")
    );

    let history = store.recent_history(10).await.unwrap();
    assert_eq!(history, vec![first, second.clone()]);

    let alerts = store.recent_alerts(10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].timestamp, second.timestamp);
    assert_eq!(alerts[0].message, "CPU high: 92.0%; Temperature high: 88.4°C");

    let sent = t.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "oncall@example.com");
    assert_eq!(t.monitor.last_alert().await, Some(second));
}

#[tokio::test]
async fn test_calm_reading_keeps_last_alert() {
    let store = Arc::new(MemoryBackend::new());
    let t = spawn_monitor(
        store,
        vec!["oncall@example.com"],
        vec![cpu_spike(), calm()],
        MonitorConfig::default(),
    );

    let alert = t.monitor.generate_once().await.unwrap();
    t.clock.advance(2_000);
    t.monitor.generate_once().await.unwrap();

    assert_eq!(t.monitor.last_alert().await, Some(alert));
}

#[tokio::test]
async fn test_throttle_uses_configured_interval() {
    let store = Arc::new(MemoryBackend::new());
    let config = MonitorConfig {
        min_email_interval_ms: 10_000,
        ..MonitorConfig::default()
    };
    let t = spawn_monitor(store.clone(), vec!["oncall@example.com"], vec![cpu_spike()], config);

    // readings every 2s for 20s: mails at 0s, 10s and 20s
    for _ in 0..=10 {
        t.monitor.generate_once().await.unwrap();
        t.clock.advance(2_000);
    }
    settle().await;

    assert_eq!(t.sender.sent().len(), 3);
    assert_eq!(store.alerts_len().await, 11);
}

#[tokio::test]
async fn test_concurrent_readers_see_consistent_windows() {
    let store = Arc::new(MemoryBackend::new());
    let config = MonitorConfig {
        history_capacity: 50,
        ..MonitorConfig::default()
    };
    let t = spawn_monitor(store, vec![], vec![calm()], config);

    let writer = {
        let monitor = t.monitor.clone();
        let clock = t.clock.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                clock.advance(2_000);
                monitor.generate_once().await.unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let monitor = t.monitor.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    let window = monitor.recent_window(120).await;
                    assert!(window.len() <= 50);
                    assert!(window.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }

    assert_eq!(t.monitor.recent_window(120).await.len(), 50);
}
