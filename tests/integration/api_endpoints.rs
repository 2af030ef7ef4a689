//! Integration tests for the read API
//!
//! Each test spawns the real server on a random port and talks to it
//! over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use pulse_monitor::{
    api::{ApiConfig, ApiState, spawn_api_server},
    config::MonitorConfig,
    storage::{MemoryBackend, StorageBackend},
};
use serde_json::Value;

use crate::helpers::{TestMonitor, calm, cpu_spike, spawn_monitor};

async fn spawn_test_api(history: usize) -> (SocketAddr, TestMonitor) {
    let store: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
    let t = spawn_monitor(
        store.clone(),
        vec!["oncall@example.com"],
        vec![calm(), calm(), cpu_spike(), calm()],
        MonitorConfig::default(),
    );

    for _ in 0..history {
        t.monitor.generate_once().await.unwrap();
        t.clock.advance(2_000);
    }

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        enable_cors: true,
    };

    let addr = spawn_api_server(config, ApiState::new(t.monitor.clone(), store))
        .await
        .unwrap();
    (addr, t)
}

async fn get_json(url: String) -> (StatusCode, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let (addr, _t) = spawn_test_api(0).await;

    let (status, json) = get_json(format!("http://{addr}/api/v1/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["timestamp"].is_string());
    assert_eq!(json["storage"]["healthy"], true);
}

#[tokio::test]
async fn test_server_status_returns_window_and_last_alert() {
    let (addr, _t) = spawn_test_api(6).await;

    let (status, json) = get_json(format!("http://{addr}/api/server-status?limit=3")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let data = &json["data"];
    let history = data["history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(data["latest"], history[2]);
    assert_eq!(data["lastAlert"]["isAlert"], true);
    assert_eq!(data["lastAlert"]["alertMessage"], "CPU high: 97.3%");
}

#[tokio::test]
async fn test_server_status_limit_is_clamped() {
    let (addr, _t) = spawn_test_api(4).await;

    let (_, json) = get_json(format!("http://{addr}/api/server-status?limit=0")).await;
    assert_eq!(json["data"]["history"].as_array().unwrap().len(), 1);

    let (_, json) = get_json(format!("http://{addr}/api/server-status")).await;
    assert_eq!(json["data"]["history"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_empty_server_status() {
    let (addr, _t) = spawn_test_api(0).await;

    let (status, json) = get_json(format!("http://{addr}/api/server-status")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["data"]["latest"].is_null());
    assert!(json["data"]["lastAlert"].is_null());
    assert_eq!(json["data"]["history"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_history_single_metric() {
    let (addr, _t) = spawn_test_api(4).await;

    let (status, json) = get_json(format!(
        "http://{addr}/api/server-status/history?limit=2&metric=cpu"
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    let points = json["data"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["value"], 97.3);
    assert_eq!(points[1]["value"], 35.0);
    assert!(points[0]["timestamp"].as_i64() < points[1]["timestamp"].as_i64());
}

#[tokio::test]
async fn test_history_full_readings() {
    let (addr, _t) = spawn_test_api(4).await;

    let (_, json) = get_json(format!("http://{addr}/api/server-status/history")).await;

    let readings = json["data"].as_array().unwrap();
    assert_eq!(readings.len(), 4);
    assert_eq!(readings[2]["isAlert"], true);
    assert!(readings[0]["alertMessage"].is_null());
}

#[tokio::test]
async fn test_history_rejects_unknown_metric() {
    let (addr, _t) = spawn_test_api(1).await;

    let (status, json) = get_json(format!(
        "http://{addr}/api/server-status/history?metric=suhu"
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("suhu"));
}

#[tokio::test]
async fn test_generate_produces_reading() {
    let (addr, t) = spawn_test_api(0).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/api/server-status/generate"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["cpu"], 35.0);

    assert_eq!(t.monitor.recent_window(120).await.len(), 1);
}

#[tokio::test]
async fn test_alerts_endpoint_lists_alert_records() {
    let (addr, _t) = spawn_test_api(4).await;

    let (status, json) = get_json(format!("http://{addr}/api/alerts?limit=5")).await;

    assert_eq!(status, StatusCode::OK);
    let alerts = json["data"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["message"], "CPU high: 97.3%");
    assert!(alerts[0]["timestamp"].is_i64());
}
