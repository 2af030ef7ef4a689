pub mod api;
pub mod config;
pub mod monitor;
pub mod notify;
pub mod recipients;
pub mod storage;
pub mod util;

use serde::{Deserialize, Serialize};

use crate::monitor::evaluation::alert_message;
use crate::monitor::sampler::Sample;

/// A single simulated metrics snapshot.
///
/// Created once per generation tick and never modified afterwards. The alert
/// fields are derived from `cpu` and `temperature` at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Generation time in milliseconds since the Unix epoch
    pub timestamp: i64,
    pub cpu: f64,
    pub mem: f64,
    pub disk: f64,
    pub temperature: f64,
    pub is_alert: bool,
    pub alert_message: Option<String>,
}

impl Reading {
    pub fn from_sample(timestamp: i64, sample: Sample) -> Self {
        let alert_message = alert_message(sample.cpu, sample.temperature);

        Self {
            timestamp,
            cpu: sample.cpu,
            mem: sample.mem,
            disk: sample.disk,
            temperature: sample.temperature,
            is_alert: alert_message.is_some(),
            alert_message,
        }
    }
}

/// Narrow record persisted for every alerting reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub timestamp: i64,
    pub cpu: f64,
    pub temperature: f64,
    pub message: String,
}

impl AlertRecord {
    /// Returns `None` for readings that did not raise an alert.
    pub fn from_reading(reading: &Reading) -> Option<Self> {
        let message = reading.alert_message.clone()?;

        Some(Self {
            timestamp: reading.timestamp,
            cpu: reading.cpu,
            temperature: reading.temperature,
            message,
        })
    }
}
