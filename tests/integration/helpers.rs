//! Shared builders and fakes for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pulse_monitor::{
    config::MonitorConfig,
    monitor::{
        Monitor, MonitorDeps,
        clock::ManualClock,
        sampler::{Sample, SequenceSource},
    },
    notify::{AlertSender, Mail},
    recipients::{RecipientLookup, StaticRecipients},
    storage::StorageBackend,
};

pub const START_MS: i64 = 1_700_000_000_000;

pub fn calm() -> Sample {
    Sample {
        cpu: 35.0,
        mem: 48.0,
        disk: 61.0,
        temperature: 52.0,
    }
}

pub fn cpu_spike() -> Sample {
    Sample {
        cpu: 97.3,
        ..calm()
    }
}

pub fn overheating() -> Sample {
    Sample {
        cpu: 92.0,
        temperature: 88.4,
        ..calm()
    }
}

/// Sender that keeps every mail it is handed
#[derive(Default)]
pub struct RecordingSender {
    mails: Mutex<Vec<Mail>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<Mail> {
        self.mails.lock().clone()
    }
}

#[async_trait]
impl AlertSender for RecordingSender {
    async fn deliver(&self, mail: Mail) -> bool {
        self.mails.lock().push(mail);
        true
    }
}

pub struct TestMonitor {
    pub monitor: Monitor,
    pub clock: Arc<ManualClock>,
    pub sender: Arc<RecordingSender>,
}

pub fn spawn_monitor(
    store: Arc<dyn StorageBackend>,
    recipients: Vec<&str>,
    samples: Vec<Sample>,
    config: MonitorConfig,
) -> TestMonitor {
    let clock = Arc::new(ManualClock::new(START_MS));
    let sender = Arc::new(RecordingSender::default());
    let recipients: Arc<dyn RecipientLookup> = Arc::new(StaticRecipients(
        recipients.into_iter().map(String::from).collect(),
    ));

    let monitor = Monitor::with_source(
        config,
        MonitorDeps {
            store,
            recipients,
            sender: sender.clone(),
        },
        Box::new(SequenceSource::new(samples)),
        clock.clone(),
    );

    TestMonitor {
        monitor,
        clock,
        sender,
    }
}

/// Let detached dispatch tasks run
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
