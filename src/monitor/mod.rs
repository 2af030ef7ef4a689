//! Reading generation loop
//!
//! The [`Monitor`] produces one reading per tick and keeps the newest ones
//! in a bounded ring buffer. For every tick it:
//!
//! ```text
//! sample → evaluate → ring buffer → history → alert record → notify → retention sweep
//! ```
//!
//! Only the in-memory part of a tick (timestamp, sample, ring buffer, alert
//! marker) runs behind the writer lock, so readings never interleave.
//! Readers only take a short read lock on the snapshot and see either the
//! state before a tick or the state after it.
//!
//! Store I/O happens after the writer lock is released. The timer runs each
//! tick on its own task, so a slow store never delays the next reading.
//! Persistence, alert persistence, notification and retention are each
//! isolated: a failure is logged and the remaining steps still run.

pub mod clock;
pub mod evaluation;
pub mod sampler;

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{GENERATION_PERIOD, MonitorConfig, RETENTION_HORIZON, RETENTION_SWEEP_INTERVAL};
use crate::notify::{AlertSender, Mail};
use crate::recipients::RecipientLookup;
use crate::storage::StorageBackend;
use crate::{AlertRecord, Reading};

use clock::{Clock, SystemClock};
use sampler::{RandomSource, ReadingSource};

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("no reading available after generation")]
    EmptyBuffer,
}

/// Collaborators the monitor talks to
#[derive(Clone)]
pub struct MonitorDeps {
    pub store: Arc<dyn StorageBackend>,
    pub recipients: Arc<dyn RecipientLookup>,
    pub sender: Arc<dyn AlertSender>,
}

#[derive(Debug, Default)]
struct Snapshot {
    history: VecDeque<Reading>,
    last_alert: Option<Reading>,
}

struct WriterState {
    source: Box<dyn ReadingSource>,
    last_timestamp: i64,
}

/// Running timer task and the signal that ends it
struct Ticker {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

struct Inner {
    config: MonitorConfig,
    deps: MonitorDeps,
    clock: Arc<dyn Clock>,
    period: Duration,
    snapshot: RwLock<Snapshot>,
    writer: Mutex<WriterState>,
    /// Reading time of the last dispatched notification
    last_email_at: Mutex<Option<i64>>,
    last_sweep: Mutex<Option<i64>>,
    ticker: Mutex<Option<Ticker>>,
}

/// Handle to the generation loop
///
/// Cheap to clone; all clones share the same buffer and timer.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<Inner>,
}

impl Monitor {
    pub fn new(config: MonitorConfig, deps: MonitorDeps) -> Self {
        Self::with_source(
            config,
            deps,
            Box::new(RandomSource::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_source(
        config: MonitorConfig,
        deps: MonitorDeps,
        source: Box<dyn ReadingSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let capacity = config.capacity();

        Self {
            inner: Arc::new(Inner {
                config,
                deps,
                clock,
                period: GENERATION_PERIOD,
                snapshot: RwLock::new(Snapshot {
                    history: VecDeque::with_capacity(capacity),
                    last_alert: None,
                }),
                writer: Mutex::new(WriterState {
                    source,
                    last_timestamp: i64::MIN,
                }),
                last_email_at: Mutex::new(None),
                last_sweep: Mutex::new(None),
                ticker: Mutex::new(None),
            }),
        }
    }

    /// Ensure the store indices exist. Failure is logged and otherwise ignored.
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        match self.inner.deps.store.ensure_indexes(RETENTION_HORIZON).await {
            Ok(()) => debug!("store indices ensured"),
            Err(e) => error!("failed to ensure store indices: {}", e),
        }
    }

    /// Produce one reading now, then one every generation period.
    ///
    /// Calling `start` on a running monitor does nothing.
    pub async fn start(&self) {
        let mut ticker = self.inner.ticker.lock().await;
        if ticker.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            debug!("monitor already running");
            return;
        }

        self.inner.tick().await;

        let period = self.inner.period;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = signal.notified() => break,
                }

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                tokio::spawn(async move {
                    inner.tick().await;
                });
            }
        });

        *ticker = Some(Ticker { shutdown, handle });

        info!("monitor started, generating every {}ms", period.as_millis());
    }

    /// Stop the timer. Ticks already underway run to completion, as do
    /// in-flight notification dispatches.
    pub async fn stop(&self) {
        let Some(ticker) = self.inner.ticker.lock().await.take() else {
            return;
        };

        ticker.shutdown.notify_one();
        if let Err(e) = ticker.handle.await {
            error!("monitor timer task failed: {}", e);
        }
        info!("monitor stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner
            .ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Produce exactly one reading and return the newest one.
    pub async fn generate_once(&self) -> Result<Reading, MonitorError> {
        self.inner.tick().await;
        self.latest().await.ok_or(MonitorError::EmptyBuffer)
    }

    pub async fn latest(&self) -> Option<Reading> {
        self.inner.snapshot.read().await.history.back().cloned()
    }

    /// The last `min(n, len)` readings, oldest first.
    pub async fn recent_window(&self, n: i64) -> Vec<Reading> {
        if n <= 0 {
            return Vec::new();
        }

        let snapshot = self.inner.snapshot.read().await;
        let take = (n as usize).min(snapshot.history.len());
        snapshot
            .history
            .iter()
            .skip(snapshot.history.len() - take)
            .cloned()
            .collect()
    }

    pub async fn last_alert(&self) -> Option<Reading> {
        self.inner.snapshot.read().await.last_alert.clone()
    }

    /// Reading time of the last dispatched notification
    pub async fn last_notification_at(&self) -> Option<i64> {
        *self.inner.last_email_at.lock().await
    }

    pub fn capacity(&self) -> usize {
        self.inner.config.capacity()
    }
}

impl Inner {
    #[instrument(skip_all)]
    async fn tick(&self) {
        let (reading, is_new_alert) = self.record().await;

        if let Err(e) = self.deps.store.insert_reading(&reading).await {
            error!("failed to persist reading: {}", e);
        }

        if let Some(alert) = AlertRecord::from_reading(&reading) {
            if let Err(e) = self.deps.store.insert_alert(&alert).await {
                error!("failed to persist alert: {}", e);
            }

            if is_new_alert {
                self.notify(&reading, &alert.message).await;
            }
        }

        self.sweep(self.clock.now_millis()).await;
    }

    /// In-memory half of a tick: stamp, sample and publish one reading.
    async fn record(&self) -> (Reading, bool) {
        let mut writer = self.writer.lock().await;

        let timestamp = self.clock.now_millis().max(writer.last_timestamp);
        writer.last_timestamp = timestamp;

        let sample = writer.source.sample();
        let reading = Reading::from_sample(timestamp, sample);

        debug!(
            "new reading: cpu={:.1} temperature={:.1} alert={}",
            reading.cpu, reading.temperature, reading.is_alert
        );

        let is_new_alert = {
            let mut snapshot = self.snapshot.write().await;
            snapshot.history.push_back(reading.clone());
            while snapshot.history.len() > self.config.capacity() {
                snapshot.history.pop_front();
            }

            let is_new_alert = reading.is_alert
                && snapshot
                    .last_alert
                    .as_ref()
                    .is_none_or(|marker| marker.timestamp != reading.timestamp);

            if is_new_alert {
                snapshot.last_alert = Some(reading.clone());
            }
            is_new_alert
        };

        (reading, is_new_alert)
    }

    async fn notify(&self, reading: &Reading, message: &str) {
        let min_interval = self.config.min_email_interval().as_millis() as i64;

        // held across the recipient lookup so throttle decisions never race
        let mut last_email_at = self.last_email_at.lock().await;

        if let Some(last) = *last_email_at {
            let elapsed = reading.timestamp - last;
            if elapsed < min_interval {
                info!(
                    "alert mail suppressed, last sent {}ms ago (minimum {}ms)",
                    elapsed, min_interval
                );
                return;
            }
        }

        let recipients = match self.deps.recipients.active_recipients().await {
            Ok(recipients) => recipients,
            Err(e) => {
                error!("failed to look up active recipients: {}", e);
                return;
            }
        };

        let Some(recipient) = recipients.into_iter().next() else {
            debug!("no active recipient, alert mail skipped");
            return;
        };

        *last_email_at = Some(reading.timestamp);

        let mail = alert_mail(recipient, message, reading.timestamp);
        let sender = Arc::clone(&self.deps.sender);

        tokio::spawn(async move {
            let to = mail.to.clone();
            if !sender.deliver(mail).await {
                warn!("alert mail to {} was not delivered", to);
            }
        });
    }

    async fn sweep(&self, now: i64) {
        let sweep_interval = RETENTION_SWEEP_INTERVAL.as_millis() as i64;

        // a sweep still running on another tick covers this one
        let Ok(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };

        if last_sweep.is_some_and(|last| now - last <= sweep_interval) {
            return;
        }

        let cutoff = now - RETENTION_HORIZON.as_millis() as i64;
        match self.deps.store.delete_history_before(cutoff).await {
            Ok(deleted) => {
                *last_sweep = Some(now);
                debug!("retention sweep removed {} readings", deleted);
            }
            Err(e) => error!("retention sweep failed: {}", e),
        }
    }
}

fn alert_mail(to: String, message: &str, timestamp: i64) -> Mail {
    let time = DateTime::<Utc>::from_timestamp_millis(timestamp)
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| timestamp.to_string());

    let text = format!("Alert detected on server:\n{message}\nTime: {time}");
    let html = format!("<pre>{text}</pre>");

    Mail::new(to, format!("ALERT: {message}"), text).with_html(html)
}
