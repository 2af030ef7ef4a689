use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Last successful send per target address
#[derive(Debug)]
pub struct CooldownMap {
    window: Duration,
    last_sent: Mutex<HashMap<String, Instant>>,
}

impl CooldownMap {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Time left before `target` may be mailed again, if any.
    pub fn remaining(&self, target: &str) -> Option<Duration> {
        let last_sent = self.last_sent.lock();
        let sent_at = last_sent.get(target)?;
        let elapsed = sent_at.elapsed();

        (elapsed < self.window).then(|| self.window - elapsed)
    }

    pub fn record(&self, target: &str) {
        self.last_sent.lock().insert(target.to_string(), Instant::now());
    }

    /// Drop entries whose window has passed. Returns how many were removed.
    pub fn evict_stale(&self) -> usize {
        let mut last_sent = self.last_sent.lock();
        let before = last_sent.len();
        last_sent.retain(|_, sent_at| sent_at.elapsed() < self.window);
        before - last_sent.len()
    }

    pub fn len(&self) -> usize {
        self.last_sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
