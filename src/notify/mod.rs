//! Multi-provider mail delivery
//!
//! The [`Notifier`] holds mail providers in priority order. For each mail:
//!
//! 1. The first available provider is the primary. If it has a cooldown and
//!    the target was mailed within the window, the mail is dropped.
//! 2. The primary is attempted under its [`RetryPolicy`]; only transient
//!    transport failures are retried.
//! 3. On terminal failure the next available provider is attempted once.
//!
//! Delivery outcome is reported as a plain `bool`; errors are logged and
//! never escape.

pub mod config;
pub mod cooldown;
pub mod error;
pub mod providers;
pub mod retry;

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

pub use config::{NotifierConfig, ProviderKind};
pub use cooldown::CooldownMap;
pub use error::{NotifyError, NotifyResult, TransportErrorKind};
pub use retry::RetryPolicy;

use providers::{ResendProvider, SendGridProvider, SmtpProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

impl Mail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            text: text.into(),
            html: None,
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// HTML body, or the text body wrapped in `<pre>` when none was given.
    pub fn html_or_pre(&self) -> String {
        self.html
            .clone()
            .unwrap_or_else(|| format!("<pre>{}</pre>", self.text))
    }
}

/// A way of getting a mail to its recipient
#[async_trait]
pub trait MailProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the provider has what it needs to attempt a send
    fn is_available(&self) -> bool;

    /// Address the provider will actually deliver to
    fn target_for<'a>(&'a self, recipient: &'a str) -> &'a str {
        recipient
    }

    async fn send(&self, mail: &Mail, to: &str) -> NotifyResult<()>;
}

/// Fire-and-forget alert delivery, as seen by the monitor
#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn deliver(&self, mail: Mail) -> bool;
}

pub struct ProviderEntry {
    provider: Arc<dyn MailProvider>,
    retry: RetryPolicy,
    cooldown: Option<CooldownMap>,
}

impl ProviderEntry {
    pub fn new(provider: Arc<dyn MailProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            cooldown: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// A zero window disables the cooldown.
    pub fn with_cooldown(mut self, window: Duration) -> Self {
        self.cooldown = (!window.is_zero()).then(|| CooldownMap::new(window));
        self
    }

    pub fn name(&self) -> &'static str {
        self.provider.name()
    }
}

pub struct Notifier {
    entries: Vec<ProviderEntry>,
}

impl Notifier {
    pub fn new(entries: Vec<ProviderEntry>) -> Self {
        Self { entries }
    }

    /// Build providers in the configured order. Providers whose client
    /// cannot be created are skipped with an error log.
    pub fn from_config(config: &NotifierConfig) -> Self {
        let mut entries = Vec::with_capacity(config.order.len());

        for kind in &config.order {
            let entry = match kind {
                ProviderKind::Smtp => Ok(ProviderEntry::new(Arc::new(SmtpProvider::new(
                    config.smtp.clone(),
                )))),
                ProviderKind::Resend => {
                    ResendProvider::new(config.resend.clone()).map(|provider| {
                        let cooldown = provider.cooldown();
                        ProviderEntry::new(Arc::new(provider)).with_cooldown(cooldown)
                    })
                }
                ProviderKind::SendGrid => SendGridProvider::new(config.sendgrid.clone())
                    .map(|provider| ProviderEntry::new(Arc::new(provider))),
            };

            match entry {
                Ok(entry) => entries.push(entry.with_retry(config.retry)),
                Err(e) => error!("skipping {kind:?} mail provider: {e}"),
            }
        }

        Self::new(entries)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(ProviderEntry::name).collect()
    }

    /// Deliver a mail. Returns `true` once any provider accepted it.
    #[instrument(skip_all, fields(to = %mail.to, subject = %mail.subject))]
    pub async fn send(&self, mail: &Mail) -> bool {
        let Some(primary_index) = self
            .entries
            .iter()
            .position(|entry| entry.provider.is_available())
        else {
            warn!("no mail provider configured, mail skipped");
            return false;
        };

        let primary = &self.entries[primary_index];
        let target = primary.provider.target_for(&mail.to);

        if let Some(cooldown) = &primary.cooldown {
            if let Some(remaining) = cooldown.remaining(target) {
                info!(
                    "{} suppressed for {target}; next send allowed in {}s",
                    primary.name(),
                    remaining.as_secs()
                );
                return false;
            }
        }

        match self.send_with_retry(primary, target, mail).await {
            Ok(()) => {
                if let Some(cooldown) = &primary.cooldown {
                    cooldown.record(target);
                }
                info!("mail delivered via {} to {target}", primary.name());
                return true;
            }
            Err(e) => error!("{} delivery failed: {e}", primary.name()),
        }

        let Some(fallback) = self.entries[primary_index + 1..]
            .iter()
            .find(|entry| entry.provider.is_available())
        else {
            error!("no fallback mail provider available");
            return false;
        };

        let target = fallback.provider.target_for(&mail.to);
        info!("falling back to {} for {target}", fallback.name());

        match fallback.provider.send(mail, target).await {
            Ok(()) => {
                info!("mail delivered via fallback {} to {target}", fallback.name());
                true
            }
            Err(e) => {
                error!("fallback {} delivery failed: {e}", fallback.name());
                false
            }
        }
    }

    async fn send_with_retry(
        &self,
        entry: &ProviderEntry,
        target: &str,
        mail: &Mail,
    ) -> NotifyResult<()> {
        let max_attempts = entry.retry.max_attempts();
        let mut attempt = 0;

        loop {
            debug!(
                "sending attempt {}/{max_attempts} via {} to {target}",
                attempt + 1,
                entry.name()
            );

            match entry.provider.send(mail, target).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("send attempt {} via {} failed: {e}", attempt + 1, entry.name());

                    if attempt + 1 >= max_attempts || !e.is_transient() {
                        return Err(e);
                    }

                    let delay = entry.retry.delay_for(attempt);
                    info!("transient error, retrying in {}ms", delay.as_millis());
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Drop expired cooldown entries from every provider.
    pub fn evict_stale_cooldowns(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|entry| entry.cooldown.as_ref())
            .map(CooldownMap::evict_stale)
            .sum()
    }

    /// Periodically evict stale cooldown entries until the notifier is dropped.
    pub fn spawn_janitor(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let notifier: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);

            loop {
                ticker.tick().await;

                let Some(notifier) = notifier.upgrade() else {
                    break;
                };

                let evicted = notifier.evict_stale_cooldowns();
                if evicted > 0 {
                    debug!("evicted {evicted} stale cooldown entries");
                }
            }
        })
    }
}

#[async_trait]
impl AlertSender for Notifier {
    async fn deliver(&self, mail: Mail) -> bool {
        self.send(&mail).await
    }
}
