use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::PoolConfig;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::notify::config::SmtpSettings;
use crate::notify::error::{NotifyError, NotifyResult};
use crate::notify::{Mail, MailProvider};

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_POOLED_CONNECTIONS: u32 = 5;

/// Pooled SMTP delivery
///
/// The transport is built on first use and reused afterwards. Without a
/// host and credentials the provider reports itself unavailable.
pub struct SmtpProvider {
    settings: SmtpSettings,
    transport: OnceCell<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpProvider {
    pub fn new(settings: SmtpSettings) -> Self {
        if !settings.is_complete() {
            warn!("SMTP not configured, SMTP delivery disabled");
        }

        Self {
            settings,
            transport: OnceCell::new(),
        }
    }

    async fn transport(&self) -> NotifyResult<&AsyncSmtpTransport<Tokio1Executor>> {
        self.transport
            .get_or_try_init(|| async { self.build_transport() })
            .await
    }

    fn build_transport(&self) -> NotifyResult<AsyncSmtpTransport<Tokio1Executor>> {
        let (Some(host), Some(user), Some(pass)) = (
            self.settings.host.as_deref(),
            self.settings.user.as_deref(),
            self.settings.pass.as_deref(),
        ) else {
            return Err(NotifyError::NotConfigured {
                provider: "smtp",
                reason: "SMTP_HOST, SMTP_USER and SMTP_PASS are required".to_string(),
            });
        };

        let not_configured = |e: lettre::transport::smtp::Error| NotifyError::NotConfigured {
            provider: "smtp",
            reason: e.to_string(),
        };

        // implicit TLS on 465, STARTTLS everywhere else
        let builder = if self.settings.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(not_configured)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(not_configured)?
        };

        let transport = builder
            .port(self.settings.port)
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .timeout(Some(SMTP_TIMEOUT))
            .pool_config(PoolConfig::new().max_size(MAX_POOLED_CONNECTIONS))
            .build();

        info!("SMTP transport created for {}:{}", host, self.settings.port);

        let verifier = transport.clone();
        tokio::spawn(async move {
            match verifier.test_connection().await {
                Ok(true) => info!("SMTP transport verified"),
                Ok(false) => warn!("SMTP transport verification failed"),
                Err(e) => warn!("SMTP transport verification failed: {}", e),
            }
        });

        Ok(transport)
    }

    fn build_message(&self, mail: &Mail, to: &str) -> NotifyResult<Message> {
        let from: Mailbox = self
            .settings
            .from
            .parse()
            .map_err(|e| NotifyError::InvalidMessage(format!("sender '{}': {e}", self.settings.from)))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| NotifyError::InvalidMessage(format!("recipient '{to}': {e}")))?;

        let builder = Message::builder().from(from).to(to).subject(&mail.subject);

        let message = match &mail.html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                mail.text.clone(),
                html.clone(),
            )),
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(mail.text.clone()),
        };

        message.map_err(|e| NotifyError::InvalidMessage(e.to_string()))
    }
}

#[async_trait]
impl MailProvider for SmtpProvider {
    fn name(&self) -> &'static str {
        "smtp"
    }

    fn is_available(&self) -> bool {
        self.settings.is_complete()
    }

    #[instrument(skip_all, fields(to = %to))]
    async fn send(&self, mail: &Mail, to: &str) -> NotifyResult<()> {
        let transport = self.transport().await?;
        let message = self.build_message(mail, to)?;

        let response = transport
            .send(message)
            .await
            .map_err(NotifyError::from_smtp)?;

        debug!(
            "SMTP accepted mail: {}",
            response.message().collect::<Vec<_>>().join(" ")
        );
        Ok(())
    }
}
