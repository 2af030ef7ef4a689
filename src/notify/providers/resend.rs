use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use crate::notify::config::ResendSettings;
use crate::notify::error::{NotifyError, NotifyResult};
use crate::notify::{Mail, MailProvider};

/// Delivery through the Resend HTTP API
pub struct ResendProvider {
    client: reqwest::Client,
    settings: ResendSettings,
}

impl ResendProvider {
    pub fn new(settings: ResendSettings) -> NotifyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::NotConfigured {
                provider: "resend",
                reason: e.to_string(),
            })?;

        Ok(Self { client, settings })
    }

    pub fn cooldown(&self) -> Duration {
        self.settings.cooldown
    }
}

#[async_trait]
impl MailProvider for ResendProvider {
    fn name(&self) -> &'static str {
        "resend"
    }

    fn is_available(&self) -> bool {
        self.settings.api_key.is_some()
    }

    fn target_for<'a>(&'a self, recipient: &'a str) -> &'a str {
        self.settings.to_override.as_deref().unwrap_or(recipient)
    }

    #[instrument(skip_all, fields(to = %to))]
    async fn send(&self, mail: &Mail, to: &str) -> NotifyResult<()> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            return Err(NotifyError::NotConfigured {
                provider: "resend",
                reason: "RESEND_API_KEY is not set".to_string(),
            });
        };

        let url = format!("{}/emails", self.settings.api_url.trim_end_matches('/'));
        let payload = json!({
            "from": self.settings.from,
            "to": [to],
            "subject": mail.subject,
            "text": mail.text,
            "html": mail.html_or_pre(),
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(NotifyError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                provider: "resend",
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        debug!(
            "Resend accepted mail id={}",
            body.get("id").and_then(|id| id.as_str()).unwrap_or("unknown")
        );
        Ok(())
    }
}
