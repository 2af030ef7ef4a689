use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use crate::notify::config::SendGridSettings;
use crate::notify::error::{NotifyError, NotifyResult};
use crate::notify::{Mail, MailProvider};

/// Delivery through the SendGrid v3 mail API
pub struct SendGridProvider {
    client: reqwest::Client,
    settings: SendGridSettings,
}

impl SendGridProvider {
    pub fn new(settings: SendGridSettings) -> NotifyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::NotConfigured {
                provider: "sendgrid",
                reason: e.to_string(),
            })?;

        Ok(Self { client, settings })
    }

    fn payload(&self, mail: &Mail, to: &str) -> serde_json::Value {
        let mut content = vec![json!({ "type": "text/plain", "value": mail.text })];
        if let Some(html) = &mail.html {
            content.push(json!({ "type": "text/html", "value": html }));
        }

        json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.settings.from },
            "subject": mail.subject,
            "content": content,
        })
    }
}

#[async_trait]
impl MailProvider for SendGridProvider {
    fn name(&self) -> &'static str {
        "sendgrid"
    }

    fn is_available(&self) -> bool {
        self.settings.api_key.is_some()
    }

    #[instrument(skip_all, fields(to = %to))]
    async fn send(&self, mail: &Mail, to: &str) -> NotifyResult<()> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            return Err(NotifyError::NotConfigured {
                provider: "sendgrid",
                reason: "SENDGRID_API_KEY is not set".to_string(),
            });
        };

        let url = format!("{}/v3/mail/send", self.settings.api_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.payload(mail, to))
            .send()
            .await
            .map_err(NotifyError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                provider: "sendgrid",
                status: status.as_u16(),
                body,
            });
        }

        debug!("SendGrid accepted mail with status {}", status);
        Ok(())
    }
}
