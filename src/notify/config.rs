use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use super::retry::RetryPolicy;
use crate::util::parse_or;

pub const DEFAULT_FROM: &str = "no-reply@example.com";
pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";
pub const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Smtp,
    Resend,
    SendGrid,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(ProviderKind::Smtp),
            "resend" => Ok(ProviderKind::Resend),
            "sendgrid" => Ok(ProviderKind::SendGrid),
            other => Err(format!("unknown mail provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SmtpSettings {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: String,
}

impl SmtpSettings {
    /// Host and credentials all present
    pub fn is_complete(&self) -> bool {
        self.host.is_some() && self.user.is_some() && self.pass.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ResendSettings {
    pub api_key: Option<String>,
    pub from: String,
    /// Sends go here instead of the requested recipient when set
    pub to_override: Option<String>,
    pub api_url: String,
    pub cooldown: Duration,
}

#[derive(Debug, Clone)]
pub struct SendGridSettings {
    pub api_key: Option<String>,
    pub from: String,
    pub api_url: String,
}

/// Everything the notifier reads from the environment
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub smtp: SmtpSettings,
    pub resend: ResendSettings,
    pub sendgrid: SendGridSettings,
    /// Priority order; the first available provider is primary
    pub order: Vec<ProviderKind>,
    pub retry: RetryPolicy,
}

impl NotifierConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(crate::util::env_var)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let from = get("EMAIL_FROM").unwrap_or_else(|| DEFAULT_FROM.to_string());

        let smtp = SmtpSettings {
            host: get("SMTP_HOST"),
            port: parse_or(get("SMTP_PORT"), 587),
            user: get("SMTP_USER"),
            pass: get("SMTP_PASS"),
            from: from.clone(),
        };

        let resend = ResendSettings {
            api_key: get("RESEND_API_KEY"),
            from: get("RESEND_FROM").unwrap_or_else(|| from.clone()),
            to_override: get("RESEND_TO"),
            api_url: get("RESEND_API_URL").unwrap_or_else(|| DEFAULT_RESEND_API_URL.to_string()),
            cooldown: Duration::from_secs(parse_or(get("RESEND_COOLDOWN_SECONDS"), 3600)),
        };

        let sendgrid = SendGridSettings {
            api_key: get("SENDGRID_API_KEY"),
            from: get("SENDGRID_FROM").unwrap_or(from),
            api_url: get("SENDGRID_API_URL")
                .unwrap_or_else(|| DEFAULT_SENDGRID_API_URL.to_string()),
        };

        let production = get("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));
        let order = resolve_order(
            get("NOTIFY_PROVIDERS").as_deref(),
            production,
            resend.api_key.is_some(),
        );

        info!(
            "mail providers: order={order:?} resend_key={} smtp_configured={} sendgrid_key={}",
            if resend.api_key.is_some() { "set" } else { "missing" },
            smtp.is_complete(),
            if sendgrid.api_key.is_some() { "set" } else { "missing" },
        );

        Self {
            smtp,
            resend,
            sendgrid,
            order,
            retry: RetryPolicy::default(),
        }
    }
}

fn resolve_order(explicit: Option<&str>, production: bool, resend_key: bool) -> Vec<ProviderKind> {
    if let Some(list) = explicit {
        let mut order = Vec::new();
        for name in list.split(',').filter(|name| !name.trim().is_empty()) {
            match name.parse::<ProviderKind>() {
                Ok(kind) if !order.contains(&kind) => order.push(kind),
                Ok(_) => {}
                Err(e) => warn!("ignoring NOTIFY_PROVIDERS entry: {e}"),
            }
        }
        if !order.is_empty() {
            return order;
        }
    }

    if production && resend_key {
        return vec![ProviderKind::Resend, ProviderKind::Smtp, ProviderKind::SendGrid];
    }

    if production {
        warn!("production environment without RESEND_API_KEY, SMTP stays primary");
    }

    vec![ProviderKind::Smtp, ProviderKind::Resend, ProviderKind::SendGrid]
}
