//! Provider ordering, cooldown and failover against mock HTTP mail APIs

use std::collections::HashMap;
use std::time::Duration;

use pulse_monitor::notify::{Mail, Notifier, NotifierConfig, RetryPolicy};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(pairs: &[(&str, String)]) -> NotifierConfig {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect();
    let mut config = NotifierConfig::from_lookup(|key| env.get(key).cloned());
    config.retry = RetryPolicy::new(3, Duration::from_millis(1));
    config
}

fn alert_mail() -> Mail {
    Mail::new(
        "oncall@example.com",
        "ALERT: CPU high: 97.3%",
        "Alert detected on server:\nCPU high: 97.3%",
    )
}

async fn resend_api(status: u16) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({ "id": "re_1" })))
        .mount(&mock_server)
        .await;
    mock_server
}

async fn sendgrid_api(status: u16) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&mock_server)
        .await;
    mock_server
}

async fn request_count(mock_server: &MockServer) -> usize {
    mock_server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_production_resend_cooldown_suppresses_repeat() {
    let resend = resend_api(200).await;

    let notifier = Notifier::from_config(&config(&[
        ("APP_ENV", "production".to_string()),
        ("RESEND_API_KEY", "re_test".to_string()),
        ("RESEND_API_URL", resend.uri()),
    ]));

    assert_eq!(notifier.provider_names(), vec!["resend", "smtp", "sendgrid"]);
    assert!(notifier.send(&alert_mail()).await);
    assert!(!notifier.send(&alert_mail()).await);
    assert_eq!(request_count(&resend).await, 1);
}

#[tokio::test]
async fn test_resend_override_target_shares_cooldown() {
    let resend = resend_api(200).await;

    let notifier = Notifier::from_config(&config(&[
        ("APP_ENV", "production".to_string()),
        ("RESEND_API_KEY", "re_test".to_string()),
        ("RESEND_TO", "inbox@example.com".to_string()),
        ("RESEND_API_URL", resend.uri()),
    ]));

    assert!(notifier.send(&alert_mail()).await);
    // different requested recipient, same overridden target
    assert!(
        !notifier
            .send(&Mail::new("other@example.com", "ALERT", "text"))
            .await
    );

    let requests = resend.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body["to"][0], "inbox@example.com");
}

#[tokio::test]
async fn test_resend_rejection_falls_back_to_sendgrid() {
    let resend = resend_api(500).await;
    let sendgrid = sendgrid_api(202).await;

    // SMTP has no credentials and is skipped as fallback
    let notifier = Notifier::from_config(&config(&[
        ("APP_ENV", "production".to_string()),
        ("RESEND_API_KEY", "re_test".to_string()),
        ("RESEND_API_URL", resend.uri()),
        ("SENDGRID_API_KEY", "SG.test".to_string()),
        ("SENDGRID_API_URL", sendgrid.uri()),
    ]));

    assert!(notifier.send(&alert_mail()).await);
    assert_eq!(request_count(&resend).await, 1);

    let requests = sendgrid.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(
        body["personalizations"][0]["to"][0]["email"],
        "oncall@example.com"
    );
}

#[tokio::test]
async fn test_failed_fallback_reports_failure() {
    let resend = resend_api(500).await;
    let sendgrid = sendgrid_api(503).await;

    let notifier = Notifier::from_config(&config(&[
        ("NOTIFY_PROVIDERS", "resend,sendgrid".to_string()),
        ("RESEND_API_KEY", "re_test".to_string()),
        ("RESEND_API_URL", resend.uri()),
        ("SENDGRID_API_KEY", "SG.test".to_string()),
        ("SENDGRID_API_URL", sendgrid.uri()),
    ]));

    assert!(!notifier.send(&alert_mail()).await);
    assert_eq!(request_count(&sendgrid).await, 1);
}

#[tokio::test]
async fn test_unreachable_primary_falls_back() {
    let sendgrid = sendgrid_api(202).await;

    // nothing listens on port 1
    let notifier = Notifier::from_config(&config(&[
        ("NOTIFY_PROVIDERS", "resend,sendgrid".to_string()),
        ("RESEND_API_KEY", "re_test".to_string()),
        ("RESEND_API_URL", "http://127.0.0.1:1".to_string()),
        ("SENDGRID_API_KEY", "SG.test".to_string()),
        ("SENDGRID_API_URL", sendgrid.uri()),
    ]));

    assert!(notifier.send(&alert_mail()).await);
    assert_eq!(request_count(&sendgrid).await, 1);
}

#[tokio::test]
async fn test_nothing_configured_reports_failure() {
    let notifier = Notifier::from_config(&config(&[]));
    assert!(!notifier.send(&alert_mail()).await);
}
