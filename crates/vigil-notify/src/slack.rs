//! Chat webhook backend (Slack incoming-webhook format).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use tracing::debug;

use vigil_core::format_downtime;

use crate::error::{NotifyResult, ensure_success};
use crate::ChatNotifier;

/// Posts outage and recovery messages to a Slack incoming webhook.
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(client: reqwest::Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }

    async fn post(&self, text: String) -> NotifyResult<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "text": text }))
            .send()
            .await?;
        ensure_success("slack", response)?;
        debug!("slack message delivered");
        Ok(())
    }
}

/// Message body posted when a service goes down.
pub fn outage_text(service: &str, error: &str, at: DateTime<Utc>) -> String {
    format!(
        "🚨 *ALERT*: Service {service} is DOWN!\nError: {error}\nTime: {}",
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Message body posted when a service recovers, with its downtime.
pub fn recovery_text(service: &str, outage: Duration, at: DateTime<Utc>) -> String {
    format!(
        "✅ Service {service} has RECOVERED\nDowntime: {}\nTime: {}",
        format_downtime(outage),
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

#[async_trait]
impl ChatNotifier for SlackNotifier {
    async fn send_outage(&self, service: &str, error: &str, at: DateTime<Utc>) -> NotifyResult<()> {
        self.post(outage_text(service, error, at)).await
    }

    async fn send_recovery(
        &self,
        service: &str,
        outage: Duration,
        at: DateTime<Utc>,
    ) -> NotifyResult<()> {
        self.post(recovery_text(service, outage, at)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotifyError;
    use chrono::TimeZone;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn outage_text_names_service_error_and_time() {
        let text = outage_text("billing", "connection refused", at());
        assert!(text.contains("Service billing is DOWN"));
        assert!(text.contains("Error: connection refused"));
        assert!(text.contains("Time: 2024-05-01T12:30:00Z"));
    }

    #[test]
    fn recovery_text_includes_rounded_downtime() {
        let text = recovery_text("billing", Duration::from_millis(90_600), at());
        assert!(text.contains("Service billing has RECOVERED"));
        assert!(text.contains("Downtime: 1m31s"));
    }

    #[tokio::test]
    async fn posts_json_text_to_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(body_string_contains("is DOWN"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = SlackNotifier::new(reqwest::Client::new(), format!("{}/hook", server.uri()));
        notifier.send_outage("api", "timeout", at()).await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let notifier = SlackNotifier::new(reqwest::Client::new(), server.uri());
        let err = notifier
            .send_recovery("api", Duration::from_secs(5), at())
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 403, .. }));
    }
}
