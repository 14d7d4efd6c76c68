//! Incident paging backend (PagerDuty events endpoint).
//!
//! Triggers and resolves share an `incident_key` equal to the service
//! name, so a resolve closes the incident opened by the matching trigger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::debug;

use vigil_core::PagerDutyConfig;

use crate::IncidentPager;
use crate::error::{NotifyResult, ensure_success};

/// Triggers and resolves PagerDuty incidents keyed by service name.
pub struct PagerDutyNotifier {
    client: reqwest::Client,
    service_key: String,
    api_key: Option<String>,
    events_url: String,
}

impl PagerDutyNotifier {
    pub fn new(client: reqwest::Client, config: &PagerDutyConfig) -> Self {
        let api_key = Some(config.api_key.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        Self {
            client,
            service_key: config.service_key.clone(),
            api_key,
            events_url: config.events_url.clone(),
        }
    }

    fn trigger_body(&self, service: &str, error: &str, at: DateTime<Utc>) -> Value {
        json!({
            "service_key": self.service_key,
            "event_type": "trigger",
            "incident_key": service,
            "description": format!("Service {service} is DOWN - {error}"),
            "details": {
                "error": error,
                "timestamp": at.timestamp(),
            },
        })
    }

    fn resolve_body(&self, service: &str) -> Value {
        json!({
            "service_key": self.service_key,
            "event_type": "resolve",
            "incident_key": service,
            "description": format!("Service {service} has recovered"),
        })
    }

    async fn send(&self, body: Value) -> NotifyResult<()> {
        let mut request = self.client.post(&self.events_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Token token={key}"));
        }
        let response = request.send().await?;
        ensure_success("pagerduty", response)
    }
}

#[async_trait]
impl IncidentPager for PagerDutyNotifier {
    async fn trigger(&self, service: &str, error: &str, at: DateTime<Utc>) -> NotifyResult<()> {
        self.send(self.trigger_body(service, error, at)).await?;
        debug!(%service, "pagerduty incident triggered");
        Ok(())
    }

    async fn resolve(&self, service: &str) -> NotifyResult<()> {
        self.send(self.resolve_body(service)).await?;
        debug!(%service, "pagerduty incident resolved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotifyError;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(events_url: String, api_key: &str) -> PagerDutyConfig {
        PagerDutyConfig {
            service_key: "svc-key".to_string(),
            api_key: api_key.to_string(),
            events_url,
        }
    }

    #[tokio::test]
    async fn trigger_is_scoped_to_service_and_authorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/enqueue"))
            .and(header("authorization", "Token token=api-key"))
            .and(body_partial_json(json!({
                "service_key": "svc-key",
                "event_type": "trigger",
                "incident_key": "payments",
                "details": {"error": "unexpected status code: 503"},
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let pager = PagerDutyNotifier::new(
            reqwest::Client::new(),
            &config(format!("{}/v2/enqueue", server.uri()), "api-key"),
        );
        pager
            .trigger("payments", "unexpected status code: 503", Utc::now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn resolve_uses_same_incident_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "event_type": "resolve",
                "incident_key": "payments",
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let pager = PagerDutyNotifier::new(reqwest::Client::new(), &config(server.uri(), ""));
        pager.resolve("payments").await.unwrap();
    }

    #[test]
    fn blank_api_key_sends_no_authorization() {
        let pager = PagerDutyNotifier::new(
            reqwest::Client::new(),
            &config("http://localhost".to_string(), "  "),
        );
        assert!(pager.api_key.is_none());
    }

    #[tokio::test]
    async fn rejected_event_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let pager = PagerDutyNotifier::new(reqwest::Client::new(), &config(server.uri(), "k"));
        let err = pager.resolve("payments").await.unwrap_err();
        assert!(matches!(
            err,
            NotifyError::Rejected {
                backend: "pagerduty",
                status: 400
            }
        ));
    }
}
