//! Alert dispatcher — routes transition events to the configured backends.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use vigil_core::{MonitorConfig, ServiceSpec, TransitionEvent};

use crate::error::NotifyResult;
use crate::{ChatNotifier, IncidentPager, PagerDutyNotifier, SlackNotifier};

/// Notification backend a delivery went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Chat webhook (Slack).
    Chat,
    /// Incident pager (PagerDuty).
    Pager,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Chat => f.write_str("chat"),
            Backend::Pager => f.write_str("pager"),
        }
    }
}

/// Which backends took part in one dispatch and how they fared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: Vec<Backend>,
    pub failed: Vec<Backend>,
}

impl DispatchSummary {
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.failed.is_empty()
    }

    fn record(
        &mut self,
        backend: Backend,
        result: Option<NotifyResult<()>>,
        event: &TransitionEvent,
    ) {
        match result {
            None => {}
            Some(Ok(())) => self.delivered.push(backend),
            Some(Err(e)) => {
                warn!(
                    service = %event.service(),
                    event = event.label(),
                    %backend,
                    error = %e,
                    "notification failed"
                );
                self.failed.push(backend);
            }
        }
    }
}

/// Routes events to at most one chat backend and one pager.
///
/// A missing backend is "not configured" and silently skipped.
#[derive(Clone, Default)]
pub struct AlertDispatcher {
    chat: Option<Arc<dyn ChatNotifier>>,
    pager: Option<Arc<dyn IncidentPager>>,
}

impl AlertDispatcher {
    /// A dispatcher with no backends.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatNotifier>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_pager(mut self, pager: Arc<dyn IncidentPager>) -> Self {
        self.pager = Some(pager);
        self
    }

    /// Build the backends whose credentials are present in the config.
    pub fn from_config(config: &MonitorConfig) -> NotifyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.alerts.timeout)
            .build()?;

        let mut dispatcher = Self::new();
        if let Some(slack) = config.slack() {
            dispatcher = dispatcher.with_chat(Arc::new(SlackNotifier::new(
                client.clone(),
                slack.webhook_url.clone(),
            )));
        }
        if let Some(pd) = config.pagerduty() {
            dispatcher = dispatcher.with_pager(Arc::new(PagerDutyNotifier::new(client, pd)));
        }
        Ok(dispatcher)
    }

    pub fn has_chat(&self) -> bool {
        self.chat.is_some()
    }

    pub fn has_pager(&self) -> bool {
        self.pager.is_some()
    }

    /// Send one event to every backend its policy selects.
    ///
    /// Outages go to chat, and to the pager only for critical services.
    /// Recoveries go to chat and resolve the pager incident regardless of
    /// criticality. Both backends run concurrently and independently.
    pub async fn dispatch(&self, event: &TransitionEvent, spec: &ServiceSpec) -> DispatchSummary {
        let chat = async {
            match (&self.chat, event) {
                (None, _) => None,
                (Some(chat), TransitionEvent::OutageStarted { service, error, at }) => {
                    Some(chat.send_outage(service, error, *at).await)
                }
                (
                    Some(chat),
                    TransitionEvent::Recovered {
                        service,
                        outage,
                        at,
                    },
                ) => Some(chat.send_recovery(service, *outage, *at).await),
            }
        };

        let pager = async {
            match (&self.pager, event) {
                (Some(pager), TransitionEvent::OutageStarted { service, error, at })
                    if spec.critical =>
                {
                    Some(pager.trigger(service, error, *at).await)
                }
                (Some(pager), TransitionEvent::Recovered { service, .. }) => {
                    Some(pager.resolve(service).await)
                }
                _ => None,
            }
        };

        let (chat, pager) = tokio::join!(chat, pager);

        let mut summary = DispatchSummary::default();
        summary.record(Backend::Chat, chat, event);
        summary.record(Backend::Pager, pager, event);

        if !summary.delivered.is_empty() {
            info!(
                service = %event.service(),
                event = event.label(),
                delivered = ?summary.delivered,
                "alert dispatched"
            );
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::NotifyError;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Recorder {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn push(&self, call: String) -> crate::NotifyResult<()> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                Err(NotifyError::Rejected {
                    backend: "test",
                    status: 500,
                })
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatNotifier for Recorder {
        async fn send_outage(
            &self,
            service: &str,
            _error: &str,
            _at: DateTime<Utc>,
        ) -> crate::NotifyResult<()> {
            self.push(format!("outage:{service}"))
        }

        async fn send_recovery(
            &self,
            service: &str,
            _outage: Duration,
            _at: DateTime<Utc>,
        ) -> crate::NotifyResult<()> {
            self.push(format!("recovery:{service}"))
        }
    }

    #[async_trait]
    impl IncidentPager for Recorder {
        async fn trigger(
            &self,
            service: &str,
            _error: &str,
            _at: DateTime<Utc>,
        ) -> crate::NotifyResult<()> {
            self.push(format!("trigger:{service}"))
        }

        async fn resolve(&self, service: &str) -> crate::NotifyResult<()> {
            self.push(format!("resolve:{service}"))
        }
    }

    fn outage(service: &str) -> TransitionEvent {
        TransitionEvent::OutageStarted {
            service: service.to_string(),
            error: "unexpected status code: 500".to_string(),
            at: Utc::now(),
        }
    }

    fn recovered(service: &str) -> TransitionEvent {
        TransitionEvent::Recovered {
            service: service.to_string(),
            outage: Duration::from_secs(30),
            at: Utc::now(),
        }
    }

    fn spec(name: &str, critical: bool) -> ServiceSpec {
        let mut spec = ServiceSpec::new(name, "http://localhost/");
        spec.critical = critical;
        spec
    }

    #[tokio::test]
    async fn critical_outage_goes_to_chat_and_pager() {
        let chat = Arc::new(Recorder::default());
        let pager = Arc::new(Recorder::default());
        let dispatcher = AlertDispatcher::new()
            .with_chat(chat.clone())
            .with_pager(pager.clone());

        let summary = dispatcher.dispatch(&outage("db"), &spec("db", true)).await;

        assert_eq!(chat.calls(), vec!["outage:db"]);
        assert_eq!(pager.calls(), vec!["trigger:db"]);
        assert_eq!(summary.delivered, vec![Backend::Chat, Backend::Pager]);
        assert!(summary.failed.is_empty());
    }

    #[tokio::test]
    async fn non_critical_outage_never_pages() {
        let chat = Arc::new(Recorder::default());
        let pager = Arc::new(Recorder::default());
        let dispatcher = AlertDispatcher::new()
            .with_chat(chat.clone())
            .with_pager(pager.clone());

        let summary = dispatcher.dispatch(&outage("blog"), &spec("blog", false)).await;

        assert_eq!(chat.calls(), vec!["outage:blog"]);
        assert!(pager.calls().is_empty());
        assert_eq!(summary.delivered, vec![Backend::Chat]);
    }

    #[tokio::test]
    async fn recovery_resolves_regardless_of_criticality() {
        let chat = Arc::new(Recorder::default());
        let pager = Arc::new(Recorder::default());
        let dispatcher = AlertDispatcher::new()
            .with_chat(chat.clone())
            .with_pager(pager.clone());

        dispatcher.dispatch(&recovered("blog"), &spec("blog", false)).await;

        assert_eq!(chat.calls(), vec!["recovery:blog"]);
        assert_eq!(pager.calls(), vec!["resolve:blog"]);
    }

    #[tokio::test]
    async fn failing_chat_does_not_block_pager() {
        let chat = Arc::new(Recorder::failing());
        let pager = Arc::new(Recorder::default());
        let dispatcher = AlertDispatcher::new()
            .with_chat(chat.clone())
            .with_pager(pager.clone());

        let summary = dispatcher.dispatch(&outage("db"), &spec("db", true)).await;

        assert_eq!(pager.calls(), vec!["trigger:db"]);
        assert_eq!(summary.delivered, vec![Backend::Pager]);
        assert_eq!(summary.failed, vec![Backend::Chat]);
    }

    #[tokio::test]
    async fn unconfigured_backends_are_skipped() {
        let dispatcher = AlertDispatcher::new();
        let summary = dispatcher.dispatch(&outage("db"), &spec("db", true)).await;
        assert!(summary.is_empty());
        assert!(!dispatcher.has_chat());
        assert!(!dispatcher.has_pager());
    }

    #[test]
    fn from_config_only_builds_configured_backends() {
        let config = MonitorConfig::from_json_str(
            r#"{"alerts": {
                "slack": {"webhook_url": "https://hooks.example.com/x"},
                "pagerduty": {"service_key": ""}
            }}"#,
        )
        .unwrap();
        let dispatcher = AlertDispatcher::from_config(&config).unwrap();
        assert!(dispatcher.has_chat());
        assert!(!dispatcher.has_pager());
    }
}
