//! vigil-notify — alert dispatch toward notification backends.
//!
//! Two backend kinds exist: a chat webhook that receives outage and
//! recovery messages, and an incident pager that is triggered for
//! critical outages and resolved on recovery.
//!
//! ```text
//! AlertDispatcher
//!   ├── ChatNotifier   (SlackNotifier)
//!   └── IncidentPager  (PagerDutyNotifier)
//! ```
//!
//! Every backend call is best-effort. Failures are logged and reported in
//! the [`DispatchSummary`], never retried.

pub mod dispatcher;
pub mod error;
pub mod pagerduty;
pub mod slack;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use dispatcher::{AlertDispatcher, Backend, DispatchSummary};
pub use error::{NotifyError, NotifyResult};
pub use pagerduty::PagerDutyNotifier;
pub use slack::SlackNotifier;

/// A chat channel receiving human-readable alert messages.
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn send_outage(&self, service: &str, error: &str, at: DateTime<Utc>) -> NotifyResult<()>;

    async fn send_recovery(
        &self,
        service: &str,
        outage: Duration,
        at: DateTime<Utc>,
    ) -> NotifyResult<()>;
}

/// An incident paging service. Incidents are scoped to a service name.
#[async_trait]
pub trait IncidentPager: Send + Sync {
    async fn trigger(&self, service: &str, error: &str, at: DateTime<Utc>) -> NotifyResult<()>;

    async fn resolve(&self, service: &str) -> NotifyResult<()>;
}
