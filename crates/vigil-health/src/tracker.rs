//! Status tracker — the Up/Down state machine for every service.
//!
//! The tracker is the only writer of [`HealthRecord`]s. Scheduler loops
//! apply probe outcomes; the status endpoint reads snapshots. Access goes
//! through a single `RwLock`, so readers proceed together and each write
//! is one short O(1) update.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};

use vigil_core::{ServiceSpec, TransitionEvent};

use crate::checker::ProbeOutcome;
use crate::error::{HealthError, HealthResult};

/// Health of a service as of its last check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Last probe succeeded, or no probe has run yet.
    Up,
    /// Last probe failed.
    Down,
}

/// The formal states of a record.
///
/// `DownUnalerted` only exists between committing an `Up→Down` transition
/// and finishing the outage dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Up,
    DownUnalerted,
    DownAlerted,
}

/// Health of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthRecord {
    pub name: String,
    pub health: Health,
    /// `None` until the first probe completes.
    pub last_check: Option<DateTime<Utc>>,
    /// Empty while up.
    pub last_error: String,
    /// Consecutive failed probes. Zero while up.
    pub failure_count: u32,
    pub latency: Duration,
    /// Set once the outage alert has been dispatched. Only true while down.
    pub alert_active: bool,
    /// When the service last came back up. Cleared by the next outage.
    pub recovered_at: Option<DateTime<Utc>>,
    /// When the current outage started. `None` while up.
    pub down_since: Option<DateTime<Utc>>,
}

impl HealthRecord {
    /// Optimistic initial record: up, never checked.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            health: Health::Up,
            last_check: None,
            last_error: String::new(),
            failure_count: 0,
            latency: Duration::ZERO,
            alert_active: false,
            recovered_at: None,
            down_since: None,
        }
    }

    pub fn is_up(&self) -> bool {
        self.health == Health::Up
    }

    pub fn state(&self) -> RecordState {
        match (self.health, self.alert_active) {
            (Health::Up, _) => RecordState::Up,
            (Health::Down, false) => RecordState::DownUnalerted,
            (Health::Down, true) => RecordState::DownAlerted,
        }
    }

    /// Apply one probe outcome and return the transition it causes, if any.
    pub(crate) fn record(
        &mut self,
        outcome: &ProbeOutcome,
        now: DateTime<Utc>,
    ) -> Option<TransitionEvent> {
        self.last_check = Some(now);
        self.latency = outcome.latency;

        match (self.health, outcome.success) {
            (Health::Up, true) => None,
            (Health::Up, false) => {
                self.health = Health::Down;
                self.failure_count = 1;
                self.last_error = outcome.error_text().to_string();
                self.alert_active = false;
                self.down_since = Some(now);
                self.recovered_at = None;
                Some(TransitionEvent::OutageStarted {
                    service: self.name.clone(),
                    error: self.last_error.clone(),
                    at: now,
                })
            }
            (Health::Down, false) => {
                self.failure_count = self.failure_count.saturating_add(1);
                self.last_error = outcome.error_text().to_string();
                None
            }
            (Health::Down, true) => {
                let outage = self
                    .down_since
                    .take()
                    .and_then(|since| (now - since).to_std().ok())
                    .unwrap_or_default();
                self.health = Health::Up;
                self.failure_count = 0;
                self.last_error.clear();
                self.alert_active = false;
                self.recovered_at = Some(now);
                Some(TransitionEvent::Recovered {
                    service: self.name.clone(),
                    outage,
                    at: now,
                })
            }
        }
    }

    /// Mark the outage alert as sent. No-op while up.
    pub(crate) fn mark_alerted(&mut self) -> bool {
        if self.health == Health::Down {
            self.alert_active = true;
        }
        self.alert_active
    }
}

/// Owner of all health records.
#[derive(Debug, Default)]
pub struct StatusTracker {
    records: RwLock<HashMap<String, HealthRecord>>,
}

impl StatusTracker {
    /// Create a tracker with one optimistic record per service name.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let records = names
            .into_iter()
            .map(|n| {
                let record = HealthRecord::new(n);
                (record.name.clone(), record)
            })
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn from_specs(specs: &[ServiceSpec]) -> Self {
        Self::new(specs.iter().map(|s| s.name.clone()))
    }

    /// Apply a probe outcome to a service's record.
    pub async fn apply(
        &self,
        name: &str,
        outcome: &ProbeOutcome,
    ) -> HealthResult<Option<TransitionEvent>> {
        self.apply_at(name, outcome, Utc::now()).await
    }

    /// Like [`apply`](Self::apply) with an explicit clock reading.
    pub async fn apply_at(
        &self,
        name: &str,
        outcome: &ProbeOutcome,
        now: DateTime<Utc>,
    ) -> HealthResult<Option<TransitionEvent>> {
        let event = {
            let mut records = self.records.write().await;
            let record = records
                .get_mut(name)
                .ok_or_else(|| HealthError::UnknownService(name.to_string()))?;
            record.record(outcome, now)
        };

        match &event {
            Some(TransitionEvent::OutageStarted { error, .. }) => {
                warn!(service = %name, %error, "service is down");
            }
            Some(TransitionEvent::Recovered { outage, .. }) => {
                info!(service = %name, ?outage, "service recovered");
            }
            None => {}
        }
        Ok(event)
    }

    /// Record that the outage alert for `name` was attempted.
    ///
    /// Returns whether the record is now `DownAlerted`.
    pub async fn mark_alerted(&self, name: &str) -> HealthResult<bool> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(name)
            .ok_or_else(|| HealthError::UnknownService(name.to_string()))?;
        Ok(record.mark_alerted())
    }

    pub async fn get(&self, name: &str) -> Option<HealthRecord> {
        self.records.read().await.get(name).cloned()
    }

    /// A consistent copy of every record, ordered by service name.
    pub async fn snapshot(&self) -> BTreeMap<String, HealthRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
