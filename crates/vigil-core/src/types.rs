//! Shared types used across Vigil crates.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// A health transition worth notifying about.
///
/// Produced by the status tracker, consumed by the alert dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionEvent {
    /// First failure after the service was up.
    OutageStarted {
        service: String,
        error: String,
        at: DateTime<Utc>,
    },
    /// First success after an outage.
    Recovered {
        service: String,
        /// Time since the record entered `Down`.
        outage: Duration,
        at: DateTime<Utc>,
    },
}

impl TransitionEvent {
    pub fn service(&self) -> &str {
        match self {
            TransitionEvent::OutageStarted { service, .. }
            | TransitionEvent::Recovered { service, .. } => service,
        }
    }

    pub fn is_outage(&self) -> bool {
        matches!(self, TransitionEvent::OutageStarted { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransitionEvent::OutageStarted { .. } => "outage_started",
            TransitionEvent::Recovered { .. } => "recovered",
        }
    }
}

/// Render a downtime rounded to whole seconds, e.g. `1h2m5s` or `42s`.
pub fn format_downtime(d: Duration) -> String {
    let mut secs = d.as_secs();
    if d.subsec_millis() >= 500 {
        secs += 1;
    }
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m{s}s"),
        _ => format!("{h}h{m}m{s}s"),
    }
}
