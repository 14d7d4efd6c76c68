//! vigil-health — the monitoring engine.
//!
//! Probes services over HTTP, tracks each service's health, and hands
//! transitions to the alert dispatcher.
//!
//! # Architecture
//!
//! ```text
//! Monitor
//!   ├── Per-service background task (probe, then sleep check_interval)
//!   │   ├── probe(spec) → ProbeOutcome   (retrying, per-attempt timeout)
//!   │   ├── StatusTracker::apply()       (Up/Down state machine)
//!   │   └── AlertDispatcher::dispatch()  (only on transitions)
//!   └── StatusTracker shared with the status endpoint (RwLock)
//! ```
//!
//! # Alert deduplication
//!
//! Only the first failure after `Up` produces an `OutageStarted` event.
//! Further failures while `Down` update the record silently. The first
//! success after an outage produces exactly one `Recovered` event.

pub mod checker;
pub mod error;
pub mod monitor;
pub mod tracker;

pub use checker::{ProbeOutcome, probe};
pub use error::{HealthError, HealthResult};
pub use monitor::{Monitor, MonitorHandle, check_once};
pub use tracker::{Health, HealthRecord, RecordState, StatusTracker};
