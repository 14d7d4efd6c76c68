//! Scheduler — one background task per monitored service.
//!
//! Each task probes immediately, applies the outcome, dispatches any
//! transition, then sleeps one `check_interval`. The interval is the gap
//! between checks, so a slow probe pushes the next one back by the same
//! amount. Tasks never exit on their own.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use vigil_core::{ServiceSpec, TransitionEvent};
use vigil_notify::AlertDispatcher;

use crate::checker::probe;
use crate::tracker::StatusTracker;

/// Starts the per-service loops.
#[derive(Clone)]
pub struct Monitor {
    tracker: Arc<StatusTracker>,
    dispatcher: Arc<AlertDispatcher>,
}

/// Handles to the running loops.
pub struct MonitorHandle {
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl Monitor {
    pub fn new(tracker: Arc<StatusTracker>, dispatcher: Arc<AlertDispatcher>) -> Self {
        Self {
            tracker,
            dispatcher,
        }
    }

    pub fn tracker(&self) -> &Arc<StatusTracker> {
        &self.tracker
    }

    /// Spawn one loop per service. Must be called inside a tokio runtime.
    pub fn start(&self, services: &[ServiceSpec]) -> MonitorHandle {
        let tasks = services
            .iter()
            .map(|spec| {
                let spec = spec.clone();
                let name = spec.name.clone();
                let tracker = self.tracker.clone();
                let dispatcher = self.dispatcher.clone();
                let handle = tokio::spawn(async move {
                    run_service_loop(spec, tracker, dispatcher).await;
                });
                (name, handle)
            })
            .collect::<Vec<_>>();

        info!(services = tasks.len(), "monitoring started");
        MonitorHandle { tasks }
    }
}

impl MonitorHandle {
    /// Names of services with a running loop.
    pub fn active_services(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Abort every loop. In-flight probes are dropped.
    pub fn abort_all(self) {
        for (name, handle) in self.tasks {
            handle.abort();
            debug!(service = %name, "monitor loop aborted");
        }
        info!("all monitor loops stopped");
    }
}

/// Run a single check: probe, apply, and notify on a transition.
///
/// The transition is committed before anything is dispatched. An outage
/// is marked alerted after the dispatch attempt whatever its result, so a
/// failed notification never causes a second page for the same outage.
pub async fn check_once(
    spec: &ServiceSpec,
    tracker: &StatusTracker,
    dispatcher: &AlertDispatcher,
) -> Option<TransitionEvent> {
    let outcome = probe(spec).await;

    let event = match tracker.apply(&spec.name, &outcome).await {
        Ok(event) => event,
        Err(e) => {
            error!(service = %spec.name, error = %e, "failed to record probe outcome");
            return None;
        }
    };

    if let Some(event) = &event {
        dispatcher.dispatch(event, spec).await;
        if event.is_outage() {
            if let Err(e) = tracker.mark_alerted(&spec.name).await {
                error!(service = %spec.name, error = %e, "failed to mark outage alerted");
            }
        }
    }
    event
}

async fn run_service_loop(
    spec: ServiceSpec,
    tracker: Arc<StatusTracker>,
    dispatcher: Arc<AlertDispatcher>,
) {
    debug!(
        service = %spec.name,
        url = %spec.url,
        interval = ?spec.check_interval,
        "monitor loop starting"
    );

    loop {
        check_once(&spec, &tracker, &dispatcher).await;
        tokio::time::sleep(spec.check_interval).await;
    }
}
