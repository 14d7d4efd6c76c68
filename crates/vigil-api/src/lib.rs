//! vigil-api — read-only status endpoint.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/health` | Status of every monitored service, keyed by name |
//! | GET | `/health/{name}` | Status of one service |
//!
//! Every request reads a fresh snapshot from the [`StatusTracker`]; nothing
//! is cached.

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use vigil_health::StatusTracker;

pub use handlers::ServiceStatusView;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub tracker: Arc<StatusTracker>,
}

/// Build the status router.
pub fn build_router(tracker: Arc<StatusTracker>) -> Router {
    Router::new()
        .route("/health", get(handlers::list_status))
        .route("/health/{name}", get(handlers::get_status))
        .with_state(ApiState { tracker })
}
