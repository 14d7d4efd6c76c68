//! Status handlers.
//!
//! `/health` returns a bare JSON object keyed by service name. The
//! single-service route uses the `{success, data, error}` envelope so a
//! missing service can be reported.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use vigil_health::HealthRecord;

use crate::ApiState;

/// Public projection of a [`HealthRecord`].
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatusView {
    /// `true` while the service is up.
    pub status: bool,
    pub last_check: Option<DateTime<Utc>>,
    pub last_error: String,
    pub failure_count: u32,
    /// Human-readable latency of the last probe, e.g. `12.5ms`.
    pub response_time: String,
    pub response_time_ms: u64,
    pub alert_active: bool,
    pub recovered_at: Option<DateTime<Utc>>,
}

impl From<&HealthRecord> for ServiceStatusView {
    fn from(record: &HealthRecord) -> Self {
        Self {
            status: record.is_up(),
            last_check: record.last_check,
            last_error: record.last_error.clone(),
            failure_count: record.failure_count,
            response_time: format!("{:?}", record.latency),
            response_time_ms: u64::try_from(record.latency.as_millis()).unwrap_or(u64::MAX),
            alert_active: record.alert_active,
            recovered_at: record.recovered_at,
        }
    }
}

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// GET /health
pub async fn list_status(
    State(state): State<ApiState>,
) -> Json<BTreeMap<String, ServiceStatusView>> {
    let snapshot = state.tracker.snapshot().await;
    debug!(services = snapshot.len(), "status requested");
    Json(
        snapshot
            .iter()
            .map(|(name, record)| (name.clone(), ServiceStatusView::from(record)))
            .collect(),
    )
}

/// GET /health/{name}
pub async fn get_status(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.tracker.get(&name).await {
        Some(record) => Json(ApiResponse {
            success: true,
            data: Some(ServiceStatusView::from(&record)),
            error: None,
        })
        .into_response(),
        None => error_response("service not found", StatusCode::NOT_FOUND).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vigil_health::Health;

    #[test]
    fn view_projects_record_fields() {
        let mut record = HealthRecord::new("api");
        record.health = Health::Down;
        record.failure_count = 3;
        record.last_error = "unexpected status code: 502".to_string();
        record.latency = Duration::from_millis(1250);
        record.alert_active = true;

        let view = ServiceStatusView::from(&record);
        assert!(!view.status);
        assert_eq!(view.failure_count, 3);
        assert_eq!(view.response_time, "1.25s");
        assert_eq!(view.response_time_ms, 1250);
        assert!(view.alert_active);
        assert_eq!(view.last_check, None);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["last_error"], "unexpected status code: 502");
        assert!(json["last_check"].is_null());
    }
}
