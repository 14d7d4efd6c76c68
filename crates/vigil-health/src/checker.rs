//! Probe executor.
//!
//! Issues one health check against a service, retrying up to
//! `retry_attempts` times. Only the status code is inspected; response
//! bodies are never read.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use tokio::time::Instant;
use tracing::{debug, warn};

use vigil_core::ServiceSpec;

const USER_AGENT: &str = concat!("vigil-health/", env!("CARGO_PKG_VERSION"));

static PROBE_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Client shared by every probe. Timeouts are set per request.
fn probe_client() -> Result<&'static reqwest::Client, String> {
    if let Some(client) = PROBE_CLIENT.get() {
        return Ok(client);
    }
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| describe(&e))?;
    Ok(PROBE_CLIENT.get_or_init(|| client))
}

/// Result of one probe, including all of its retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub success: bool,
    /// Error of the last failed attempt. `None` on success.
    pub error: Option<String>,
    /// Time from the start of the first attempt until the probe finished.
    pub latency: Duration,
}

impl ProbeOutcome {
    pub fn success(latency: Duration) -> Self {
        Self {
            success: true,
            error: None,
            latency,
        }
    }

    pub fn failure(error: impl Into<String>, latency: Duration) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            latency,
        }
    }

    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }
}

/// Probe a service.
///
/// Attempts run strictly one after another. A transport error or a status
/// other than `expected_status` fails the attempt; `retry_delay` is waited
/// between attempts but not after the last one. Latency is measured from
/// the moment the first request is sent.
pub async fn probe(spec: &ServiceSpec) -> ProbeOutcome {
    if spec.retry_attempts == 0 {
        warn!(service = %spec.name, "probe skipped: retry_attempts is zero");
        return ProbeOutcome::failure("no probe attempts configured", Duration::ZERO);
    }

    let prepared = request_parts(spec).and_then(|parts| Ok((probe_client()?, parts)));
    let (client, (method, headers)) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => return ProbeOutcome::failure(e, Duration::ZERO),
    };

    let start = Instant::now();
    let mut last_error = String::new();
    for attempt in 1..=spec.retry_attempts {
        let result = client
            .request(method.clone(), &spec.url)
            .headers(headers.clone())
            .timeout(spec.timeout)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().as_u16() == spec.expected_status => {
                let latency = start.elapsed();
                debug!(service = %spec.name, attempt, ?latency, "probe succeeded");
                return ProbeOutcome::success(latency);
            }
            Ok(resp) => {
                last_error = format!("unexpected status code: {}", resp.status().as_u16());
            }
            Err(e) => {
                last_error = describe(&e);
            }
        }

        debug!(
            service = %spec.name,
            attempt,
            attempts = spec.retry_attempts,
            error = %last_error,
            "probe attempt failed"
        );

        if attempt < spec.retry_attempts && !spec.retry_delay.is_zero() {
            tokio::time::sleep(spec.retry_delay).await;
        }
    }

    ProbeOutcome::failure(last_error, start.elapsed())
}

fn request_parts(spec: &ServiceSpec) -> Result<(Method, HeaderMap), String> {
    let method = Method::from_bytes(spec.method.as_bytes())
        .map_err(|_| format!("invalid method `{}`", spec.method))?;

    let mut headers = HeaderMap::with_capacity(spec.headers.len());
    for (key, value) in &spec.headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| format!("invalid header name `{key}`"))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| format!("invalid value for header `{key}`"))?;
        headers.append(name, value);
    }
    Ok((method, headers))
}

/// Flatten an error and its sources into one line.
fn describe(err: &reqwest::Error) -> String {
    let mut msg = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
