//! Monitor configuration parser.
//!
//! The document is JSON by default. Files ending in `.toml` are parsed as
//! TOML with the same schema. Durations accept either an integer number of
//! seconds or a string such as `"500ms"`, `"5s"` or `"2m"`.

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_PAGERDUTY_EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub services: Vec<ServiceSpec>,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

/// One monitored service. Immutable once loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSpec {
    /// Unique service name, used as the tracker and incident key.
    pub name: String,
    /// Absolute http(s) URL to probe.
    pub url: String,
    /// HTTP method, `GET` unless configured.
    #[serde(default = "default_method")]
    pub method: String,
    /// Extra request headers sent on every attempt.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Status code a healthy response must carry.
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    /// Per-attempt request timeout.
    #[serde(default = "default_timeout", deserialize_with = "de_duration")]
    pub timeout: Duration,
    #[serde(default = "default_check_interval", deserialize_with = "de_duration")]
    pub check_interval: Duration,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default, deserialize_with = "de_duration")]
    pub retry_delay: Duration,
    /// Critical services page on outage.
    #[serde(default, rename = "critical_service")]
    pub critical: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    pub slack: Option<SlackConfig>,
    pub pagerduty: Option<PagerDutyConfig>,
    /// Timeout for each outbound notification request.
    #[serde(default = "default_notify_timeout", deserialize_with = "de_duration")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub webhook_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagerDutyConfig {
    #[serde(default)]
    pub service_key: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_events_url")]
    pub events_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            slack: None,
            pagerduty: None,
            timeout: default_notify_timeout(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_expected_status() -> u16 {
    200
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_check_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_retry_attempts() -> u32 {
    1
}

fn default_notify_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_events_url() -> String {
    DEFAULT_PAGERDUTY_EVENTS_URL.to_string()
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

impl MonitorConfig {
    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content)?,
            _ => Self::from_json_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document without validating it.
    pub fn from_json_str(s: &str) -> ConfigResult<Self> {
        serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse a TOML document without validating it.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check every service spec and reject duplicate names.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for spec in &self.services {
            spec.validate()?;
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate service name `{}`",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// The chat webhook settings, if a webhook URL is set.
    pub fn slack(&self) -> Option<&SlackConfig> {
        self.alerts.slack.as_ref().filter(|s| s.is_configured())
    }

    /// The paging settings, if a service key is set.
    pub fn pagerduty(&self) -> Option<&PagerDutyConfig> {
        self.alerts.pagerduty.as_ref().filter(|p| p.is_configured())
    }
}

impl SlackConfig {
    pub fn is_configured(&self) -> bool {
        !self.webhook_url.trim().is_empty()
    }
}

impl PagerDutyConfig {
    pub fn is_configured(&self) -> bool {
        !self.service_key.trim().is_empty()
    }
}

impl ServiceSpec {
    /// A spec with defaults for everything but name and URL.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: default_method(),
            headers: BTreeMap::new(),
            expected_status: default_expected_status(),
            timeout: default_timeout(),
            check_interval: default_check_interval(),
            retry_attempts: default_retry_attempts(),
            retry_delay: Duration::ZERO,
            critical: false,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("service name must not be empty".to_string()));
        }
        let name = self.name.as_str();

        let uri: http::Uri = self
            .url
            .parse()
            .map_err(|e| ConfigError::service(name, format!("invalid url `{}`: {e}", self.url)))?;
        if !matches!(uri.scheme_str(), Some("http" | "https")) || uri.authority().is_none() {
            return Err(ConfigError::service(
                name,
                format!("url `{}` must be an absolute http(s) url", self.url),
            ));
        }

        http::Method::from_bytes(self.method.as_bytes())
            .map_err(|_| ConfigError::service(name, format!("invalid method `{}`", self.method)))?;

        for (key, value) in &self.headers {
            http::HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ConfigError::service(name, format!("invalid header name `{key}`")))?;
            http::HeaderValue::from_str(value).map_err(|_| {
                ConfigError::service(name, format!("invalid value for header `{key}`"))
            })?;
        }

        if !(100..=599).contains(&self.expected_status) {
            return Err(ConfigError::service(
                name,
                format!("expected_status {} is not a valid status code", self.expected_status),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::service(name, "retry_attempts must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::service(name, "timeout must be greater than zero"));
        }
        if self.check_interval.is_zero() {
            return Err(ConfigError::service(name, "check_interval must be greater than zero"));
        }
        Ok(())
    }
}

fn de_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration `{text}`"))),
    }
}

/// Parse a duration string like "5s", "500ms", "2m", "1h".
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours.trim()
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
