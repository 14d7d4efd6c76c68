//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating a monitor configuration.
///
/// All of them are fatal: the daemon refuses to start on a partially
/// valid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("service `{service}`: {reason}")]
    InvalidService { service: String, reason: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub(crate) fn service(service: &str, reason: impl Into<String>) -> Self {
        Self::InvalidService {
            service: service.to_string(),
            reason: reason.into(),
        }
    }
}
