//! Health engine error types.

use thiserror::Error;

pub type HealthResult<T> = Result<T, HealthError>;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("unknown service: {0}")]
    UnknownService(String),
}
