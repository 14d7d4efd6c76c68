//! Notification error types.

use thiserror::Error;

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{backend} rejected the notification with status {status}")]
    Rejected { backend: &'static str, status: u16 },
}

/// Turn a non-2xx backend response into [`NotifyError::Rejected`].
pub(crate) fn ensure_success(
    backend: &'static str,
    response: reqwest::Response,
) -> NotifyResult<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(NotifyError::Rejected {
            backend,
            status: status.as_u16(),
        })
    }
}
