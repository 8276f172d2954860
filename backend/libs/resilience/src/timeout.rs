/// Deadline wrapper for fallible async operations
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("operation timed out after {0:?}")]
    Elapsed(Duration),
    #[error("operation failed: {0}")]
    Inner(String),
}

impl TimeoutError {
    /// True when the deadline fired, as opposed to the operation itself failing.
    pub fn is_elapsed(&self) -> bool {
        matches!(self, TimeoutError::Elapsed(_))
    }
}

/// Run a fallible future under a deadline.
///
/// The inner error is flattened into [`TimeoutError::Inner`] so call sites can
/// treat "too slow" and "failed" uniformly as recoverable.
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match timeout(duration, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TimeoutError::Inner(e.to_string())),
        Err(_) => Err(TimeoutError::Elapsed(duration)),
    }
}
