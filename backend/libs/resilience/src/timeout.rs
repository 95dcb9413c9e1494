/// Per-call deadlines for upstream requests
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeoutConfig {
    pub duration: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Operation timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// Run a fallible future under a deadline, folding an elapsed deadline into
/// the caller's own error type.
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(TimeoutError(duration).into()),
    }
}
