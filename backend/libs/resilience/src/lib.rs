/// Resilience patterns for calls against external services
///
/// This library provides:
/// - **Retry**: exponential backoff with jitter for rate limiting, fixed delay
///   for transient failures, independent budgets, cooperative cancellation
/// - **Timeout**: a deadline on every call, folded into the caller's error type
/// - **Preset Configurations**: pre-tuned settings for public stats APIs
///
/// # Example: rate-limited HTTP call
///
/// ```rust,no_run
/// use resilience::{presets, with_retry, FailureKind, Retryable};
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug)]
/// struct Throttled;
///
/// impl std::fmt::Display for Throttled {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         f.write_str("429")
///     }
/// }
///
/// impl Retryable for Throttled {
///     fn failure_kind(&self) -> FailureKind {
///         FailureKind::RateLimited
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let config = presets::stats_api_config();
///     let cancel = CancellationToken::new();
///
///     let result = with_retry(&config.retry, &cancel, || async {
///         // Your HTTP call here
///         Ok::<_, Throttled>(())
///     })
///     .await;
/// }
/// ```

pub mod presets;
pub mod retry;
pub mod timeout;

// Re-export main types for convenience
pub use presets::{stats_api_config, ServiceConfig};
pub use retry::{
    with_retry, Backoff, BackoffPolicy, FailureKind, RetryConfig, RetryError, Retryable,
};
pub use timeout::{with_timeout, TimeoutConfig, TimeoutError};
