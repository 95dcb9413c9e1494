/// Preset configurations for upstream types
use crate::retry::{BackoffPolicy, RetryConfig};
use crate::timeout::TimeoutConfig;
use std::time::Duration;

/// Configuration bundle for an upstream
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub timeout: TimeoutConfig,
    pub retry: RetryConfig,
}

/// Public stats APIs (rate limited, occasionally slow)
///
/// - Timeout: 10s
/// - 429: 5 retries, 1s base doubling up to 30s, ±20% jitter
/// - Transient: 2 retries, fixed 500ms
pub fn stats_api_config() -> ServiceConfig {
    ServiceConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(10),
        },
        retry: RetryConfig {
            rate_limited: BackoffPolicy::exponential(
                5,
                Duration::from_secs(1),
                Duration::from_secs(30),
            ),
            transient: BackoffPolicy::fixed(2, Duration::from_millis(500)),
        },
    }
}
