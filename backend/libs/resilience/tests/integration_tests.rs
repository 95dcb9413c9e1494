/// Integration tests for resilience library
use resilience::{
    presets,
    retry::{with_retry, BackoffPolicy, FailureKind, RetryConfig, RetryError, Retryable},
    timeout::{with_timeout, TimeoutError},
};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
enum CallError {
    Throttled,
    ServerError,
    NotFound,
    TimedOut,
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Retryable for CallError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            CallError::Throttled => FailureKind::RateLimited,
            CallError::ServerError | CallError::TimedOut => FailureKind::Transient,
            CallError::NotFound => FailureKind::Permanent,
        }
    }
}

impl From<TimeoutError> for CallError {
    fn from(_: TimeoutError) -> Self {
        CallError::TimedOut
    }
}

fn config(rate_limit_base_ms: u64) -> RetryConfig {
    RetryConfig {
        rate_limited: BackoffPolicy::exponential(
            5,
            Duration::from_millis(rate_limit_base_ms),
            Duration::from_secs(5),
        ),
        transient: BackoffPolicy::fixed(2, Duration::from_millis(5)),
    }
}

// ==================== Retry Tests ====================

#[tokio::test]
async fn test_three_rate_limits_then_success_waits_for_backoff() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let start = std::time::Instant::now();
    let result = with_retry(&config(20), &CancellationToken::new(), move || {
        let count = counter_clone.fetch_add(1, Ordering::SeqCst);
        async move {
            if count < 3 {
                Err(CallError::Throttled)
            } else {
                Ok("payload")
            }
        }
    })
    .await;
    let elapsed = start.elapsed();

    assert_eq!(result.unwrap(), "payload");
    assert_eq!(counter.load(Ordering::SeqCst), 4);
    // Nominal 20 + 40 + 80 = 140ms, jitter can shave at most 20%
    assert!(elapsed >= Duration::from_millis(112), "{:?}", elapsed);
}

#[tokio::test]
async fn test_rate_limit_budget_exhausted() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let result = with_retry(&config(1), &CancellationToken::new(), move || {
        counter_clone.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(CallError::Throttled) }
    })
    .await;

    assert!(matches!(
        result,
        Err(RetryError::Exhausted {
            attempts: 6,
            last: CallError::Throttled
        })
    ));
    assert_eq!(counter.load(Ordering::SeqCst), 6); // Initial + 5 retries
}

#[tokio::test]
async fn test_server_errors_use_transient_budget() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let result = with_retry(&config(1), &CancellationToken::new(), move || {
        counter_clone.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(CallError::ServerError) }
    })
    .await;

    assert_eq!(result.unwrap_err().attempts(), Some(3));
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_not_found_fails_fast() {
    let result = with_retry(&config(1), &CancellationToken::new(), || async {
        Err::<(), _>(CallError::NotFound)
    })
    .await;

    assert!(matches!(result, Err(RetryError::Permanent(CallError::NotFound))));
}

// ==================== Timeout + Retry ====================

#[tokio::test]
async fn test_timeouts_are_retried_as_transient() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let result = with_retry(&config(1), &CancellationToken::new(), move || {
        let count = counter_clone.fetch_add(1, Ordering::SeqCst);
        with_timeout(Duration::from_millis(20), async move {
            if count == 0 {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok::<_, CallError>(count)
        })
    })
    .await;

    assert_eq!(result.unwrap(), 1);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cancel_stops_in_flight_call() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let start = std::time::Instant::now();
    let result = with_retry(&config(1), &cancel, || async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok::<_, CallError>(())
    })
    .await;

    assert!(matches!(result, Err(RetryError::Cancelled { attempts: 1 })));
    assert!(start.elapsed() < Duration::from_secs(5));
}

// ==================== Preset Tests ====================

#[test]
fn test_stats_api_preset_values() {
    let config = presets::stats_api_config();
    assert_eq!(config.timeout.duration, Duration::from_secs(10));
    assert_eq!(
        config.retry.rate_limited.nominal_delay(2),
        Duration::from_secs(4)
    );
    assert_eq!(config.retry.transient.max_retries, 2);
}
