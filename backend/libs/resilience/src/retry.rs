/// Retry policy with separate handling for rate limiting and transient failures
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How a failed attempt should be treated by [`with_retry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Upstream signalled rate limiting (HTTP 429)
    RateLimited,
    /// Timeout, 5xx, malformed payload
    Transient,
    /// Retrying cannot change the outcome
    Permanent,
}

/// Errors that know whether another attempt is worthwhile
pub trait Retryable {
    fn failure_kind(&self) -> FailureKind;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// `base * 2^attempt`, capped at `max`
    Exponential { base: Duration, max: Duration },
    Fixed(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Retries allowed after the first failure of this kind
    pub max_retries: u32,
    pub backoff: Backoff,
    /// Symmetric jitter fraction (0.2 = ±20%)
    pub jitter: f64,
}

impl BackoffPolicy {
    pub fn exponential(max_retries: u32, base: Duration, max: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Exponential { base, max },
            jitter: 0.2,
        }
    }

    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed(delay),
            jitter: 0.0,
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Delay before retry number `attempt` (0-based) before jitter is applied
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt);
                base.saturating_mul(factor).min(max)
            }
            Backoff::Fixed(delay) => delay,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let nominal = self.nominal_delay(attempt);
        if self.jitter <= 0.0 {
            return nominal;
        }

        let spread = self.jitter.min(1.0);
        let factor = 1.0 + rand::thread_rng().gen_range(-spread..=spread);
        nominal.mul_f64(factor)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub rate_limited: BackoffPolicy,
    pub transient: BackoffPolicy,
}

impl RetryConfig {
    fn policy_for(&self, kind: FailureKind) -> Option<&BackoffPolicy> {
        match kind {
            FailureKind::RateLimited => Some(&self.rate_limited),
            FailureKind::Transient => Some(&self.transient),
            FailureKind::Permanent => None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            rate_limited: BackoffPolicy::exponential(
                5,
                Duration::from_secs(1),
                Duration::from_secs(30),
            ),
            transient: BackoffPolicy::fixed(2, Duration::from_millis(500)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    #[error("Operation failed permanently: {0}")]
    Permanent(E),
    #[error("Cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> Option<u32> {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Cancelled { attempts } => {
                Some(*attempts)
            }
            RetryError::Permanent(_) => None,
        }
    }
}

/// Execute `f` until it succeeds, fails permanently, exhausts the budget of
/// its failure kind, or `cancel` fires.
///
/// Rate-limit and transient failures draw from independent budgets, so a
/// burst of 429s does not eat into the allowance for timeouts.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let mut attempts = 0u32;
    let mut rate_limited_retries = 0u32;
    let mut transient_retries = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled { attempts });
        }
        attempts += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled { attempts }),
            outcome = f() => outcome,
        };

        let err = match outcome {
            Ok(value) => {
                if attempts > 1 {
                    debug!(attempts, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        let kind = err.failure_kind();
        let Some(policy) = config.policy_for(kind) else {
            return Err(RetryError::Permanent(err));
        };

        let counter = match kind {
            FailureKind::RateLimited => &mut rate_limited_retries,
            _ => &mut transient_retries,
        };
        if *counter >= policy.max_retries {
            warn!(
                attempts,
                kind = ?kind,
                error = %err,
                "Max retries ({}) reached",
                policy.max_retries
            );
            return Err(RetryError::Exhausted { attempts, last: err });
        }

        let delay = policy.delay(*counter);
        *counter += 1;

        warn!(
            attempt = attempts,
            kind = ?kind,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying after failure"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled { attempts }),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
