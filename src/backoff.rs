//! Informed full-jitter backoff for 429 responses.
//!
//! The base delay comes from the server's rate limit headers when it sends
//! any, and from a one second default otherwise. The ceiling doubles with
//! every retry and the actual wait is drawn uniformly from `1..=ceiling`, so
//! clients throttled at the same moment spread out instead of returning
//! together. Once the ceiling outgrows the configured maximum wait the
//! calculation gives up rather than parking the call for minutes.

use crate::jitter::Jitter;
use crate::rate_limit::RateLimitSignal;
use std::fmt;
use std::time::Duration;

const DEFAULT_BASE_MS: u64 = 1000;

/// Bases at or below this are doubled to keep requests spaced out.
const SMALL_BASE_MS: u64 = 100;

/// Outcome of a backoff calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffDecision {
    /// Re-attempt after this long.
    Wait(Duration),
    /// Stop retrying; the projected wait is too long to be useful.
    FailFast(FailFast),
}

/// The projected backoff ceiling exceeded the maximum wait.
///
/// The message names the ceiling in whole seconds and echoes the rate limit
/// headers that produced it.
///
/// # Examples
///
/// ```
/// use ratewise::backoff::FailFast;
/// use std::time::Duration;
///
/// let fail_fast = FailFast {
///     ceiling: Duration::from_secs(240),
///     retry_after: String::new(),
///     interval_seconds: "60".to_string(),
///     fill_rate: "1".to_string(),
/// };
///
/// assert_eq!(
///     fail_fast.to_string(),
///     "Fail-fast: Exponential backoff ceiling (240s) exceeds threshold. \
///      Relevant headers: Retry-After: [], X-RateLimit-Interval-Seconds: [60], \
///      X-RateLimit-FillRate: [1]"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailFast {
    /// The computed ceiling.
    pub ceiling: Duration,
    /// Raw `Retry-After` value, empty when absent.
    pub retry_after: String,
    /// Raw `X-RateLimit-Interval-Seconds` value, empty when absent.
    pub interval_seconds: String,
    /// Raw `X-RateLimit-FillRate` value, empty when absent.
    pub fill_rate: String,
}

impl fmt::Display for FailFast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fail-fast: Exponential backoff ceiling ({}s) exceeds threshold. \
             Relevant headers: Retry-After: [{}], X-RateLimit-Interval-Seconds: [{}], \
             X-RateLimit-FillRate: [{}]",
            self.ceiling.as_secs(),
            self.retry_after,
            self.interval_seconds,
            self.fill_rate
        )
    }
}

impl std::error::Error for FailFast {}

/// Computes the wait before the next retry.
///
/// `attempt` counts retries already scheduled for the logical call, so the
/// computation after the first 429 uses `attempt = 0`.
///
/// # Examples
///
/// ```
/// use ratewise::backoff::{compute_wait, BackoffDecision};
/// use ratewise::jitter::ThreadRngJitter;
/// use ratewise::rate_limit::RateLimitSignal;
/// use std::time::Duration;
///
/// let signal = RateLimitSignal {
///     retry_after_secs: Some(6),
///     ..Default::default()
/// };
///
/// match compute_wait(&signal, 1, Duration::from_secs(120), &ThreadRngJitter) {
///     BackoffDecision::Wait(wait) => assert!(wait <= Duration::from_secs(12)),
///     BackoffDecision::FailFast(f) => panic!("unexpected fail-fast: {}", f),
/// }
/// ```
pub fn compute_wait(
    signal: &RateLimitSignal,
    attempt: u32,
    max_wait: Duration,
    jitter: &dyn Jitter,
) -> BackoffDecision {
    let mut base = base_delay_ms(signal);
    if base <= SMALL_BASE_MS {
        base *= 2;
    }
    if base == 0 {
        base = 1;
    }

    let ceiling = ceiling_ms(base, attempt);
    if u128::from(ceiling) > max_wait.as_millis() {
        return BackoffDecision::FailFast(FailFast {
            ceiling: Duration::from_millis(ceiling),
            retry_after: signal.raw.retry_after.clone(),
            interval_seconds: signal.raw.interval_seconds.clone(),
            fill_rate: signal.raw.fill_rate.clone(),
        });
    }

    BackoffDecision::Wait(Duration::from_millis(jitter.between(1, ceiling)))
}

fn base_delay_ms(signal: &RateLimitSignal) -> u64 {
    if let Some(retry_after) = signal.retry_after_secs {
        return retry_after.saturating_mul(1000);
    }
    match (signal.interval_secs, signal.fill_rate) {
        (Some(interval), Some(fill_rate)) => interval.saturating_mul(1000) / fill_rate,
        _ => DEFAULT_BASE_MS,
    }
}

/// `2^attempt * base`, saturating at `u64::MAX`.
fn ceiling_ms(base: u64, attempt: u32) -> u64 {
    1u64.checked_shl(attempt)
        .and_then(|factor| factor.checked_mul(base))
        .unwrap_or(u64::MAX)
}
