//! Rate limit signals and retry-on-429 configuration.
//!
//! A [`RateLimitSignal`] is read fresh from every 429 response and feeds the
//! backoff calculation. [`RateLimitConfig`] decides whether a 429 is retried at
//! all, how many times, and how long a projected wait may grow before the call
//! fails fast.

use http::HeaderMap;
use std::time::{Duration, SystemTime};

/// Header carrying the server's explicit wait, in seconds or as an HTTP date.
pub const RETRY_AFTER: &str = "retry-after";

/// Header carrying the length of the token-bucket refill interval, in seconds.
pub const RATE_LIMIT_INTERVAL_SECONDS: &str = "x-ratelimit-interval-seconds";

/// Header carrying how many tokens are added to the bucket per interval.
pub const RATE_LIMIT_FILL_RATE: &str = "x-ratelimit-fillrate";

/// Rate limit data extracted from one response.
///
/// Numeric fields are `None` when the header is absent, unparsable, zero or
/// negative. The raw header text is kept alongside so a fail-fast error can
/// echo exactly what the server sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitSignal {
    /// Seconds to wait, from `Retry-After`.
    pub retry_after_secs: Option<u64>,

    /// Refill interval in seconds, from `X-RateLimit-Interval-Seconds`.
    pub interval_secs: Option<u64>,

    /// Tokens per interval, from `X-RateLimit-FillRate`.
    pub fill_rate: Option<u64>,

    /// The header values as observed, empty when absent.
    pub raw: RawRateLimitHeaders,
}

/// The unparsed rate limit header values of one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRateLimitHeaders {
    /// Raw `Retry-After` value.
    pub retry_after: String,
    /// Raw `X-RateLimit-Interval-Seconds` value.
    pub interval_seconds: String,
    /// Raw `X-RateLimit-FillRate` value.
    pub fill_rate: String,
}

impl RateLimitSignal {
    /// Extracts the rate limit signal from response headers.
    ///
    /// # Examples
    ///
    /// ```
    /// use ratewise::rate_limit::RateLimitSignal;
    /// use http::HeaderMap;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("retry-after", "6".parse().unwrap());
    /// headers.insert("x-ratelimit-fillrate", "soon".parse().unwrap());
    ///
    /// let signal = RateLimitSignal::from_headers(&headers);
    /// assert_eq!(signal.retry_after_secs, Some(6));
    /// assert_eq!(signal.fill_rate, None);
    /// assert_eq!(signal.raw.fill_rate, "soon");
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_headers_at(headers, SystemTime::now())
    }

    /// Like [`from_headers`](Self::from_headers), resolving an HTTP-date
    /// `Retry-After` against `now`.
    pub fn from_headers_at(headers: &HeaderMap, now: SystemTime) -> Self {
        let raw = RawRateLimitHeaders {
            retry_after: header_text(headers, RETRY_AFTER),
            interval_seconds: header_text(headers, RATE_LIMIT_INTERVAL_SECONDS),
            fill_rate: header_text(headers, RATE_LIMIT_FILL_RATE),
        };

        Self {
            retry_after_secs: parse_retry_after(&raw.retry_after, now),
            interval_secs: parse_positive(&raw.interval_seconds),
            fill_rate: parse_positive(&raw.fill_rate),
            raw,
        }
    }

    /// Returns `true` if no usable rate limit header was present.
    pub fn is_empty(&self) -> bool {
        self.retry_after_secs.is_none() && self.interval_secs.is_none() && self.fill_rate.is_none()
    }
}

/// Configuration for retrying 429 responses.
///
/// Retrying is disabled by default, which keeps the single-attempt behavior
/// for callers that do not ask for it.
///
/// # Examples
///
/// ```
/// use ratewise::rate_limit::RateLimitConfig;
/// use std::time::Duration;
///
/// let config = RateLimitConfig::builder()
///     .enabled(true)
///     .max_retries(5)
///     .max_wait(Duration::from_secs(60))
///     .build();
///
/// assert!(config.enabled);
/// assert_eq!(config.max_retries, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Whether a 429 response schedules a retry.
    pub enabled: bool,

    /// Maximum number of retries per logical call. Defaults to 10.
    pub max_retries: u32,

    /// Largest backoff ceiling tolerated before failing fast. Defaults to 120 seconds.
    pub max_wait: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: 10,
            max_wait: Duration::from_secs(120),
        }
    }
}

impl RateLimitConfig {
    /// Creates a new builder for configuring rate limit handling.
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::default()
    }

    /// Creates a disabled rate limit configuration.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Creates an enabled configuration with the default limits.
    pub fn retrying() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }
}

/// Builder for `RateLimitConfig`.
#[derive(Default)]
pub struct RateLimitConfigBuilder {
    enabled: Option<bool>,
    max_retries: Option<u32>,
    max_wait: Option<Duration>,
}

impl RateLimitConfigBuilder {
    /// Sets whether 429 responses are retried.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Sets the maximum number of retries per logical call.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the largest tolerated backoff ceiling.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Builds the `RateLimitConfig`.
    pub fn build(self) -> RateLimitConfig {
        let default = RateLimitConfig::default();
        RateLimitConfig {
            enabled: self.enabled.unwrap_or(default.enabled),
            max_retries: self.max_retries.unwrap_or(default.max_retries),
            max_wait: self.max_wait.unwrap_or(default.max_wait),
        }
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Parses an integer header value, treating anything that is not a positive
/// integer as absent.
fn parse_positive(value: &str) -> Option<u64> {
    value
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .map(|n| n as u64)
}

/// Parses `Retry-After` as delay-seconds, falling back to an HTTP date.
fn parse_retry_after(value: &str, now: SystemTime) -> Option<u64> {
    if let Ok(seconds) = value.parse::<i64>() {
        return (seconds > 0).then_some(seconds as u64);
    }

    let date = httpdate::parse_http_date(value).ok()?;
    let until = date.duration_since(now).ok()?;
    let mut seconds = until.as_secs();
    if until.subsec_nanos() > 0 {
        seconds += 1;
    }
    (seconds > 0).then_some(seconds)
}
