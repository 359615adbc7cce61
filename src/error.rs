//! Error types for rate-limit-aware REST calls.
//!
//! Every way a logical call can end badly is one variant of [`Error`]. The
//! variant chosen by the layer that classified the failure is the variant the
//! caller receives, whether the call was awaited on a [`CallHandle`] or made
//! through the [`blocking`] client: a fail-fast backoff, a transport failure
//! and an ordinary HTTP status error stay distinguishable.
//!
//! [`CallHandle`]: crate::CallHandle
//! [`blocking`]: crate::blocking

use crate::backoff::FailFast;
use http::{HeaderMap, StatusCode};
use std::path::PathBuf;

/// The main error type for REST calls.
///
/// # Examples
///
/// ```no_run
/// use ratewise::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://jira.example.com")?
///     .retry_on_rate_limit(true)
///     .build()?;
///
/// match client.get("/rest/api/2/serverInfo").await {
///     Ok(response) => println!("Success: {:?}", response.data),
///     Err(Error::Http { status, raw_response, .. }) => {
///         eprintln!("HTTP error {}: {}", status, raw_response);
///     }
///     Err(Error::FailFast(fail_fast)) => {
///         eprintln!("Gave up waiting on the rate limiter: {}", fail_fast);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A connection-level failure (refused, reset, DNS, timeout, TLS).
    ///
    /// Never retried.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a status code of 300 or above.
    ///
    /// A 429 only ends up here when retrying is disabled or the retry budget
    /// is spent.
    #[error("HTTP error {status}: {raw_response}")]
    Http {
        /// The HTTP status code
        status: StatusCode,
        /// The reason phrase for the status code
        reason: String,
        /// The raw response body, decoded to text
        raw_response: String,
        /// All response headers
        headers: HeaderMap,
    },

    /// The projected backoff ceiling exceeded the configured maximum wait.
    #[error(transparent)]
    FailFast(#[from] FailFast),

    /// The caller abandoned the logical call before it reached an outcome.
    #[error("Call cancelled")]
    Cancelled,

    /// A successful response carried a body that is not valid JSON.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    Deserialization {
        /// The raw response body that failed to parse
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Invalid client or request configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// A file meant for upload could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        /// The path that was read
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::Deserialization { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Http { raw_response, .. } => Some(raw_response),
            Error::Deserialization { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns the response headers of an HTTP status error.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Error::Http { headers, .. } => Some(headers),
            _ => None,
        }
    }

    /// Returns `true` for a terminal 429 response.
    ///
    /// # Examples
    ///
    /// ```
    /// use ratewise::Error;
    /// use http::{HeaderMap, StatusCode};
    ///
    /// let err = Error::Http {
    ///     status: StatusCode::TOO_MANY_REQUESTS,
    ///     reason: "Too Many Requests".to_string(),
    ///     raw_response: String::new(),
    ///     headers: HeaderMap::new(),
    /// };
    /// assert!(err.is_rate_limited());
    /// assert!(!Error::Cancelled.is_rate_limited());
    /// ```
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::Http { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS)
    }

    /// Returns `true` if retry planning was aborted by the fail-fast rule.
    pub fn is_fail_fast(&self) -> bool {
        matches!(self, Error::FailFast(_))
    }

    /// Returns `true` if the call was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns `true` for connection-level failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// A specialized `Result` type for REST calls.
pub type Result<T> = std::result::Result<T, Error>;
