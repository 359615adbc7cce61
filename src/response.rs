//! Response wrapper that preserves both the decoded outcome and raw response details.
//!
//! The [`Response`] type carries the decoded body along with metadata about the
//! logical call: status, headers, raw body text, total latency across retries
//! and the number of attempts it took.

use crate::{Error, Result};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// The decoded body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A parsed JSON tree.
    Document(serde_json::Value),
    /// The response body was empty.
    NoContent,
}

impl Outcome {
    /// Returns `true` for an empty body.
    pub fn is_no_content(&self) -> bool {
        matches!(self, Outcome::NoContent)
    }

    /// Returns the document, if there is one.
    pub fn document(&self) -> Option<&serde_json::Value> {
        match self {
            Outcome::Document(value) => Some(value),
            Outcome::NoContent => None,
        }
    }

    /// Consumes the outcome, returning the document if there is one.
    pub fn into_document(self) -> Option<serde_json::Value> {
        match self {
            Outcome::Document(value) => Some(value),
            Outcome::NoContent => None,
        }
    }
}

/// A successful response to a logical call.
///
/// # Examples
///
/// ```no_run
/// use ratewise::Client;
///
/// # async fn example() -> Result<(), ratewise::Error> {
/// let client = Client::builder()
///     .base_url("https://jira.example.com")?
///     .retry_on_rate_limit(true)
///     .build()?;
///
/// let response = client.get("/rest/api/2/issue/PROJ-1").await?;
///
/// println!("Status: {}", response.status);
/// println!("Took {:?} over {} attempts", response.latency, response.attempts);
/// if let Some(issue) = response.data.document() {
///     println!("Summary: {}", issue["fields"]["summary"]);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T = Outcome> {
    /// The decoded response data.
    pub data: T,

    /// The raw response body, decoded to text.
    pub raw_body: String,

    /// The HTTP status code of the final attempt.
    pub status: StatusCode,

    /// The headers of the final attempt.
    pub headers: HeaderMap,

    /// Time from the first dispatch to the final response, including backoff waits.
    pub latency: Duration,

    /// The number of attempts made, `1` when no retry was needed.
    pub attempts: u32,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: u32,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Maps the response data, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ratewise::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     "42".to_string(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    ///     1,
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the call needed at least one retry.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl Response<Outcome> {
    /// Deserializes the document into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Deserialization`] if the body was empty or does not
    /// match `U`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ratewise::{Outcome, Response};
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// #[derive(serde::Deserialize)]
    /// struct Version {
    ///     name: String,
    /// }
    ///
    /// let response = Response::new(
    ///     Outcome::Document(serde_json::json!({"name": "1.0"})),
    ///     r#"{"name":"1.0"}"#.to_string(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::ZERO,
    ///     1,
    /// );
    ///
    /// let version = response.json::<Version>().unwrap();
    /// assert_eq!(version.data.name, "1.0");
    /// ```
    pub fn json<U: DeserializeOwned>(self) -> Result<Response<U>> {
        let value = match &self.data {
            Outcome::Document(value) => value.clone(),
            Outcome::NoContent => {
                return Err(Error::Deserialization {
                    raw_response: self.raw_body,
                    serde_error: "response had no content".to_string(),
                    status: self.status,
                })
            }
        };

        match serde_json::from_value::<U>(value) {
            Ok(data) => Ok(self.map(|_| data)),
            Err(e) => Err(Error::Deserialization {
                raw_response: self.raw_body,
                serde_error: e.to_string(),
                status: self.status,
            }),
        }
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
