//! # Ratewise - A JSON REST client that survives rate limiters
//!
//! Ratewise is an HTTP client built on top of `reqwest` and `tokio` for REST
//! APIs that throttle their callers with `429 Too Many Requests`. Each call
//! runs as its own retry chain: throttled attempts are retried after an
//! informed, fully jittered backoff derived from the server's rate limit
//! headers, and given up early when the projected wait grows too long.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ratewise::{BasicCredentials, Client};
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! struct Myself {
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ratewise::Error> {
//!     let client = Client::builder()
//!         .base_url("https://jira.example.com")?
//!         .credentials(BasicCredentials::new("automation", "secret"))
//!         .timeout(Duration::from_secs(30))
//!         .retry_on_rate_limit(true)
//!         .build()?;
//!
//!     let me = client.get("/rest/api/2/myself").await?.json::<Myself>()?;
//!     println!("Logged in as {} after {} attempts", me.data.name, me.attempts);
//!
//!     let issue = serde_json::json!({
//!         "fields": { "project": { "key": "PROJ" }, "summary": "Nightly build failed" }
//!     });
//!     let created = client.post("/rest/api/2/issue", &issue).await?;
//!     println!("Created: {:?}", created.data.document());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Rate limit handling
//!
//! Retrying is off by default. When it is on, a 429 response is retried up to
//! [`RateLimitConfig::max_retries`](rate_limit::RateLimitConfig) times. The
//! base delay comes from `Retry-After`, or from
//! `X-RateLimit-Interval-Seconds / X-RateLimit-FillRate`, or is one second;
//! the ceiling doubles with every retry and the wait is drawn uniformly up to
//! it. A ceiling beyond `max_wait` ends the call with [`Error::FailFast`].
//!
//! Attempts hold one of `max_in_flight` worker slots while they are on the
//! wire and give it back while they wait, so a throttled call never starves
//! the others.
//!
//! ## Error Handling
//!
//! ```no_run
//! use ratewise::{Client, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().base_url("https://jira.example.com")?.build()?;
//! match client.get("/rest/api/2/issue/PROJ-1").await {
//!     Ok(response) => println!("Success: {:?}", response.data),
//!     Err(Error::Http { status, reason, raw_response, .. }) => {
//!         eprintln!("HTTP {} {}: {}", status.as_u16(), reason, raw_response);
//!     }
//!     Err(Error::FailFast(fail_fast)) => {
//!         eprintln!("Gave up after a {:?} ceiling: {}", fail_fast.ceiling, fail_fast);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! A synchronous client lives in [`blocking`].

pub mod backoff;
pub mod blocking;
mod cancel;
mod client;
mod credentials;
pub mod decode;
mod error;
mod executor;
pub mod jitter;
pub mod rate_limit;
mod request;
mod response;
mod scheduler;
pub mod timer;
mod transport;

pub use cancel::CancelToken;
pub use client::{Client, ClientBuilder, DEFAULT_MAX_IN_FLIGHT};
pub use credentials::{AnonymousCredentials, BasicCredentials, BearerCredentials, Credentials};
pub use error::{Error, Result};
pub use executor::CallHandle;
pub use request::{Attachment, Body, RequestDescriptor};
pub use response::{Outcome, Response};
pub use transport::RawResponse;
