//! A blocking client for callers without an async runtime.
//!
//! [`Client`] owns a multi-threaded tokio runtime and blocks the calling thread
//! until the whole retry chain of a call resolves, backoff waits included.
//! Do not use it from inside an async context: blocking a runtime worker on
//! another runtime panics.
//!
//! # Examples
//!
//! ```no_run
//! use ratewise::blocking::Client;
//!
//! # fn example() -> Result<(), ratewise::Error> {
//! let client = Client::builder()
//!     .base_url("https://jira.example.com")?
//!     .retry_on_rate_limit(true)
//!     .worker_threads(2)
//!     .build()?;
//!
//! let myself = client.get("/rest/api/2/myself")?;
//! println!("{}", myself.raw_body);
//! # Ok(())
//! # }
//! ```

use crate::{
    credentials::Credentials,
    jitter::Jitter,
    rate_limit::RateLimitConfig,
    request::{Attachment, RequestDescriptor},
    timer::Timer,
    Error, Response, Result,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use url::Url;

/// Synchronous counterpart of [`crate::Client`].
///
/// Clones share the runtime, the connection pool and the worker slots.
#[derive(Clone)]
pub struct Client {
    inner: crate::Client,
    runtime: Arc<Runtime>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The async client driven by this one.
    pub fn async_client(&self) -> &crate::Client {
        &self.inner
    }

    /// See [`crate::Client::build_url`].
    pub fn build_url<I, K, V>(&self, path: &str, params: I) -> Url
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.inner.build_url(path, params)
    }

    /// Runs a logical call to completion, blocking the current thread.
    pub fn call(&self, request: RequestDescriptor) -> Result<Response> {
        self.runtime.block_on(self.inner.call(request))
    }

    /// Makes a GET request to the specified path.
    pub fn get(&self, path: &str) -> Result<Response> {
        self.runtime.block_on(self.inner.get(path))
    }

    /// Makes a GET request with query parameters.
    pub fn get_with_params<I, K, V>(&self, path: &str, params: I) -> Result<Response>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.runtime
            .block_on(self.inner.get_with_params(path, params))
    }

    /// Makes a POST request with a JSON body.
    pub fn post<B>(&self, path: &str, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.runtime.block_on(self.inner.post(path, body))
    }

    /// Makes a POST request whose body is `raw` as a single JSON string.
    pub fn post_text(&self, path: &str, raw: &str) -> Result<Response> {
        self.runtime.block_on(self.inner.post_text(path, raw))
    }

    /// Uploads files as `multipart/form-data`.
    pub fn post_attachments<I>(&self, path: &str, attachments: I) -> Result<Response>
    where
        I: IntoIterator<Item = Attachment>,
    {
        self.runtime
            .block_on(self.inner.post_attachments(path, attachments))
    }

    /// Uploads one file from disk as `multipart/form-data`.
    pub fn post_file(&self, path: &str, file: impl AsRef<Path>) -> Result<Response> {
        self.runtime.block_on(self.inner.post_file(path, file))
    }

    /// Makes a PUT request with a JSON body.
    pub fn put<B>(&self, path: &str, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.runtime.block_on(self.inner.put(path, body))
    }

    /// Makes a DELETE request to the specified path.
    pub fn delete(&self, path: &str) -> Result<Response> {
        self.runtime.block_on(self.inner.delete(path))
    }
}

/// Builder for a blocking [`Client`].
///
/// Accepts every option of [`crate::ClientBuilder`] plus the size of the
/// runtime's worker pool.
pub struct ClientBuilder {
    inner: crate::ClientBuilder,
    worker_threads: Option<usize>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            inner: crate::ClientBuilder::new(),
            worker_threads: None,
        }
    }

    /// Sets the base URL for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.inner = self.inner.base_url(url)?;
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        self.inner = self.inner.default_header(name, value)?;
        Ok(self)
    }

    /// Sets the credentials applied to every attempt.
    pub fn credentials(mut self, credentials: impl Credentials + 'static) -> Self {
        self.inner = self.inner.credentials(credentials);
        self
    }

    /// Sets the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    /// Sets how many attempts may be in flight at once across all calls.
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.inner = self.inner.max_in_flight(max_in_flight);
        self
    }

    /// Turns retrying of 429 responses on or off. Off by default.
    pub fn retry_on_rate_limit(mut self, enabled: bool) -> Self {
        self.inner = self.inner.retry_on_rate_limit(enabled);
        self
    }

    /// Replaces the rate limit configuration, including its `enabled` flag.
    pub fn rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.inner = self.inner.rate_limit_config(config);
        self
    }

    /// Sets the timer used for backoff waits.
    pub fn timer(mut self, timer: impl Timer) -> Self {
        self.inner = self.inner.timer(timer);
        self
    }

    /// Sets the random source used to spread backoff waits.
    pub fn jitter(mut self, jitter: impl Jitter + 'static) -> Self {
        self.inner = self.inner.jitter(jitter);
        self
    }

    /// Sets the number of runtime worker threads. Defaults to one per core.
    pub fn worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = Some(worker_threads);
        self
    }

    /// Starts the runtime and builds the client.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`crate::ClientBuilder::build`], and a
    /// configuration error if `worker_threads` is zero or the runtime fails
    /// to start.
    pub fn build(self) -> Result<Client> {
        let mut runtime = tokio::runtime::Builder::new_multi_thread();
        runtime.enable_all().thread_name("ratewise-worker");

        if let Some(worker_threads) = self.worker_threads {
            if worker_threads == 0 {
                return Err(Error::Configuration(
                    "worker_threads must be at least 1".to_string(),
                ));
            }
            runtime.worker_threads(worker_threads);
        }

        let runtime = runtime
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to start runtime: {}", e)))?;

        Ok(Client {
            inner: self.inner.build()?,
            runtime: Arc::new(runtime),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
