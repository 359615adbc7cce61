//! Rate-limit-aware JSON REST client.
//!
//! The [`Client`] type is the main entry point for making HTTP requests.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    credentials::Credentials,
    executor::{CallHandle, Executor},
    jitter::{Jitter, ThreadRngJitter},
    rate_limit::RateLimitConfig,
    request::{Attachment, Body, RequestDescriptor},
    scheduler::Dispatcher,
    timer::{Timer, TokioTimer},
    transport::ReqwestTransport,
    Error, Response, Result,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Default number of attempts allowed in flight at once per client.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

const NO_PARAMS: [(&str, &str); 0] = [];

/// An HTTP client for JSON REST APIs that sit behind a rate limiter.
///
/// The client is designed to be reused across multiple requests. Clones share
/// one connection pool and one bounded pool of worker slots, so
/// `max_in_flight` caps attempts across every clone.
///
/// Every verb resolves once the whole retry chain of the call is done: a
/// throttled call that is eventually answered yields one [`Response`] whose
/// `attempts` field tells how many requests it took.
///
/// # Examples
///
/// ```no_run
/// use ratewise::Client;
/// use serde::Serialize;
/// use std::time::Duration;
///
/// #[derive(Serialize)]
/// struct Comment {
///     body: String,
/// }
///
/// # async fn example() -> Result<(), ratewise::Error> {
/// let client = Client::builder()
///     .base_url("https://jira.example.com")?
///     .timeout(Duration::from_secs(30))
///     .retry_on_rate_limit(true)
///     .build()?;
///
/// let issue = client.get("/rest/api/2/issue/PROJ-1").await?;
/// println!("Issue: {:?}", issue.data.document());
///
/// let comment = Comment {
///     body: "Fixed in 1.2".to_string(),
/// };
/// let created = client.post("/rest/api/2/issue/PROJ-1/comment", &comment).await?;
/// println!("Created after {} attempts", created.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: Url,
    executor: Executor,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ratewise::Client;
    ///
    /// # async fn example() -> Result<(), ratewise::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://jira.example.com")?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The base URL every path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The rate limit handling in effect.
    pub fn rate_limit_config(&self) -> &RateLimitConfig {
        self.inner.executor.policy()
    }

    /// Builds a request URL from a path and query parameters.
    ///
    /// `path` is appended to the base URL's own path, so a base of
    /// `https://host/jira` keeps its `/jira` prefix. Query parameters are
    /// appended in the order given, after any query the base URL already has.
    ///
    /// # Examples
    ///
    /// ```
    /// use ratewise::Client;
    ///
    /// let client = Client::builder()
    ///     .base_url("https://example.com/jira")
    ///     .unwrap()
    ///     .build()
    ///     .unwrap();
    ///
    /// let url = client.build_url("/rest/api/2/search", [("jql", "project = PROJ"), ("maxResults", "50")]);
    /// assert_eq!(
    ///     url.as_str(),
    ///     "https://example.com/jira/rest/api/2/search?jql=project+%3D+PROJ&maxResults=50"
    /// );
    /// ```
    pub fn build_url<I, K, V>(&self, path: &str, params: I) -> Url
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut url = self.inner.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);

        let mut params = params.into_iter().peekable();
        if params.peek().is_some() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key.as_ref(), value.as_ref());
            }
        }

        url
    }

    /// Starts a logical call without waiting for it.
    ///
    /// The returned [`CallHandle`] resolves once the retry chain reaches a
    /// final outcome. Must be called from within a tokio runtime.
    pub fn submit(&self, request: RequestDescriptor) -> CallHandle {
        self.inner.executor.submit(request)
    }

    /// Runs a logical call to completion.
    ///
    /// Rate limited attempts are retried according to the client's
    /// [`RateLimitConfig`]; every other failure is returned as is.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ratewise::{Body, Client, RequestDescriptor};
    /// use http::Method;
    ///
    /// # async fn example() -> Result<(), ratewise::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://jira.example.com")?
    ///     .retry_on_rate_limit(true)
    ///     .build()?;
    ///
    /// let url = client.build_url("/rest/api/2/issue/PROJ-1/transitions", [("expand", "transitions.fields")]);
    /// let request = RequestDescriptor::new(Method::POST, url)
    ///     .with_header("X-Atlassian-Token", "no-check")?
    ///     .with_body(Body::json(&serde_json::json!({"transition": {"id": "31"}}))?);
    ///
    /// let response = client.call(request).await?;
    /// assert!(response.data.is_no_content());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call(&self, request: RequestDescriptor) -> Result<Response> {
        self.submit(request).await
    }

    /// Makes a GET request to the specified path.
    pub async fn get(&self, path: &str) -> Result<Response> {
        self.get_with_params(path, NO_PARAMS).await
    }

    /// Makes a GET request with query parameters.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ratewise::Client;
    ///
    /// # async fn example() -> Result<(), ratewise::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://jira.example.com")?
    ///     .build()?;
    ///
    /// let page = client
    ///     .get_with_params("/rest/api/2/search", [("jql", "assignee = currentUser()"), ("startAt", "50")])
    ///     .await?;
    /// println!("{}", page.raw_body);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_with_params<I, K, V>(&self, path: &str, params: I) -> Result<Response>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = self.build_url(path, params);
        self.call(RequestDescriptor::new(Method::GET, url)).await
    }

    /// Makes a POST request to the specified path with a JSON body.
    pub async fn post<B>(&self, path: &str, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.send_with_body(Method::POST, path, Body::json(body)?).await
    }

    /// Makes a POST request whose body is `raw` as a single JSON string.
    pub async fn post_text(&self, path: &str, raw: &str) -> Result<Response> {
        self.send_with_body(Method::POST, path, Body::quoted(raw)).await
    }

    /// Uploads files as `multipart/form-data`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ratewise::{Attachment, Client};
    ///
    /// # async fn example() -> Result<(), ratewise::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://jira.example.com")?
    ///     .build()?;
    ///
    /// let log = Attachment::new("build.log", "BUILD FAILED").with_content_type("text/plain");
    /// client.post_attachments("/rest/api/2/issue/PROJ-1/attachments", [log]).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn post_attachments<I>(&self, path: &str, attachments: I) -> Result<Response>
    where
        I: IntoIterator<Item = Attachment>,
    {
        self.send_with_body(Method::POST, path, Body::attachments(attachments))
            .await
    }

    /// Uploads one file from disk as `multipart/form-data`.
    pub async fn post_file(&self, path: &str, file: impl AsRef<Path>) -> Result<Response> {
        let attachment = Attachment::from_path(file).await?;
        self.post_attachments(path, [attachment]).await
    }

    /// Makes a PUT request to the specified path with a JSON body.
    pub async fn put<B>(&self, path: &str, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.send_with_body(Method::PUT, path, Body::json(body)?).await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete(&self, path: &str) -> Result<Response> {
        let url = self.build_url(path, NO_PARAMS);
        self.call(RequestDescriptor::new(Method::DELETE, url)).await
    }

    async fn send_with_body(&self, method: Method, path: &str, body: Body) -> Result<Response> {
        let url = self.build_url(path, NO_PARAMS);
        self.call(RequestDescriptor::new(method, url).with_body(body))
            .await
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use ratewise::{BasicCredentials, ClientBuilder};
/// use ratewise::rate_limit::RateLimitConfig;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), ratewise::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://jira.example.com")?
///     .timeout(Duration::from_secs(30))
///     .credentials(BasicCredentials::new("automation", "secret"))
///     .max_in_flight(4)
///     .rate_limit_config(RateLimitConfig::builder()
///         .enabled(true)
///         .max_wait(Duration::from_secs(60))
///         .build())
///     .default_header("User-Agent", "release-bot/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    credentials: Option<Arc<dyn Credentials>>,
    timeout: Option<Duration>,
    max_in_flight: usize,
    rate_limit_config: RateLimitConfig,
    timer: Arc<dyn Timer>,
    jitter: Arc<dyn Jitter>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            credentials: None,
            timeout: None,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            rate_limit_config: RateLimitConfig::default(),
            timer: Arc::new(TokioTimer),
            jitter: Arc::new(ThreadRngJitter),
        }
    }

    /// Sets the base URL for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the credentials applied to every attempt.
    pub fn credentials(mut self, credentials: impl Credentials + 'static) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    /// Sets the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets how many attempts may be in flight at once across all calls.
    ///
    /// Defaults to [`DEFAULT_MAX_IN_FLIGHT`]. Calls waiting out a backoff do
    /// not count against this limit.
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Turns retrying of 429 responses on or off. Off by default.
    ///
    /// Keeps the limits of the current rate limit configuration.
    pub fn retry_on_rate_limit(mut self, enabled: bool) -> Self {
        self.rate_limit_config.enabled = enabled;
        self
    }

    /// Replaces the rate limit configuration, including its `enabled` flag.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ratewise::{Client, rate_limit::RateLimitConfig};
    /// use std::time::Duration;
    ///
    /// # async fn example() -> Result<(), ratewise::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://jira.example.com")?
    ///     .rate_limit_config(RateLimitConfig::builder()
    ///         .enabled(true)
    ///         .max_retries(3)
    ///         .build())
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = config;
        self
    }

    /// Sets the timer used for backoff waits.
    pub fn timer(mut self, timer: impl Timer) -> Self {
        self.timer = Arc::new(timer);
        self
    }

    /// Sets the random source used to spread backoff waits.
    pub fn jitter(mut self, jitter: impl Jitter + 'static) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided, if the base URL cannot
    /// carry paths, or if `max_in_flight` is zero or larger than
    /// [`Semaphore::MAX_PERMITS`].
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Configuration("Base URL is required".to_string()))?;

        if base_url.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "Base URL cannot carry a path: {}",
                base_url
            )));
        }

        if self.max_in_flight == 0 {
            return Err(Error::Configuration(
                "max_in_flight must be at least 1".to_string(),
            ));
        }

        if self.max_in_flight > Semaphore::MAX_PERMITS {
            return Err(Error::Configuration(format!(
                "max_in_flight must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }

        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let transport = ReqwestTransport {
            http_client,
            default_headers: self.default_headers,
            credentials: self.credentials,
            timeout: self.timeout,
        };

        let dispatcher = Dispatcher {
            slots: Arc::new(Semaphore::new(self.max_in_flight)),
            transport: Arc::new(transport),
            timer: self.timer,
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                base_url,
                executor: Executor::new(dispatcher, self.jitter, self.rate_limit_config),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
