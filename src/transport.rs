//! Single-attempt HTTP exchange.
//!
//! A [`Transport`] sends one attempt and reads the whole body before
//! returning, so the worker slot held for the attempt covers the full
//! exchange.

use crate::credentials::Credentials;
use crate::request::{Body, RequestDescriptor};
use crate::Result;
use bytes::Bytes;
use futures::future::{self, BoxFuture, FutureExt};
use http::header::{HeaderName, HeaderValue, ACCEPT};
use http::{HeaderMap, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// A fully read response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code
    pub status: StatusCode,
    /// The reason phrase from the status line, when it differs from the
    /// canonical one
    pub reason: Option<String>,
    /// All response headers
    pub headers: HeaderMap,
    /// The undecoded body
    pub body: Bytes,
}

/// Sends one attempt of a request.
pub(crate) trait Transport: Send + Sync + 'static {
    fn send(&self, request: &RequestDescriptor, attempt: u32) -> BoxFuture<'static, Result<RawResponse>>;
}

/// Transport over a shared `reqwest::Client`.
pub(crate) struct ReqwestTransport {
    pub(crate) http_client: reqwest::Client,
    pub(crate) default_headers: HeaderMap,
    pub(crate) credentials: Option<Arc<dyn Credentials>>,
    pub(crate) timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Headers for one attempt. Later sources replace earlier ones by name.
    fn headers(&self, request: &RequestDescriptor) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        merge(&mut headers, &self.default_headers);

        // Jira rejects multipart uploads without it.
        if matches!(request.body, Some(Body::Attachments(_))) {
            headers.insert(
                HeaderName::from_static("x-atlassian-token"),
                HeaderValue::from_static("nocheck"),
            );
        }

        merge(&mut headers, &request.headers);
        headers
    }

    fn build(&self, request: &RequestDescriptor) -> Result<reqwest::RequestBuilder> {
        let mut builder = self
            .http_client
            .request(request.method.clone(), request.url.clone())
            .headers(self.headers(request));

        if let Some(body) = &request.body {
            builder = body.apply(builder)?;
        }

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        // Re-applied on every attempt.
        if let Some(credentials) = &self.credentials {
            builder = credentials.authenticate(builder);
        }

        Ok(builder)
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &RequestDescriptor, attempt: u32) -> BoxFuture<'static, Result<RawResponse>> {
        let builder = match self.build(request) {
            Ok(builder) => builder,
            Err(e) => return future::ready(Err(e)).boxed(),
        };

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            attempt = attempt,
            "Executing HTTP request"
        );

        async move {
            let response = builder.send().await?;
            let status = response.status();
            let reason = response
                .extensions()
                .get::<hyper::ext::ReasonPhrase>()
                .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned());
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, crate::Error>(RawResponse {
                status,
                reason,
                headers,
                body,
            })
        }
        .boxed()
    }
}

/// Copies `source` into `target`, replacing every name `source` sets.
fn merge(target: &mut HeaderMap, source: &HeaderMap) {
    for name in source.keys() {
        target.remove(name);
    }
    for (name, value) in source {
        target.append(name, value.clone());
    }
}
