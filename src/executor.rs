//! Request execution: one spawned retry chain per logical call.
//!
//! The executor shares a bounded pool of worker slots, a timer and a jitter
//! source across every call it runs. Calls proceed independently; attempts
//! within one call never overlap.

use crate::cancel::CancelToken;
use crate::jitter::Jitter;
use crate::rate_limit::RateLimitConfig;
use crate::request::RequestDescriptor;
use crate::response::Response;
use crate::scheduler::{Dispatcher, RetryChain};
use crate::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

pub(crate) struct Executor {
    dispatcher: Dispatcher,
    jitter: Arc<dyn Jitter>,
    policy: RateLimitConfig,
}

impl Executor {
    pub(crate) fn new(dispatcher: Dispatcher, jitter: Arc<dyn Jitter>, policy: RateLimitConfig) -> Self {
        Self {
            dispatcher,
            jitter,
            policy,
        }
    }

    pub(crate) fn policy(&self) -> &RateLimitConfig {
        &self.policy
    }

    /// Starts a logical call and returns a handle to its outcome.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn submit(&self, request: RequestDescriptor) -> CallHandle {
        let cancel = CancelToken::new();
        let (tx, rx) = oneshot::channel();

        let chain = RetryChain::new(Arc::new(request), self.policy.clone(), Arc::clone(&self.jitter));
        let dispatcher = self.dispatcher.clone();
        let token = cancel.clone();
        tokio::spawn(async move {
            let outcome = chain.run(&dispatcher, &token).await;
            // The caller may have stopped listening.
            let _ = tx.send(outcome);
        });

        CallHandle { outcome: rx, cancel }
    }
}

/// The pending outcome of a logical call.
///
/// Awaiting the handle yields the final [`Response`] or the classified
/// [`Error`] exactly as the retry chain produced it. Dropping the handle
/// cancels the call, including any backoff wait in progress.
///
/// # Examples
///
/// ```no_run
/// use ratewise::{Client, Error};
/// use http::Method;
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://jira.example.com")?
///     .retry_on_rate_limit(true)
///     .build()?;
///
/// let url = client.build_url("/rest/api/2/search", [("jql", "project = PROJ")]);
/// let handle = client.submit(ratewise::RequestDescriptor::new(Method::GET, url));
///
/// // ... later, if the result is no longer needed:
/// handle.cancel();
/// assert!(matches!(handle.await, Err(Error::Cancelled) | Ok(_)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CallHandle {
    outcome: oneshot::Receiver<Result<Response>>,
    cancel: CancelToken,
}

impl CallHandle {
    /// Cancels the call at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns a token that cancels this call.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

impl Future for CallHandle {
    type Output = Result<Response>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.outcome).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // The chain was torn down with its runtime before finishing.
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for CallHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
