//! The retry chain of one logical call.
//!
//! Each logical call runs as an explicit state machine:
//!
//! ```text
//! Dispatching ──▶ AwaitingResponse ──▶ Terminal(outcome)
//!      ▲                  │
//!      └── Retrying(wait) ◀┘   (429, retries enabled, budget left)
//! ```
//!
//! Deciding what a response means is a plain method,
//! [`RetryChain::on_response`], with no I/O. The async driver,
//! [`RetryChain::run`], only moves between states: it holds a worker slot while
//! an attempt is in flight, releases it before waiting, and checks the cancel
//! token at every suspension point.

use crate::backoff::{compute_wait, BackoffDecision};
use crate::cancel::CancelToken;
use crate::decode::decode;
use crate::jitter::Jitter;
use crate::rate_limit::{RateLimitConfig, RateLimitSignal};
use crate::request::RequestDescriptor;
use crate::response::Response;
use crate::timer::Timer;
use crate::transport::{RawResponse, Transport};
use crate::{Error, Result};
use futures::future::BoxFuture;
use http::StatusCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Retries scheduled so far for one logical call.
///
/// Starts at 0 and grows by exactly one per scheduled retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AttemptState {
    retries: u32,
}

impl AttemptState {
    /// Index passed to the backoff calculation.
    pub(crate) fn index(&self) -> u32 {
        self.retries
    }

    /// Requests sent so far, counting the one in flight.
    pub(crate) fn requests(&self) -> u32 {
        self.retries + 1
    }

    fn advance(&mut self) {
        self.retries += 1;
    }
}

pub(crate) enum CallState {
    Dispatching,
    AwaitingResponse {
        response: BoxFuture<'static, Result<RawResponse>>,
        _slot: OwnedSemaphorePermit,
    },
    Retrying {
        wait: Duration,
    },
    Terminal(Result<Response>),
}

impl std::fmt::Debug for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallState::Dispatching => f.write_str("Dispatching"),
            CallState::AwaitingResponse { .. } => f.write_str("AwaitingResponse"),
            CallState::Retrying { wait } => f.debug_struct("Retrying").field("wait", wait).finish(),
            CallState::Terminal(outcome) => f.debug_tuple("Terminal").field(outcome).finish(),
        }
    }
}

/// Resources shared by every retry chain of one client.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    pub(crate) slots: Arc<Semaphore>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) timer: Arc<dyn Timer>,
}

pub(crate) struct RetryChain {
    request: Arc<RequestDescriptor>,
    attempt: AttemptState,
    policy: RateLimitConfig,
    jitter: Arc<dyn Jitter>,
    started: Instant,
}

impl RetryChain {
    pub(crate) fn new(request: Arc<RequestDescriptor>, policy: RateLimitConfig, jitter: Arc<dyn Jitter>) -> Self {
        Self {
            request,
            attempt: AttemptState::default(),
            policy,
            jitter,
            started: Instant::now(),
        }
    }

    #[cfg(test)]
    pub(crate) fn attempt(&self) -> AttemptState {
        self.attempt
    }

    /// Decides what happens after a response arrives.
    ///
    /// A 429 is retried only when retrying is enabled and the retry budget is
    /// not spent; every other response, and a 429 past the budget, is decoded
    /// as the final outcome.
    pub(crate) fn on_response(&mut self, raw: RawResponse) -> CallState {
        let retryable = raw.status == StatusCode::TOO_MANY_REQUESTS
            && self.policy.enabled
            && self.attempt.index() < self.policy.max_retries;

        if !retryable {
            return CallState::Terminal(decode(raw, self.attempt.requests(), self.started.elapsed()));
        }

        let signal = RateLimitSignal::from_headers(&raw.headers);
        match compute_wait(&signal, self.attempt.index(), self.policy.max_wait, self.jitter.as_ref()) {
            BackoffDecision::Wait(wait) => {
                tracing::warn!(
                    method = %self.request.method,
                    url = %self.request.url,
                    attempt = self.attempt.index(),
                    wait_ms = wait.as_millis(),
                    "Rate limited - waiting before retry"
                );
                self.attempt.advance();
                CallState::Retrying { wait }
            }
            BackoffDecision::FailFast(fail_fast) => {
                tracing::warn!(
                    method = %self.request.method,
                    url = %self.request.url,
                    attempt = self.attempt.index(),
                    error = %fail_fast,
                    "Rate limited - giving up"
                );
                CallState::Terminal(Err(Error::FailFast(fail_fast)))
            }
        }
    }

    /// Drives the chain to a terminal outcome.
    pub(crate) async fn run(mut self, dispatcher: &Dispatcher, cancel: &CancelToken) -> Result<Response> {
        let mut state = CallState::Dispatching;
        loop {
            state = match state {
                CallState::Dispatching => self.dispatch(dispatcher, cancel).await,
                CallState::AwaitingResponse { response, _slot } => {
                    let received = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        result = response => Some(result),
                    };
                    drop(_slot);

                    match received {
                        None => CallState::Terminal(Err(Error::Cancelled)),
                        Some(Ok(raw)) => {
                            tracing::info!(
                                status = raw.status.as_u16(),
                                latency_ms = self.started.elapsed().as_millis(),
                                attempt = self.attempt.index(),
                                method = %self.request.method,
                                url = %self.request.url,
                                "Received HTTP response"
                            );
                            self.on_response(raw)
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                error = %e,
                                attempt = self.attempt.index(),
                                method = %self.request.method,
                                url = %self.request.url,
                                "Request failed"
                            );
                            CallState::Terminal(Err(e))
                        }
                    }
                }
                CallState::Retrying { wait } => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => CallState::Terminal(Err(Error::Cancelled)),
                        _ = dispatcher.timer.sleep(wait) => CallState::Dispatching,
                    }
                }
                CallState::Terminal(outcome) => return outcome,
            };
        }
    }

    async fn dispatch(&self, dispatcher: &Dispatcher, cancel: &CancelToken) -> CallState {
        if cancel.is_cancelled() {
            return CallState::Terminal(Err(Error::Cancelled));
        }

        let slot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return CallState::Terminal(Err(Error::Cancelled)),
            slot = dispatcher.slots.clone().acquire_owned() => slot,
        };

        match slot {
            Ok(slot) => CallState::AwaitingResponse {
                response: dispatcher.transport.send(&self.request, self.attempt.index()),
                _slot: slot,
            },
            // The pool only closes when the client shuts down.
            Err(_) => CallState::Terminal(Err(Error::Cancelled)),
        }
    }
}
