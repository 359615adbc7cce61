//! Timer facility for backoff waits.
//!
//! A retry chain waits on a [`Timer`] in its own task without holding a worker
//! pool slot. Swapping the timer lets tests drive the retry state machine
//! without real delays.

use futures::future::{BoxFuture, FutureExt};
use std::time::Duration;

/// Source of delay futures.
pub trait Timer: Send + Sync + 'static {
    /// Returns a future that completes once `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Timer backed by `tokio::time`. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}
