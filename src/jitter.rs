//! Random sources for backoff jitter.
//!
//! The jitter source is injected into the client rather than held in a global,
//! so tests can pin the draw and callers can share one seeded generator across
//! every concurrent retry chain.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// A thread-safe source of uniformly distributed wait times.
///
/// # Examples
///
/// ```
/// use ratewise::jitter::Jitter;
///
/// /// Always waits the full ceiling.
/// struct Ceiling;
///
/// impl Jitter for Ceiling {
///     fn between(&self, _low: u64, high: u64) -> u64 {
///         high
///     }
/// }
///
/// assert_eq!(Ceiling.between(1, 800), 800);
/// ```
pub trait Jitter: Send + Sync {
    /// Draws a value uniformly from `low..=high`.
    ///
    /// Implementations return `low` when `high <= low`.
    fn between(&self, low: u64, high: u64) -> u64;
}

/// Jitter drawn from the thread-local generator. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl Jitter for ThreadRngJitter {
    fn between(&self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }
}

/// Jitter from a seeded generator, reproducible across runs.
///
/// # Examples
///
/// ```
/// use ratewise::jitter::{Jitter, SeededJitter};
///
/// let a = SeededJitter::new(7);
/// let b = SeededJitter::new(7);
/// assert_eq!(a.between(1, 1000), b.between(1, 1000));
/// ```
#[derive(Debug)]
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    /// Creates a generator from a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Jitter for SeededJitter {
    fn between(&self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        // A panic while drawing leaves the generator usable.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(low..=high)
    }
}
