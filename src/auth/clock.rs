//! Time source for the rate limiter.

use std::fmt::Debug;
use std::time::Instant;

/// Source of monotonic time.
///
/// Injected into [`RateLimiter`](super::rate_limit::RateLimiter) so window
/// arithmetic can be driven by a controllable clock in tests.
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Production clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
pub use mock::MockClock;
