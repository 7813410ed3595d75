//! Fixed-window rate limiter keyed by credential.
//!
//! Each key gets a window of `window` length that starts with its first
//! request. Up to `capacity` requests are admitted per window; further
//! requests are rejected without being counted until the window elapses.
//!
//! # Limitations
//!
//! State is process-local and best-effort. It is not coordinated across
//! server instances and resets on restart, so N instances admit up to
//! N x `capacity` requests per window. Do not treat it as a billing-grade
//! guarantee.
//!
//! Admission itself is cheap, but each admitted request also spawns a detached
//! `last_used_at` update (see `RequestGuard::record_use`) and handlers spawn one
//! task per usage event. Neither is bounded.

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::clock::Clock;

/// Default number of requests admitted per window.
pub const DEFAULT_CAPACITY: u32 = 100;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Request counter for one key within its current window.
#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    pub window_start: Instant,
    pub count: u32,
}

/// Outcome of a [`RateLimiter::check_and_consume`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests still available in the current window.
    pub remaining: u32,
    /// Time until the current window elapses.
    pub reset_after: Duration,
}

#[derive(Debug)]
pub struct RateLimiter<K>
where
    K: Eq + Hash,
{
    windows: DashMap<K, RateWindow>,
    capacity: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl<K> RateLimiter<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            capacity,
            window,
            clock,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count one request for `key` and report whether it is admitted.
    pub fn check_and_consume(&self, key: &K) -> RateDecision {
        let now = self.clock.now();

        // The entry guard holds the shard lock, so the read-modify-write below
        // is atomic per key.
        let mut entry = self.windows.entry(key.clone()).or_insert(RateWindow {
            window_start: now,
            count: 0,
        });

        if now.saturating_duration_since(entry.window_start) >= self.window {
            *entry = RateWindow {
                window_start: now,
                count: 0,
            };
        }

        let reset_after = self
            .window
            .saturating_sub(now.saturating_duration_since(entry.window_start));

        if entry.count >= self.capacity {
            return RateDecision {
                allowed: false,
                remaining: 0,
                reset_after,
            };
        }

        entry.count += 1;

        RateDecision {
            allowed: true,
            remaining: self.capacity - entry.count,
            reset_after,
        }
    }

    /// Drop windows that have fully elapsed. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.window_start) < self.window);
        before - self.windows.len()
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}
