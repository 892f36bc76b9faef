//! Core trait for rate limiter algorithms.
//!
//! This module defines the uniform capability shared by every engine:
//! decide on a request, inspect state, advance time, reconfigure, reset. Each
//! engine also offers inherent
//! methods returning its own concrete records; the trait wraps those into the
//! closed [`Decision`] and [`Snapshot`] enums so engines can be swapped behind
//! a `Box<dyn RateLimiterCore>`.

use serde::Serialize;

use crate::config::LimiterConfig;
use crate::error::{ConfigResult, DecideResult};
use crate::rate_limiters::{
    FixedWindowDecision, FixedWindowSnapshot, LeakyBucketDecision, LeakyBucketSnapshot,
    SlidingWindowDecision, SlidingWindowSnapshot, TokenBucketDecision, TokenBucketSnapshot,
};
pub use crate::types::{RequestTotals, Tick, Uint};

/// The core trait implemented by all rate limiter algorithms.
pub trait RateLimiterCore: Send {
    /// Decides on one request arriving at `tick`.
    ///
    /// # Returns
    /// * `Ok(Decision)` with the algorithm-specific outcome
    /// * `Err(RateLimitError::ExpiredTick)` if `tick` is older than a tick already seen
    fn decide_at(&mut self, tick: Tick) -> DecideResult<Decision>;

    /// Returns a render-ready snapshot as of `tick`.
    ///
    /// Sliding windows prune and leaky buckets leak before reporting; token
    /// buckets and fixed windows leave their state untouched.
    fn status_at(&mut self, tick: Tick) -> DecideResult<Snapshot>;

    /// Zeroes counters and clears transient state, keeping the configuration.
    fn reset_at(&mut self, tick: Tick);

    /// Applies the time elapsed up to `tick` without a request.
    ///
    /// Token buckets refill, leaky buckets leak and drain their queue, sliding
    /// windows prune. Fixed windows only record the tick. This is the hook for
    /// a periodic driver.
    fn advance_at(&mut self, tick: Tick) -> DecideResult<()>;

    /// Replaces the configuration between calls.
    ///
    /// # Returns
    /// * `Err(ConfigError::AlgorithmMismatch)` if `config` names another algorithm
    /// * any validation error of the engine's own config; the engine is left untouched
    fn reconfigure(&mut self, config: LimiterConfig) -> ConfigResult<()>;

    /// The active configuration, tagged by algorithm.
    fn current_config(&self) -> LimiterConfig;

    /// Request counters accumulated since construction or the last reset.
    fn totals(&self) -> RequestTotals;
}

/// Outcome of a single decision, one variant per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum Decision {
    TokenBucket(TokenBucketDecision),
    FixedWindow(FixedWindowDecision),
    SlidingWindow(SlidingWindowDecision),
    LeakyBucket(LeakyBucketDecision),
}

impl Decision {
    /// True when the request was admitted immediately.
    pub fn is_allowed(&self) -> bool {
        match self {
            Decision::TokenBucket(d) => d.allowed,
            Decision::FixedWindow(d) => d.allowed,
            Decision::SlidingWindow(d) => d.allowed,
            Decision::LeakyBucket(d) => d.allowed,
        }
    }

    /// True when the request was parked in a leaky bucket queue.
    pub fn is_queued(&self) -> bool {
        matches!(self, Decision::LeakyBucket(d) if d.queued)
    }

    /// True when the request was neither admitted nor queued.
    pub fn is_denied(&self) -> bool {
        !self.is_allowed() && !self.is_queued()
    }
}

/// Inspection snapshot, one variant per engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum Snapshot {
    TokenBucket(TokenBucketSnapshot),
    FixedWindow(FixedWindowSnapshot),
    SlidingWindow(SlidingWindowSnapshot),
    LeakyBucket(LeakyBucketSnapshot),
}

impl Snapshot {
    /// Request counters carried by the snapshot.
    pub fn totals(&self) -> RequestTotals {
        match self {
            Snapshot::TokenBucket(s) => s.totals,
            Snapshot::FixedWindow(s) => s.totals,
            Snapshot::SlidingWindow(s) => s.totals,
            Snapshot::LeakyBucket(s) => s.totals,
        }
    }
}

impl<T: RateLimiterCore + ?Sized> RateLimiterCore for Box<T> {
    #[inline(always)]
    fn decide_at(&mut self, tick: Tick) -> DecideResult<Decision> {
        (**self).decide_at(tick)
    }

    #[inline(always)]
    fn status_at(&mut self, tick: Tick) -> DecideResult<Snapshot> {
        (**self).status_at(tick)
    }

    fn reset_at(&mut self, tick: Tick) {
        (**self).reset_at(tick)
    }

    fn advance_at(&mut self, tick: Tick) -> DecideResult<()> {
        (**self).advance_at(tick)
    }

    fn reconfigure(&mut self, config: LimiterConfig) -> ConfigResult<()> {
        (**self).reconfigure(config)
    }

    fn current_config(&self) -> LimiterConfig {
        (**self).current_config()
    }

    fn totals(&self) -> RequestTotals {
        (**self).totals()
    }
}
