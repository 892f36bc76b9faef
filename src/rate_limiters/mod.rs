//! Rate limiting decision engines.
//!
//! Each engine is a plain single-owner state machine driven by caller-supplied
//! millisecond ticks. Wrap one in a [`SharedLimiter`](crate::SharedLimiter)
//! when several threads need it.
//!
//! # Available Algorithms
//!
//! - **[`TokenBucketCore`]** - bursts up to capacity, refilled by interval or greedily
//! - **[`FixedWindowCounterCore`]** - count per window anchored at its first request
//! - **[`SlidingWindowLogCore`]** - exact count over the trailing window
//! - **[`LeakyBucketCore`]** - constant drain with a bounded waiting queue
//!
//! # Algorithm Comparison
//!
//! | Algorithm | Memory Usage | Accuracy | Burst Handling | Inspection |
//! |-----------|-------------|----------|----------------|------------|
//! | Token Bucket | Low | High | Allow bursts | Read-only |
//! | Fixed Window | Low | Medium | Boundary bursts | Read-only |
//! | Sliding Window Log | O(max_count) | Exact | Smooth | Prunes |
//! | Leaky Bucket | O(capacity) | High | Queued | Leaks |

use tracing::warn;

use crate::config::LimiterConfig;
use crate::error::{ConfigError, DecideResult, RateLimitError};
use crate::types::Tick;

pub mod token_bucket_core;
pub use token_bucket_core::{
    RefillStrategy, TokenBucketConfig, TokenBucketCore, TokenBucketDecision, TokenBucketSnapshot,
};

pub mod fixed_window_counter_core;
pub use fixed_window_counter_core::{
    FixedWindowConfig, FixedWindowCounterCore, FixedWindowDecision, FixedWindowSnapshot,
};

pub mod sliding_window_log_core;
pub use sliding_window_log_core::{
    SlidingWindowConfig, SlidingWindowDecision, SlidingWindowLogCore, SlidingWindowSnapshot,
};

pub mod leaky_bucket_core;
pub use leaky_bucket_core::{
    LeakyBucketConfig, LeakyBucketCore, LeakyBucketDecision, LeakyBucketSnapshot, QueuedRequest,
};

/// Prevent time from going backwards.
pub(crate) fn ensure_monotonic(engine: &'static str, last_tick: Tick, tick: Tick) -> DecideResult<()> {
    if tick < last_tick {
        warn!(engine, tick, min_acceptable_tick = last_tick, "rejected expired tick");
        return Err(RateLimitError::ExpiredTick {
            min_acceptable_tick: last_tick,
        });
    }
    Ok(())
}

/// Rejects a configuration meant for another engine.
pub(crate) fn algorithm_mismatch(expected: &'static str, config: &LimiterConfig) -> ConfigError {
    let err = ConfigError::AlgorithmMismatch {
        expected,
        found: config.algorithm(),
    };
    warn!(engine = expected, %err, "rejected configuration");
    err
}
