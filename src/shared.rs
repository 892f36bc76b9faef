//! Thread-safe wrapper around a single engine.
//!
//! The engines assume every read-modify-write runs alone. [`SharedLimiter`]
//! puts one mutex around the whole surface (decide, inspect, reset,
//! reconfigure) and never blocks: if the lock is taken the call fails with
//! [`RateLimitError::ContentionFailure`] and the caller decides whether to retry.
//! A lock poisoned by a panicking holder fails every later call with
//! [`RateLimitError::Poisoned`].

use std::sync::{Mutex, TryLockError};

use tracing::{trace, warn};

use crate::config::LimiterConfig;
use crate::error::{ConfigResult, DecideResult, RateLimitError};
use crate::rate_limiter_core::{Decision, RateLimiterCore, Snapshot};
use crate::types::{RequestTotals, Tick};

/// An engine guarded by a non-blocking lock.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use rate_engine_core::SharedLimiter;
/// use rate_engine_core::rate_limiters::{SlidingWindowConfig, SlidingWindowLogCore};
///
/// let core = SlidingWindowLogCore::new(SlidingWindowConfig::new(1, 1000)).unwrap();
/// let limiter = Arc::new(SharedLimiter::new(core));
///
/// assert!(limiter.try_decide_at(0).unwrap().is_allowed());
/// assert!(!limiter.try_decide_at(1).unwrap().is_allowed());
/// ```
#[derive(Debug, Default)]
pub struct SharedLimiter<L> {
    inner: Mutex<L>,
}

impl<L> SharedLimiter<L> {
    pub fn new(limiter: L) -> Self {
        Self {
            inner: Mutex::new(limiter),
        }
    }

    /// Runs `f` with exclusive access to the engine, e.g. to reconfigure it.
    pub fn try_with<R>(&self, f: impl FnOnce(&mut L) -> R) -> DecideResult<R> {
        let mut guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                trace!("shared limiter busy");
                return Err(RateLimitError::ContentionFailure);
            }
            Err(TryLockError::Poisoned(_)) => {
                warn!("shared limiter lock poisoned");
                return Err(RateLimitError::Poisoned);
            }
        };
        Ok(f(&mut *guard))
    }

    /// Gives the engine back.
    pub fn into_inner(self) -> DecideResult<L> {
        self.inner
            .into_inner()
            .map_err(|_| RateLimitError::Poisoned)
    }
}

impl<L: RateLimiterCore> SharedLimiter<L> {
    pub fn try_decide_at(&self, tick: Tick) -> DecideResult<Decision> {
        self.try_with(|limiter| limiter.decide_at(tick))?
    }

    pub fn try_status_at(&self, tick: Tick) -> DecideResult<Snapshot> {
        self.try_with(|limiter| limiter.status_at(tick))?
    }

    pub fn try_reset_at(&self, tick: Tick) -> DecideResult<()> {
        self.try_with(|limiter| limiter.reset_at(tick))
    }

    pub fn try_advance_at(&self, tick: Tick) -> DecideResult<()> {
        self.try_with(|limiter| limiter.advance_at(tick))?
    }

    /// Swaps the configuration. The outer result is the lock, the inner one the config.
    pub fn try_reconfigure(&self, config: LimiterConfig) -> DecideResult<ConfigResult<()>> {
        self.try_with(|limiter| limiter.reconfigure(config))
    }

    pub fn try_totals(&self) -> DecideResult<RequestTotals> {
        self.try_with(|limiter| limiter.totals())
    }
}

impl<L> From<L> for SharedLimiter<L> {
    fn from(limiter: L) -> Self {
        SharedLimiter::new(limiter)
    }
}
