use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::{algorithm_mismatch, ensure_monotonic};
use crate::clock::format_tick;
use crate::config::LimiterConfig;
use crate::error::{ConfigError, ConfigResult, DecideResult};
use crate::rate_limiter_core::{Decision, RateLimiterCore, Snapshot};
use crate::types::{RequestTotals, Tick, Uint};

/// Configuration structure for a [`FixedWindowCounterCore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedWindowConfig {
    /// Requests allowed per window.
    pub max_count: Uint,
    /// Window length in milliseconds.
    pub window_length: Uint,
}

impl FixedWindowConfig {
    pub fn new(max_count: Uint, window_length: Uint) -> Self {
        Self {
            max_count,
            window_length,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.window_length == 0 {
            return Err(ConfigError::ZeroWindowLength);
        }
        Ok(())
    }
}

/// Result of one fixed window decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FixedWindowDecision {
    pub allowed: bool,
    /// A new window was opened by this request.
    pub window_reset: bool,
}

/// Inspection snapshot of a fixed window counter.
///
/// Window fields are `None` before the first decision and after a reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixedWindowSnapshot {
    pub current_requests: Uint,
    pub max_count: Uint,
    pub window_length: Uint,
    pub window_start: Option<Tick>,
    pub window_start_formatted: Option<String>,
    pub window_end: Option<Tick>,
    pub window_end_formatted: Option<String>,
    /// Milliseconds left in the current window, 0 once it has run out.
    pub time_remaining: Uint,
    pub totals: RequestTotals,
}

/// The active window: when it opened and how many requests it admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    anchor: Tick,
    count: Uint,
}

/// Core implementation of the fixed window counter rate limiting algorithm.
///
/// Windows are anchored at the request that opens them, not aligned to
/// multiples of the window length. A window anchored at `a` covers
/// `[a, a + window_length]`: a request arriving exactly at
/// `a + window_length` still counts against the old window, and only a later
/// request opens a new one.
///
/// Because each window starts with a fresh count, up to `2 * max_count`
/// requests can pass in a short span around a window boundary.
///
/// # Example
///
/// ```rust
/// use rate_engine_core::rate_limiters::{FixedWindowConfig, FixedWindowCounterCore};
///
/// let mut counter = FixedWindowCounterCore::new(FixedWindowConfig::new(2, 100)).unwrap();
///
/// assert!(counter.decide_at(0).unwrap().window_reset);
/// assert!(counter.decide_at(50).unwrap().allowed);
/// assert!(!counter.decide_at(100).unwrap().allowed); // still the first window
///
/// let decision = counter.decide_at(101).unwrap();
/// assert!(decision.allowed && decision.window_reset);
/// ```
#[derive(Debug, Clone)]
pub struct FixedWindowCounterCore {
    config: FixedWindowConfig,
    window: Option<Window>,
    last_tick: Tick,
    totals: RequestTotals,
}

impl FixedWindowCounterCore {
    /// Creates a counter with no open window.
    pub fn new(config: FixedWindowConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(FixedWindowCounterCore {
            config,
            window: None,
            last_tick: 0,
            totals: RequestTotals::default(),
        })
    }

    /// Opens a new window if needed, then counts the request against it.
    pub fn decide_at(&mut self, tick: Tick) -> DecideResult<FixedWindowDecision> {
        ensure_monotonic("fixed_window", self.last_tick, tick)?;
        self.last_tick = tick;

        let window_length = self.config.window_length;
        let expired = |w: &Window| w.anchor.saturating_add(window_length) < tick;

        let window_reset = self.window.map_or(true, |w| expired(&w));
        if window_reset {
            self.window = Some(Window {
                anchor: tick,
                count: 0,
            });
            debug!(tick, "fixed window opened");
        }

        let max_count = self.config.max_count;
        let allowed = match self.window.as_mut() {
            Some(window) if window.count < max_count => {
                window.count += 1;
                self.totals.record_allowed();
                true
            }
            _ => {
                self.totals.record_denied();
                false
            }
        };

        trace!(tick, allowed, window_reset, "fixed window decision");
        Ok(FixedWindowDecision {
            allowed,
            window_reset,
        })
    }

    /// Reports the current window as of `tick`. Never opens or expires a window.
    pub fn status_at(&self, tick: Tick) -> DecideResult<FixedWindowSnapshot> {
        ensure_monotonic("fixed_window", self.last_tick, tick)?;

        let window_length = self.config.window_length;
        let (current_requests, window_start, window_end, time_remaining) = match self.window {
            Some(w) => {
                let end = w.anchor.saturating_add(window_length);
                let remaining = window_length.saturating_sub(tick.saturating_sub(w.anchor));
                (w.count, Some(w.anchor), Some(end), remaining)
            }
            None => (0, None, None, 0),
        };

        Ok(FixedWindowSnapshot {
            current_requests,
            max_count: self.config.max_count,
            window_length,
            window_start,
            window_start_formatted: window_start.map(format_tick),
            window_end,
            window_end_formatted: window_end.map(format_tick),
            time_remaining,
            totals: self.totals,
        })
    }

    /// Drops the open window and zeroes the counters.
    pub fn reset_at(&mut self, tick: Tick) {
        self.window = None;
        self.last_tick = tick;
        self.totals = RequestTotals::default();
        debug!(tick, "fixed window reset");
    }

    /// Replaces the configuration. The open window keeps its anchor and count.
    pub fn reconfigure(&mut self, config: FixedWindowConfig) -> ConfigResult<()> {
        if let Err(err) = config.validate() {
            warn!(%err, "fixed window rejected configuration");
            return Err(err);
        }
        info!(
            max_count = config.max_count,
            window_length = config.window_length,
            "fixed window reconfigured"
        );
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &FixedWindowConfig {
        &self.config
    }

    pub fn totals(&self) -> RequestTotals {
        self.totals
    }
}

impl TryFrom<FixedWindowConfig> for FixedWindowCounterCore {
    type Error = ConfigError;

    fn try_from(config: FixedWindowConfig) -> ConfigResult<Self> {
        FixedWindowCounterCore::new(config)
    }
}

impl RateLimiterCore for FixedWindowCounterCore {
    #[inline(always)]
    fn decide_at(&mut self, tick: Tick) -> DecideResult<Decision> {
        FixedWindowCounterCore::decide_at(self, tick).map(Decision::FixedWindow)
    }

    #[inline(always)]
    fn status_at(&mut self, tick: Tick) -> DecideResult<Snapshot> {
        FixedWindowCounterCore::status_at(self, tick).map(Snapshot::FixedWindow)
    }

    fn reset_at(&mut self, tick: Tick) {
        FixedWindowCounterCore::reset_at(self, tick)
    }

    fn advance_at(&mut self, tick: Tick) -> DecideResult<()> {
        ensure_monotonic("fixed_window", self.last_tick, tick)?;
        self.last_tick = tick;
        Ok(())
    }

    fn reconfigure(&mut self, config: LimiterConfig) -> ConfigResult<()> {
        match config {
            LimiterConfig::FixedWindow(config) => FixedWindowCounterCore::reconfigure(self, config),
            other => Err(algorithm_mismatch("fixed_window", &other)),
        }
    }

    fn current_config(&self) -> LimiterConfig {
        LimiterConfig::FixedWindow(self.config.clone())
    }

    fn totals(&self) -> RequestTotals {
        self.totals
    }
}
