use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::{algorithm_mismatch, ensure_monotonic};
use crate::clock::format_tick;
use crate::config::LimiterConfig;
use crate::error::{ConfigError, ConfigResult, DecideResult};
use crate::rate_limiter_core::{Decision, RateLimiterCore, Snapshot};
use crate::types::{RequestTotals, Tick, Uint};

/// Configuration structure for a [`SlidingWindowLogCore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlidingWindowConfig {
    /// Requests allowed within any window.
    pub max_count: Uint,
    /// Window length in milliseconds.
    pub window_length: Uint,
}

impl SlidingWindowConfig {
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

/// Result of one sliding window decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlidingWindowDecision {
    pub allowed: bool,
}

/// Inspection snapshot of a sliding window log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlidingWindowSnapshot {
    /// Admitted request ticks still inside the window, oldest first.
    pub request_timestamps: Vec<Tick>,
    pub request_count: Uint,
    pub max_count: Uint,
    pub window_length: Uint,
    pub current_time: Tick,
    pub oldest_request: Option<String>,
    pub newest_request: Option<String>,
    pub totals: RequestTotals,
}

/// Core implementation of the sliding window log rate limiting algorithm.
///
/// The limiter remembers the tick of every admitted request. Before each
/// decision or inspection it forgets ticks older than the window: a tick `t`
/// is dropped when `now - t > window_length`, so a request exactly one window
/// old still counts. A request is admitted while fewer than `max_count` ticks
/// remain.
///
/// Inspection prunes too, so a snapshot always reflects the window ending at
/// the inspection tick.
///
/// # Example
///
/// ```rust
/// use rate_engine_core::rate_limiters::{SlidingWindowConfig, SlidingWindowLogCore};
///
/// let mut log = SlidingWindowLogCore::new(SlidingWindowConfig::new(2, 1000)).unwrap();
///
/// assert!(log.decide_at(0).unwrap().allowed);
/// assert!(log.decide_at(0).unwrap().allowed);
/// assert!(!log.decide_at(500).unwrap().allowed);
/// assert!(log.decide_at(1001).unwrap().allowed);
/// ```
#[derive(Debug, Clone)]
pub struct SlidingWindowLogCore {
    config: SlidingWindowConfig,
    /// Admitted ticks in ascending order.
    timestamps: VecDeque<Tick>,
    last_tick: Tick,
    totals: RequestTotals,
}

impl SlidingWindowLogCore {
    pub fn new(config: SlidingWindowConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(SlidingWindowLogCore {
            config,
            timestamps: VecDeque::new(),
            last_tick: 0,
            totals: RequestTotals::default(),
        })
    }

    /// Prunes expired ticks, then admits the request if the window has room.
    pub fn decide_at(&mut self, tick: Tick) -> DecideResult<SlidingWindowDecision> {
        ensure_monotonic("sliding_window", self.last_tick, tick)?;
        self.last_tick = tick;
        self.prune(tick);

        let allowed = (self.timestamps.len() as Uint) < self.config.max_count;
        if allowed {
            self.timestamps.push_back(tick);
            self.totals.record_allowed();
        } else {
            self.totals.record_denied();
        }

        trace!(tick, allowed, in_window = self.timestamps.len(), "sliding window decision");
        Ok(SlidingWindowDecision { allowed })
    }

    /// Prunes expired ticks and reports the window ending at `tick`.
    pub fn status_at(&mut self, tick: Tick) -> DecideResult<SlidingWindowSnapshot> {
        ensure_monotonic("sliding_window", self.last_tick, tick)?;
        self.last_tick = tick;
        self.prune(tick);

        let request_timestamps: Vec<Tick> = self.timestamps.iter().copied().collect();
        Ok(SlidingWindowSnapshot {
            request_count: request_timestamps.len() as Uint,
            oldest_request: request_timestamps.first().copied().map(format_tick),
            newest_request: request_timestamps.last().copied().map(format_tick),
            request_timestamps,
            max_count: self.config.max_count,
            window_length: self.config.window_length,
            current_time: tick,
            totals: self.totals,
        })
    }

    /// Forgets every remembered request and zeroes the counters.
    pub fn reset_at(&mut self, tick: Tick) {
        self.timestamps.clear();
        self.last_tick = tick;
        self.totals = RequestTotals::default();
        debug!(tick, "sliding window reset");
    }

    /// Replaces the configuration.
    ///
    /// Remembered ticks are kept. After lowering `max_count` the log may hold
    /// more entries than the new limit until they age out; no request is
    /// admitted meanwhile.
    pub fn reconfigure(&mut self, config: SlidingWindowConfig) -> ConfigResult<()> {
        if let Err(err) = config.validate() {
            warn!(%err, "sliding window rejected configuration");
            return Err(err);
        }
        info!(
            max_count = config.max_count,
            window_length = config.window_length,
            "sliding window reconfigured"
        );
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &SlidingWindowConfig {
        &self.config
    }

    pub fn totals(&self) -> RequestTotals {
        self.totals
    }

    fn prune(&mut self, tick: Tick) {
        let window_length = self.config.window_length;
        let before = self.timestamps.len();
        while let Some(&oldest) = self.timestamps.front() {
            if tick.saturating_sub(oldest) > window_length {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        let pruned = before - self.timestamps.len();
        if pruned > 0 {
            debug!(tick, pruned, "sliding window pruned expired requests");
        }
    }
}

impl TryFrom<SlidingWindowConfig> for SlidingWindowLogCore {
    type Error = ConfigError;

    fn try_from(config: SlidingWindowConfig) -> ConfigResult<Self> {
        SlidingWindowLogCore::new(config)
    }
}

impl RateLimiterCore for SlidingWindowLogCore {
    #[inline(always)]
    fn decide_at(&mut self, tick: Tick) -> DecideResult<Decision> {
        SlidingWindowLogCore::decide_at(self, tick).map(Decision::SlidingWindow)
    }

    #[inline(always)]
    fn status_at(&mut self, tick: Tick) -> DecideResult<Snapshot> {
        SlidingWindowLogCore::status_at(self, tick).map(Snapshot::SlidingWindow)
    }

    fn reset_at(&mut self, tick: Tick) {
        SlidingWindowLogCore::reset_at(self, tick)
    }

    fn advance_at(&mut self, tick: Tick) -> DecideResult<()> {
        ensure_monotonic("sliding_window", self.last_tick, tick)?;
        self.last_tick = tick;
        self.prune(tick);
        Ok(())
    }

    fn reconfigure(&mut self, config: LimiterConfig) -> ConfigResult<()> {
        match config {
            LimiterConfig::SlidingWindow(config) => SlidingWindowLogCore::reconfigure(self, config),
            other => Err(algorithm_mismatch("sliding_window", &other)),
        }
    }

    fn current_config(&self) -> LimiterConfig {
        LimiterConfig::SlidingWindow(self.config.clone())
    }

    fn totals(&self) -> RequestTotals {
        self.totals
    }
}
