use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::{algorithm_mismatch, ensure_monotonic};
use crate::clock::format_tick;
use crate::config::LimiterConfig;
use crate::error::{ConfigError, ConfigResult, DecideResult};
use crate::rate_limiter_core::{Decision, RateLimiterCore, Snapshot};
use crate::types::{RequestTotals, Tick, Uint};

/// How elapsed time is turned into tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefillStrategy {
    /// Tokens arrive in bursts of `tokens_per_period` once a whole period has elapsed.
    #[default]
    Interval,
    /// Tokens arrive one at a time, every `period / tokens_per_period` milliseconds.
    Greedy,
}

/// Configuration structure for a [`TokenBucketCore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBucketConfig {
    /// Maximum number of tokens the bucket can hold.
    pub capacity: Uint,
    /// Refill period in milliseconds.
    pub period: Uint,
    /// Tokens added per period.
    pub tokens_per_period: Uint,
    #[serde(default)]
    pub strategy: RefillStrategy,
}

impl TokenBucketConfig {
    /// Creates an interval-refill configuration.
    pub fn new(capacity: Uint, period: Uint, tokens_per_period: Uint) -> Self {
        Self {
            capacity,
            period,
            tokens_per_period,
            strategy: RefillStrategy::Interval,
        }
    }

    pub fn with_strategy(mut self, strategy: RefillStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Rejects a zero period. Zero capacity (deny everything) and zero
    /// tokens per period (never refill) are accepted.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.period == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }
}

/// Result of one token bucket decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenBucketDecision {
    pub allowed: bool,
    /// Tokens the refill pass preceding this decision put into the bucket.
    pub tokens_added: Uint,
}

/// Inspection snapshot of a token bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenBucketSnapshot {
    pub current_tokens: Uint,
    pub capacity: Uint,
    pub period: Uint,
    pub tokens_per_period: Uint,
    pub strategy: RefillStrategy,
    /// Refill anchor, rounded down to the millisecond.
    pub last_refill: Tick,
    pub last_refill_formatted: String,
    /// Milliseconds until the next refill pass would add a token. `None` when
    /// the bucket never refills.
    pub next_refill_in: Option<Uint>,
    pub totals: RequestTotals,
}

/// Core implementation of the token bucket rate limiting algorithm.
///
/// The bucket starts full. Every decision first refills the bucket from the
/// time elapsed since the refill anchor, then consumes one token if any is
/// left. Denied requests consume nothing.
///
/// The anchor advances by exactly the time that was converted into tokens,
/// never jumping to `now`, so leftover time counts toward the next refill.
/// Under [`RefillStrategy::Greedy`] the anchor keeps sub-millisecond precision.
///
/// Inspection does not refill: the level only moves on decisions and on
/// explicit [`refill_at`](Self::refill_at) calls.
///
/// # Example
///
/// ```rust
/// use rate_engine_core::rate_limiters::{TokenBucketConfig, TokenBucketCore};
///
/// // 2 tokens, one more every 1000 ms
/// let mut bucket = TokenBucketCore::new(TokenBucketConfig::new(2, 1000, 1)).unwrap();
///
/// assert!(bucket.decide_at(0).unwrap().allowed);
/// assert!(bucket.decide_at(10).unwrap().allowed);
/// assert!(!bucket.decide_at(20).unwrap().allowed);
///
/// let decision = bucket.decide_at(1000).unwrap();
/// assert!(decision.allowed);
/// assert_eq!(decision.tokens_added, 1);
/// ```
#[derive(Debug, Clone)]
pub struct TokenBucketCore {
    config: TokenBucketConfig,
    /// Tokens currently in the bucket.
    tokens: Uint,
    /// Point in time up to which elapsed time has been converted into tokens.
    refill_anchor: f64,
    last_tick: Tick,
    totals: RequestTotals,
}

impl TokenBucketCore {
    /// Creates a full bucket anchored at tick 0.
    pub fn new(config: TokenBucketConfig) -> ConfigResult<Self> {
        Self::starting_at(config, 0)
    }

    /// Creates a full bucket anchored at `tick`.
    pub fn starting_at(config: TokenBucketConfig, tick: Tick) -> ConfigResult<Self> {
        config.validate()?;
        Ok(TokenBucketCore {
            tokens: config.capacity,
            config,
            refill_anchor: tick as f64,
            last_tick: tick,
            totals: RequestTotals::default(),
        })
    }

    /// Refills, then tries to take one token.
    ///
    /// # Returns
    /// * `Ok(TokenBucketDecision)` - whether a token was taken and how many were added first
    /// * `Err(RateLimitError::ExpiredTick)` - if the tick is older than the last one seen
    pub fn decide_at(&mut self, tick: Tick) -> DecideResult<TokenBucketDecision> {
        ensure_monotonic("token_bucket", self.last_tick, tick)?;
        self.last_tick = tick;

        let tokens_added = self.refill(tick);

        let allowed = if self.tokens > 0 {
            self.tokens -= 1;
            self.totals.record_allowed();
            true
        } else {
            self.totals.record_denied();
            false
        };

        trace!(tick, allowed, tokens_added, tokens = self.tokens, "token bucket decision");
        Ok(TokenBucketDecision {
            allowed,
            tokens_added,
        })
    }

    /// Runs a refill pass without consuming, as an external refill driver would.
    ///
    /// Returns the number of tokens added.
    pub fn refill_at(&mut self, tick: Tick) -> DecideResult<Uint> {
        ensure_monotonic("token_bucket", self.last_tick, tick)?;
        self.last_tick = tick;
        Ok(self.refill(tick))
    }

    /// Reports the bucket as of `tick` without refilling.
    pub fn status_at(&self, tick: Tick) -> DecideResult<TokenBucketSnapshot> {
        ensure_monotonic("token_bucket", self.last_tick, tick)?;

        let last_refill = self.refill_anchor.floor() as Tick;
        Ok(TokenBucketSnapshot {
            current_tokens: self.tokens,
            capacity: self.config.capacity,
            period: self.config.period,
            tokens_per_period: self.config.tokens_per_period,
            strategy: self.config.strategy,
            last_refill,
            last_refill_formatted: format_tick(last_refill),
            next_refill_in: self.next_refill_in(tick),
            totals: self.totals,
        })
    }

    /// Refills to capacity, re-anchors at `tick` and zeroes the counters.
    pub fn reset_at(&mut self, tick: Tick) {
        self.tokens = self.config.capacity;
        self.refill_anchor = tick as f64;
        self.last_tick = tick;
        self.totals = RequestTotals::default();
        debug!(tick, tokens = self.tokens, "token bucket reset");
    }

    /// Replaces the configuration.
    ///
    /// The token count is left as is; a bucket shrunk below its current level
    /// is clamped by the next refill pass.
    pub fn reconfigure(&mut self, config: TokenBucketConfig) -> ConfigResult<()> {
        if let Err(err) = config.validate() {
            warn!(%err, "token bucket rejected configuration");
            return Err(err);
        }
        info!(
            capacity = config.capacity,
            period = config.period,
            tokens_per_period = config.tokens_per_period,
            strategy = ?config.strategy,
            "token bucket reconfigured"
        );
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &TokenBucketConfig {
        &self.config
    }

    /// Tokens currently in the bucket, as of the last refill pass.
    pub fn tokens(&self) -> Uint {
        self.tokens
    }

    pub fn totals(&self) -> RequestTotals {
        self.totals
    }

    fn refill(&mut self, tick: Tick) -> Uint {
        let before = self.tokens;
        let elapsed = (tick as f64 - self.refill_anchor).max(0.0);
        let period = self.config.period as f64;
        let per_period = self.config.tokens_per_period;

        match self.config.strategy {
            RefillStrategy::Interval => {
                let periods = (elapsed / period).floor();
                if periods >= 1.0 {
                    let refilled = (periods as Uint).saturating_mul(per_period);
                    self.tokens = self.tokens.saturating_add(refilled);
                    self.refill_anchor += periods * period;
                }
            }
            RefillStrategy::Greedy => {
                let available = (elapsed * per_period as f64 / period).floor();
                if available >= 1.0 {
                    self.tokens = self.tokens.saturating_add(available as Uint);
                    self.refill_anchor += available * period / per_period as f64;
                }
            }
        }

        self.tokens = self.tokens.min(self.config.capacity);
        let added = self.tokens.saturating_sub(before);
        if added > 0 {
            debug!(tick, added, tokens = self.tokens, "token bucket refilled");
        }
        added
    }

    fn next_refill_in(&self, tick: Tick) -> Option<Uint> {
        if self.config.tokens_per_period == 0 {
            return None;
        }
        let elapsed = (tick as f64 - self.refill_anchor).max(0.0);
        let step = match self.config.strategy {
            RefillStrategy::Interval => self.config.period as f64,
            RefillStrategy::Greedy => {
                self.config.period as f64 / self.config.tokens_per_period as f64
            }
        };
        Some((step - elapsed).max(0.0).ceil() as Uint)
    }
}

impl TryFrom<TokenBucketConfig> for TokenBucketCore {
    type Error = ConfigError;

    /// Builds a full bucket anchored at tick 0.
    ///
    /// ```
    /// use rate_engine_core::rate_limiters::{RefillStrategy, TokenBucketConfig, TokenBucketCore};
    ///
    /// let bucket: TokenBucketCore = TokenBucketConfig::new(10, 1000, 2)
    ///     .with_strategy(RefillStrategy::Greedy)
    ///     .try_into()
    ///     .unwrap();
    /// assert_eq!(bucket.tokens(), 10);
    /// ```
    fn try_from(config: TokenBucketConfig) -> ConfigResult<Self> {
        TokenBucketCore::new(config)
    }
}

impl RateLimiterCore for TokenBucketCore {
    #[inline(always)]
    fn decide_at(&mut self, tick: Tick) -> DecideResult<Decision> {
        TokenBucketCore::decide_at(self, tick).map(Decision::TokenBucket)
    }

    #[inline(always)]
    fn status_at(&mut self, tick: Tick) -> DecideResult<Snapshot> {
        TokenBucketCore::status_at(self, tick).map(Snapshot::TokenBucket)
    }

    fn reset_at(&mut self, tick: Tick) {
        TokenBucketCore::reset_at(self, tick)
    }

    fn advance_at(&mut self, tick: Tick) -> DecideResult<()> {
        TokenBucketCore::refill_at(self, tick).map(|_| ())
    }

    fn reconfigure(&mut self, config: LimiterConfig) -> ConfigResult<()> {
        match config {
            LimiterConfig::TokenBucket(config) => TokenBucketCore::reconfigure(self, config),
            other => Err(algorithm_mismatch("token_bucket", &other)),
        }
    }

    fn current_config(&self) -> LimiterConfig {
        LimiterConfig::TokenBucket(self.config.clone())
    }

    fn totals(&self) -> RequestTotals {
        self.totals
    }
}
