use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::{algorithm_mismatch, ensure_monotonic};
use crate::clock::format_tick;
use crate::config::LimiterConfig;
use crate::error::{ConfigError, ConfigResult, DecideResult};
use crate::rate_limiter_core::{Decision, RateLimiterCore, Snapshot};
use crate::types::{RequestTotals, Tick, Uint};

/// Configuration structure for a [`LeakyBucketCore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakyBucketConfig {
    /// Units the bucket holds, and also the maximum queue length.
    pub capacity: Uint,
    /// Units drained per second.
    pub outflow_rate: f64,
}

impl LeakyBucketConfig {
    pub fn new(capacity: Uint, outflow_rate: f64) -> Self {
        Self {
            capacity,
            outflow_rate,
        }
    }

    /// Rejects an outflow rate that is not a positive finite number.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.outflow_rate.is_finite() && self.outflow_rate > 0.0) {
            return Err(ConfigError::InvalidOutflowRate(self.outflow_rate));
        }
        Ok(())
    }
}

/// A request parked while the bucket was full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueuedRequest {
    pub enqueued_at: Tick,
    /// Set once a drain has admitted the request into the bucket.
    pub processed: bool,
}

/// Result of one leaky bucket decision. Denied when both flags are false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeakyBucketDecision {
    pub allowed: bool,
    pub queued: bool,
}

/// Inspection snapshot of a leaky bucket, taken after leaking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakyBucketSnapshot {
    pub current_level: f64,
    pub capacity: Uint,
    pub queue_length: Uint,
    pub outflow_rate: f64,
    pub last_leak: Tick,
    pub last_leak_formatted: String,
    /// How long the head of the queue has been waiting, if anything is queued.
    pub oldest_queued_wait: Option<Uint>,
    pub totals: RequestTotals,
}

/// Core implementation of the leaky bucket rate limiting algorithm.
///
/// Every admitted request puts one unit into the bucket, and the bucket drains
/// continuously at `outflow_rate` units per second. While the level is below
/// capacity a request is admitted immediately. When the bucket is full the
/// request waits in a queue of at most `capacity` entries; once the queue is
/// full too, requests are denied.
///
/// Draining is lazy: each decision and each inspection first leaks the time
/// elapsed since the last leak, then moves queued requests into the bucket,
/// oldest first, while there is room. A queued request counts as allowed only
/// when it is moved in. [`leak_at`](Self::leak_at) returns those requests so
/// callers can learn what happened to them.
///
/// Each admission adds exactly one unit. Admission only tests
/// `level < capacity`, so a partly drained bucket may sit above capacity by
/// less than one unit until the next leak. Over any span of time the number of
/// admitted requests stays within `capacity + 1` of what the outflow rate
/// drained.
///
/// # Example
///
/// ```rust
/// use rate_engine_core::rate_limiters::{LeakyBucketConfig, LeakyBucketCore};
///
/// // two units, one drained per second
/// let mut bucket = LeakyBucketCore::new(LeakyBucketConfig::new(2, 1.0)).unwrap();
///
/// assert!(bucket.decide_at(0).unwrap().allowed);
/// assert!(bucket.decide_at(0).unwrap().allowed);
/// assert!(bucket.decide_at(0).unwrap().queued);
///
/// let admitted = bucket.leak_at(1000).unwrap();
/// assert_eq!(admitted.len(), 1);
/// assert_eq!(bucket.queue_len(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct LeakyBucketCore {
    config: LeakyBucketConfig,
    level: f64,
    last_leak_tick: Tick,
    queue: VecDeque<QueuedRequest>,
    last_tick: Tick,
    totals: RequestTotals,
}

impl LeakyBucketCore {
    /// Creates an empty bucket whose first leak is measured from tick 0.
    pub fn new(config: LeakyBucketConfig) -> ConfigResult<Self> {
        Self::starting_at(config, 0)
    }

    /// Creates an empty bucket whose first leak is measured from `tick`.
    pub fn starting_at(config: LeakyBucketConfig, tick: Tick) -> ConfigResult<Self> {
        config.validate()?;
        Ok(LeakyBucketCore {
            config,
            level: 0.0,
            last_leak_tick: tick,
            queue: VecDeque::new(),
            last_tick: tick,
            totals: RequestTotals::default(),
        })
    }

    /// Leaks, then admits, queues or denies one request.
    ///
    /// # Returns
    /// * `allowed: true` - the request took one unit of the bucket
    /// * `queued: true` - the bucket is full and the request waits for a later drain
    /// * both false - bucket and queue are full
    pub fn decide_at(&mut self, tick: Tick) -> DecideResult<LeakyBucketDecision> {
        ensure_monotonic("leaky_bucket", self.last_tick, tick)?;
        self.last_tick = tick;
        self.leak(tick);

        let capacity = self.config.capacity;
        let decision = if self.level < capacity as f64 {
            self.fill_one();
            self.totals.record_allowed();
            LeakyBucketDecision {
                allowed: true,
                queued: false,
            }
        } else if (self.queue.len() as Uint) < capacity {
            self.queue.push_back(QueuedRequest {
                enqueued_at: tick,
                processed: false,
            });
            self.totals.record_pending();
            LeakyBucketDecision {
                allowed: false,
                queued: true,
            }
        } else {
            self.totals.record_denied();
            LeakyBucketDecision {
                allowed: false,
                queued: false,
            }
        };

        trace!(
            tick,
            allowed = decision.allowed,
            queued = decision.queued,
            level = self.level,
            queue_length = self.queue.len(),
            "leaky bucket decision"
        );
        Ok(decision)
    }

    /// Leaks the time elapsed up to `tick` and drains the queue into the bucket.
    ///
    /// Returns the queued requests admitted by this drain, oldest first.
    pub fn leak_at(&mut self, tick: Tick) -> DecideResult<Vec<QueuedRequest>> {
        ensure_monotonic("leaky_bucket", self.last_tick, tick)?;
        self.last_tick = tick;
        Ok(self.leak(tick))
    }

    /// Leaks up to `tick`, then reports the bucket.
    pub fn status_at(&mut self, tick: Tick) -> DecideResult<LeakyBucketSnapshot> {
        ensure_monotonic("leaky_bucket", self.last_tick, tick)?;
        self.last_tick = tick;
        self.leak(tick);

        Ok(LeakyBucketSnapshot {
            current_level: self.level,
            capacity: self.config.capacity,
            queue_length: self.queue.len() as Uint,
            outflow_rate: self.config.outflow_rate,
            last_leak: self.last_leak_tick,
            last_leak_formatted: format_tick(self.last_leak_tick),
            oldest_queued_wait: self
                .queue
                .front()
                .map(|request| tick.saturating_sub(request.enqueued_at)),
            totals: self.totals,
        })
    }

    /// Empties bucket and queue, restarts leaking from `tick`, zeroes the counters.
    pub fn reset_at(&mut self, tick: Tick) {
        self.level = 0.0;
        self.last_leak_tick = tick;
        self.last_tick = tick;
        self.queue.clear();
        self.totals = RequestTotals::default();
        debug!(tick, "leaky bucket reset");
    }

    /// Replaces the configuration.
    ///
    /// A level above the new capacity is clamped down to it. Queued requests
    /// stay queued even if the queue is now longer than the new capacity.
    pub fn reconfigure(&mut self, config: LeakyBucketConfig) -> ConfigResult<()> {
        if let Err(err) = config.validate() {
            warn!(%err, "leaky bucket rejected configuration");
            return Err(err);
        }
        info!(
            capacity = config.capacity,
            outflow_rate = config.outflow_rate,
            "leaky bucket reconfigured"
        );
        self.level = self.level.min(config.capacity as f64);
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &LeakyBucketConfig {
        &self.config
    }

    /// Bucket level as of the last leak.
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Requests still waiting, oldest first.
    pub fn queued(&self) -> impl Iterator<Item = &QueuedRequest> + '_ {
        self.queue.iter()
    }

    pub fn totals(&self) -> RequestTotals {
        self.totals
    }

    fn leak(&mut self, tick: Tick) -> Vec<QueuedRequest> {
        let elapsed_seconds = tick.saturating_sub(self.last_leak_tick) as f64 / 1000.0;
        let leak_amount = elapsed_seconds * self.config.outflow_rate;
        if leak_amount <= 0.0 {
            return Vec::new();
        }

        self.level = (self.level - leak_amount).max(0.0);
        self.last_leak_tick = tick;

        let capacity = self.config.capacity as f64;
        let mut admitted = Vec::new();
        while self.level < capacity {
            let Some(mut request) = self.queue.pop_front() else {
                break;
            };
            self.fill_one();
            request.processed = true;
            self.totals.record_admitted();
            admitted.push(request);
        }

        if !admitted.is_empty() {
            debug!(
                tick,
                admitted = admitted.len(),
                level = self.level,
                queue_length = self.queue.len(),
                "leaky bucket drained queue"
            );
        }
        admitted
    }

    fn fill_one(&mut self) {
        self.level += 1.0;
    }
}

impl TryFrom<LeakyBucketConfig> for LeakyBucketCore {
    type Error = ConfigError;

    fn try_from(config: LeakyBucketConfig) -> ConfigResult<Self> {
        LeakyBucketCore::new(config)
    }
}

impl RateLimiterCore for LeakyBucketCore {
    #[inline(always)]
    fn decide_at(&mut self, tick: Tick) -> DecideResult<Decision> {
        LeakyBucketCore::decide_at(self, tick).map(Decision::LeakyBucket)
    }

    #[inline(always)]
    fn status_at(&mut self, tick: Tick) -> DecideResult<Snapshot> {
        LeakyBucketCore::status_at(self, tick).map(Snapshot::LeakyBucket)
    }

    fn reset_at(&mut self, tick: Tick) {
        LeakyBucketCore::reset_at(self, tick)
    }

    fn advance_at(&mut self, tick: Tick) -> DecideResult<()> {
        LeakyBucketCore::leak_at(self, tick).map(|_| ())
    }

    fn reconfigure(&mut self, config: LimiterConfig) -> ConfigResult<()> {
        match config {
            LimiterConfig::LeakyBucket(config) => LeakyBucketCore::reconfigure(self, config),
            other => Err(algorithm_mismatch("leaky_bucket", &other)),
        }
    }

    fn current_config(&self) -> LimiterConfig {
        LimiterConfig::LeakyBucket(self.config.clone())
    }

    fn totals(&self) -> RequestTotals {
        self.totals
    }
}
