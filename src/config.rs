//! Algorithm selection from configuration.
//!
//! [`LimiterConfig`] names one engine and its parameters, so a host can pick
//! the algorithm from a config file instead of wiring a concrete type:
//!
//! ```rust
//! use rate_engine_core::LimiterConfig;
//!
//! let config: LimiterConfig = serde_json::from_str(
//!     r#"{ "algorithm": "sliding_window", "max_count": 2, "window_length": 1000 }"#,
//! ).unwrap();
//!
//! let mut limiter = config.build().unwrap();
//! assert!(limiter.decide_at(0).unwrap().is_allowed());
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigResult;
use crate::rate_limiter_core::RateLimiterCore;
use crate::rate_limiters::{
    FixedWindowConfig, FixedWindowCounterCore, LeakyBucketConfig, LeakyBucketCore,
    SlidingWindowConfig, SlidingWindowLogCore, TokenBucketConfig, TokenBucketCore,
};
use crate::types::Tick;

/// Configuration of any one engine, tagged by `algorithm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum LimiterConfig {
    TokenBucket(TokenBucketConfig),
    FixedWindow(FixedWindowConfig),
    SlidingWindow(SlidingWindowConfig),
    LeakyBucket(LeakyBucketConfig),
}

impl LimiterConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        match self {
            LimiterConfig::TokenBucket(c) => c.validate(),
            LimiterConfig::FixedWindow(c) => c.validate(),
            LimiterConfig::SlidingWindow(c) => c.validate(),
            LimiterConfig::LeakyBucket(c) => c.validate(),
        }
    }

    /// Short algorithm name, as used in the `algorithm` tag.
    pub fn algorithm(&self) -> &'static str {
        match self {
            LimiterConfig::TokenBucket(_) => "token_bucket",
            LimiterConfig::FixedWindow(_) => "fixed_window",
            LimiterConfig::SlidingWindow(_) => "sliding_window",
            LimiterConfig::LeakyBucket(_) => "leaky_bucket",
        }
    }

    /// Builds the engine with its clock anchored at tick 0.
    pub fn build(self) -> ConfigResult<Box<dyn RateLimiterCore>> {
        self.build_at(0)
    }

    /// Builds the engine with time-based state anchored at `tick`.
    pub fn build_at(self, tick: Tick) -> ConfigResult<Box<dyn RateLimiterCore>> {
        debug!(algorithm = self.algorithm(), tick, "building rate limiter");
        let limiter: Box<dyn RateLimiterCore> = match self {
            LimiterConfig::TokenBucket(c) => Box::new(TokenBucketCore::starting_at(c, tick)?),
            LimiterConfig::FixedWindow(c) => Box::new(FixedWindowCounterCore::new(c)?),
            LimiterConfig::SlidingWindow(c) => Box::new(SlidingWindowLogCore::new(c)?),
            LimiterConfig::LeakyBucket(c) => Box::new(LeakyBucketCore::starting_at(c, tick)?),
        };
        Ok(limiter)
    }
}

impl From<TokenBucketConfig> for LimiterConfig {
    fn from(config: TokenBucketConfig) -> Self {
        LimiterConfig::TokenBucket(config)
    }
}

impl From<FixedWindowConfig> for LimiterConfig {
    fn from(config: FixedWindowConfig) -> Self {
        LimiterConfig::FixedWindow(config)
    }
}

impl From<SlidingWindowConfig> for LimiterConfig {
    fn from(config: SlidingWindowConfig) -> Self {
        LimiterConfig::SlidingWindow(config)
    }
}

impl From<LeakyBucketConfig> for LimiterConfig {
    fn from(config: LeakyBucketConfig) -> Self {
        LimiterConfig::LeakyBucket(config)
    }
}
