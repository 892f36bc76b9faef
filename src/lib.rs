//! Deterministic rate limiting decision engines.
//!
//! This library implements four classic request rate limiting algorithms as
//! standalone state machines. Each one takes a stream of timestamped requests,
//! decides admit / reject (and, for the leaky bucket, queue), and exposes its
//! internal state for display.
//!
//! # Quick Start
//!
//! ```rust
//! use rate_engine_core::rate_limiters::{TokenBucketConfig, TokenBucketCore};
//!
//! // Capacity 5, one token back every 1000 ms
//! let mut limiter = TokenBucketCore::new(TokenBucketConfig::new(5, 1000, 1)).unwrap();
//!
//! let decision = limiter.decide_at(0).unwrap();
//! if decision.allowed {
//!     println!("Request allowed");
//! } else {
//!     println!("Request denied");
//! }
//! ```
//!
//! # Available Rate Limiting Algorithms
//!
//! ## [Token Bucket](rate_limiters::TokenBucketCore)
//! Bursts up to capacity, refilled in whole periods or token by token:
//! ```rust
//! # use rate_engine_core::rate_limiters::{RefillStrategy, TokenBucketConfig};
//! let config = TokenBucketConfig::new(10, 1000, 2).with_strategy(RefillStrategy::Greedy);
//! ```
//!
//! ## [Fixed Window](rate_limiters::FixedWindowCounterCore)
//! ```rust
//! # use rate_engine_core::rate_limiters::FixedWindowConfig;
//! let config = FixedWindowConfig::new(3, 5000); // 3 requests per 5 s window
//! ```
//!
//! ## [Sliding Window](rate_limiters::SlidingWindowLogCore)
//! ```rust
//! # use rate_engine_core::rate_limiters::SlidingWindowConfig;
//! let config = SlidingWindowConfig::new(3, 5000); // 3 requests in any 5 s
//! ```
//!
//! ## [Leaky Bucket](rate_limiters::LeakyBucketCore)
//! ```rust
//! # use rate_engine_core::rate_limiters::LeakyBucketConfig;
//! let config = LeakyBucketConfig::new(5, 2.0); // 5 units, drains 2 per second
//! ```
//!
//! # Core Concepts
//!
//! ## Time Representation
//! Every operation takes a millisecond tick supplied by the caller, which must
//! not go backwards for a given engine. The [`clock`] module has wall,
//! monotonic and manual tick sources.
//!
//! ## Errors
//! Denials and queueing are outcomes, not errors. [`RateLimitError`] covers
//! stale ticks, lock contention and poisoned locks; [`ConfigError`] covers
//! configurations the engines cannot run with (zero period or window, bad
//! outflow rate, a config for another algorithm).
//!
//! ## Thread Safety
//! Engines are single-owner values mutated through `&mut self`. Share one
//! across threads with [`SharedLimiter`], which returns
//! [`RateLimitError::ContentionFailure`] instead of blocking.
//!
//! ## Swapping Engines
//! [`LimiterConfig::build`] returns a `Box<dyn RateLimiterCore>`. Through the
//! trait a boxed engine can still be reconfigured and driven forward in time
//! with [`RateLimiterCore::advance_at`].
//!
//! ## Logging
//! Decisions are traced at `trace`, resets and refills at `debug`,
//! reconfiguration at `info` through the `tracing` crate. No subscriber is
//! installed by this library.

pub mod clock;
pub mod config;
pub mod error;
pub mod rate_limiter_core;
pub mod rate_limiters;
pub mod shared;
pub mod types;

pub use config::LimiterConfig;
pub use error::{ConfigError, ConfigResult, DecideResult, RateLimitError};
pub use rate_limiter_core::{Decision, RateLimiterCore, Snapshot};
pub use shared::SharedLimiter;
pub use types::{RequestTotals, Tick, Uint};
