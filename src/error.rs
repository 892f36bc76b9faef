//! error.rs
//! Runtime and configuration errors.
//!
//! Denials, queueing and window resets are ordinary outcomes carried in the
//! decision records. Only misuse (stale ticks, lock contention, degenerate
//! configuration) is reported through these types.

use crate::types::Uint;
use thiserror::Error;

/// Error returned by a decide, status or reset call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// The tick is older than the newest tick the engine has already seen.
    #[error("Expired tick: minimum acceptable tick is {min_acceptable_tick}.")]
    ExpiredTick { min_acceptable_tick: Uint },

    /// The shared limiter is locked by another operation.
    #[error("Contention failure: limiter is locked by another operation. Please retry.")]
    ContentionFailure,

    /// A thread panicked while holding the shared limiter's lock.
    #[error("Lock poisoned: a thread panicked while holding the limiter.")]
    Poisoned,
}

/// Error returned when a configuration cannot drive an engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Token bucket refill period of zero milliseconds.
    #[error("Invalid configuration: refill period must be greater than 0.")]
    ZeroPeriod,

    /// Fixed or sliding window of zero milliseconds.
    #[error("Invalid configuration: window length must be greater than 0.")]
    ZeroWindowLength,

    /// Leaky bucket outflow rate that is zero, negative, NaN or infinite.
    #[error("Invalid configuration: outflow rate must be a positive finite number, got {0}.")]
    InvalidOutflowRate(f64),

    /// Reconfiguration with a config for another algorithm.
    #[error("Invalid configuration: expected {expected} config, got {found}.")]
    AlgorithmMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Result of a decide or status call.
pub type DecideResult<T> = Result<T, RateLimitError>;

/// Result of building or reconfiguring an engine.
pub type ConfigResult<T> = Result<T, ConfigError>;
