//! Time sources for callers that drive the engines from real or virtual time.
//!
//! The engines themselves never read a clock: every operation takes the tick
//! explicitly. A host picks a [`Clock`] and passes `clock.now()` in.

use std::cell::Cell;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

use crate::types::{Tick, Uint};

/// Source of millisecond ticks.
pub trait Clock {
    fn now(&self) -> Tick;
}

/// Wall clock: milliseconds since the Unix epoch.
///
/// Wall time can step backwards when the system clock is adjusted; engines
/// answer such ticks with [`RateLimitError::ExpiredTick`](crate::RateLimitError::ExpiredTick).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Tick {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Uint::try_from(millis).unwrap_or(Uint::MAX)
    }
}

/// Monotonic clock counting milliseconds from its own creation.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Tick {
        Uint::try_from(self.origin.elapsed().as_millis()).unwrap_or(Uint::MAX)
    }
}

/// Virtual clock advanced by hand, for simulations and tests.
///
/// ```rust
/// use rate_engine_core::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::starting_at(1_000);
/// clock.advance(250);
/// assert_eq!(clock.now(), 1_250);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Tick>,
}

impl ManualClock {
    pub fn starting_at(tick: Tick) -> Self {
        Self {
            now: Cell::new(tick),
        }
    }

    pub fn advance(&self, millis: Uint) {
        self.now.set(self.now.get().saturating_add(millis));
    }

    pub fn set(&self, tick: Tick) {
        self.now.set(tick);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Tick {
        self.now.get()
    }
}

/// Formats a tick as a UTC time of day, `HH:MM:SS.mmm`.
///
/// The tick is read as Unix milliseconds. Ticks chrono cannot represent are
/// rendered as the raw number.
pub fn format_tick(tick: Tick) -> String {
    i64::try_from(tick)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|at| at.format("%H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| tick.to_string())
}
