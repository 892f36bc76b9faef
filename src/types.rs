//! Scalar types shared by every engine.
//!
//! Time is carried as an unsigned millisecond tick chosen by the caller. The
//! width of that integer is picked at compile time:
//!
//! - `tick-u64` (default): [`Uint`] is [`u64`]
//! - `tick-u128`: [`Uint`] is [`u128`]
//!
//! Enabling both features is a compile error. With neither, [`u64`] is used.

#[cfg(all(feature = "tick-u64", feature = "tick-u128"))]
compile_error!("You cannot enable both `tick-u64` and `tick-u128` features at the same time");

/// Unsigned integer used for ticks, durations and counts.
#[cfg(all(feature = "tick-u64", not(feature = "tick-u128")))]
pub type Uint = u64;

/// Unsigned integer used for ticks, durations and counts.
#[cfg(all(feature = "tick-u128", not(feature = "tick-u64")))]
pub type Uint = u128;

/// Unsigned integer used for ticks, durations and counts.
#[cfg(not(any(feature = "tick-u64", feature = "tick-u128")))]
pub type Uint = u64;

/// Milliseconds since an arbitrary epoch, monotonic for one engine instance.
pub type Tick = Uint;

/// Request counters every engine keeps.
///
/// `total` counts every decision. `allowed` and `denied` are bumped when the
/// outcome is known, which for a leaky bucket queue is later than the call
/// that enqueued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RequestTotals {
    pub total: Uint,
    pub allowed: Uint,
    pub denied: Uint,
}

impl RequestTotals {
    pub(crate) fn record_allowed(&mut self) {
        self.total = self.total.saturating_add(1);
        self.allowed = self.allowed.saturating_add(1);
    }

    pub(crate) fn record_denied(&mut self) {
        self.total = self.total.saturating_add(1);
        self.denied = self.denied.saturating_add(1);
    }

    /// Counts a request whose outcome is not decided yet (leaky bucket queue).
    pub(crate) fn record_pending(&mut self) {
        self.total = self.total.saturating_add(1);
    }

    /// Counts the late admission of a previously pending request.
    pub(crate) fn record_admitted(&mut self) {
        self.allowed = self.allowed.saturating_add(1);
    }
}
