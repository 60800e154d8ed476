//! Per-provider circuit breaker
//!
//! A provider that answers with a rate-limit, quota or authentication error is
//! blocked until the next local midnight. Expiry is lazy: [`is_blocked`]
//! compares against the caller's clock, no timer is involved.
//!
//! [`is_blocked`]: CircuitBreakerState::is_blocked

use crate::clock::end_of_day;
use chrono::{DateTime, Local};
use serde::Serialize;

/// Breaker state for a single provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CircuitBreakerState {
    /// When the block lifts, `None` when never tripped or reset
    pub blocked_until: Option<DateTime<Local>>,
    /// Why the provider was blocked
    pub reason: Option<String>,
}

impl CircuitBreakerState {
    /// Block until end of the current day.
    ///
    /// Returns `true` if the breaker was closed before this call. Tripping an
    /// already-open breaker only replaces the reason.
    pub fn trip_until_end_of_day(&mut self, now: DateTime<Local>, reason: impl Into<String>) -> bool {
        let newly_tripped = !self.is_blocked(now);
        if newly_tripped {
            self.blocked_until = Some(end_of_day(now));
        }
        self.reason = Some(reason.into());
        newly_tripped
    }

    /// Whether attempts must be suppressed at `now`
    #[must_use]
    pub fn is_blocked(&self, now: DateTime<Local>) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }

    /// Close the breaker
    pub fn reset(&mut self) {
        self.blocked_until = None;
        self.reason = None;
    }
}
