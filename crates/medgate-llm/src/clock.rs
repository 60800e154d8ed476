//! Time source
//!
//! Breaker expiry and daily resets are defined in server-local time, so the
//! router reads "now" through [`Clock`] rather than calling `Local::now()`
//! directly.

use chrono::{DateTime, Duration, Local, TimeZone};
use std::sync::Mutex;

/// Source of the current server-local time
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually advanced clock for tests and simulations
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    /// Create a clock frozen at `now`
    #[must_use]
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// Jump to an absolute time
    pub fn set(&self, to: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The next local midnight after `now`.
///
/// If midnight does not exist in the local zone (DST gap), the first valid
/// instant after it is used.
#[must_use]
pub fn end_of_day(now: DateTime<Local>) -> DateTime<Local> {
    let Some(midnight) = now
        .date_naive()
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
    else {
        return now + Duration::hours(24);
    };
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| now + Duration::hours(24))
}
