//! Background task startup functions
//!
//! Contains the daily token-usage reset task.

use chrono::{DateTime, Local};
use medgate_llm::{end_of_day, Clock, FailoverRouter};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Time left until `deadline`, zero once it has passed
pub fn until(deadline: DateTime<Local>, now: DateTime<Local>) -> Duration {
    (deadline - now).to_std().unwrap_or(Duration::ZERO)
}

/// Reset every provider's daily usage at each local midnight until cancelled.
///
/// Deadlines are chained from the previous midnight, and a timer that fires
/// before `clock` reaches the deadline only re-arms, so each calendar day is
/// reset at most once.
pub fn start_daily_reset_task(
    router: Arc<FailoverRouter>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut deadline = end_of_day(clock.now());
        loop {
            let wait = until(deadline, clock.now());
            debug!(seconds = wait.as_secs(), %deadline, "Next daily usage reset scheduled");
            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    let now = clock.now();
                    if now < deadline {
                        continue;
                    }
                    let cleared = router.reset_token_usage().await;
                    info!(cleared, "Daily usage reset at midnight");
                    // a clock jump over several days still yields a future deadline
                    deadline = end_of_day(deadline.max(now));
                }
                _ = shutdown.cancelled() => {
                    info!("Daily reset task shutting down");
                    break;
                }
            }
        }
    })
}
