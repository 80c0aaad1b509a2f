//! Poll timing: sensor-cadence alignment, failure backoff and re-login delay.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// CGM sensors publish a reading every five minutes.
pub const READING_INTERVAL: Duration = Duration::from_secs(300);

/// Extra wait after the expected reading so Share has it available.
pub const REFRESH_BUFFER: Duration = Duration::from_secs(10);

/// Shortest delay ever scheduled.
pub const MIN_REFRESH_DELAY: Duration = Duration::from_secs(5);

/// Longest delay after a successful fetch.
pub const MAX_REFRESH_DELAY: Duration = Duration::from_secs(310);

/// First backoff step after a failed poll.
pub const BACKOFF_BASE: Duration = Duration::from_secs(30);

/// Upper bound on failure backoff.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Re-login attempts before giving up.
pub const MAX_REAUTH_ATTEMPTS: u32 = 3;

/// Delay until the next poll after a successful fetch whose newest reading
/// was taken at `last_reading`.
///
/// Polls land `REFRESH_BUFFER` after the next expected reading:
/// `last + (intervals_passed + 1) * 300s + 10s`.
pub fn next_refresh_delay(last_reading: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let interval = READING_INTERVAL.as_secs() as i64;
    let elapsed = (now - last_reading).num_seconds().max(0);
    let intervals_passed = elapsed / interval;

    let next_expected = last_reading
        + chrono::Duration::seconds((intervals_passed + 1) * interval)
        + chrono::Duration::seconds(REFRESH_BUFFER.as_secs() as i64);

    let delay = (next_expected - now)
        .to_std()
        .unwrap_or(Duration::ZERO);

    delay.clamp(MIN_REFRESH_DELAY, MAX_REFRESH_DELAY)
}

/// Absolute time of the next poll; see [`next_refresh_delay`].
pub fn next_refresh_at(last_reading: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    now + chrono::Duration::from_std(next_refresh_delay(last_reading, now))
        .unwrap_or_else(|_| chrono::Duration::seconds(MIN_REFRESH_DELAY.as_secs() as i64))
}

/// Backoff after `consecutive_failures` failed polls (0 for the first).
///
/// 30s doubling per failure, capped at 300s.
pub fn backoff_delay(consecutive_failures: u32) -> Duration {
    let factor = 1u64 << consecutive_failures.min(4);
    (BACKOFF_BASE * factor as u32).min(MAX_BACKOFF)
}

/// Wait before re-login attempt `attempt` (1-based): 2, 4, 8 seconds.
pub fn reauth_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(MAX_REAUTH_ATTEMPTS))
}
