//! Wall-clock helpers.
//!
//! All deadlines in the protocol (poll end times, approval expiries) are Unix
//! epoch seconds (UTC). Functions that make time-dependent decisions take an
//! explicit `now` argument so tests can pin the clock; `now_unix` is the one
//! place the system clock is read.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds in one day.
pub const SECS_PER_DAY: u64 = 86_400;

/// Current Unix time in seconds.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs()
}
