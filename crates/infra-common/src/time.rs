//! Microsecond epoch timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall clock as microseconds since the Unix epoch.
pub fn now_usecs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// One hour in microseconds.
pub const HOUR_USECS: u64 = 3_600_000_000;

/// One minute in microseconds.
pub const MINUTE_USECS: u64 = 60_000_000;
