//! Wall clock used for task ids, timestamps and due-date checks.

use time::{Date, OffsetDateTime};

pub trait TimeSource: Send + Sync + 'static {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// Current local calendar date.
    fn today(&self) -> Date;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now_ms(&self) -> i64 {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        i64::try_from(millis).unwrap_or(i64::MAX)
    }

    fn today(&self) -> Date {
        // The local offset is unavailable on some multi-threaded Unix setups; UTC is close enough.
        OffsetDateTime::now_local()
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
            .date()
    }
}

#[cfg(test)]
pub use test_clock::TestClock;
