//! Wall-clock access and day arithmetic.
//!
//! Long-term review due dates are plain epoch-millisecond integers;
//! intra-session time is counted in elapsed visible seconds by the
//! engine itself and never touches the wall clock.

use chrono::Utc;

pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// `ms` shifted forward by `days` whole days.
pub fn add_days(ms: i64, days: i64) -> i64 {
    ms + days * MS_PER_DAY
}
