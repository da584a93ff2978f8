//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as whole seconds since the Unix epoch
///
/// This is the resolution stored in `feedback_info.timestamp` and accepted by
/// the `timestamp` listing filter.
pub fn unix_now() -> i64 {
    now().timestamp()
}
