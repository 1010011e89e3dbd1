// ============================================
// File: crates/watchpost-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! Unix timestamps stamped on telemetry records when the collector
//! accepts them.
//!
//! ## Last Modified
//! v0.1.0 - Initial time utilities

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unix timestamp in seconds.
///
/// # Example
/// ```
/// use watchpost_common::time::Timestamp;
///
/// let now = Timestamp::now();
/// assert!(now.as_secs() > 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a new timestamp from Unix seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Creates a timestamp for the current time.
    ///
    /// A clock set before the Unix epoch yields zero.
    #[must_use]
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self(secs)
    }

    /// Returns the Unix timestamp in seconds.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Timestamp {
    fn from(secs: u64) -> Self {
        Self(secs)
    }
}

/// Formats a duration as whole milliseconds for log fields.
#[must_use]
pub fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_now() {
        let ts = Timestamp::now();
        // 2020-01-01
        assert!(ts.as_secs() > 1_577_836_800);
        assert!(Timestamp::now() >= ts);
    }

    #[test]
    fn test_timestamp_serializes_as_number() {
        let ts = Timestamp::from_secs(1_700_000_000);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "1700000000");
    }

    #[test]
    fn test_as_millis() {
        assert_eq!(as_millis(Duration::from_millis(1500)), 1500);
    }
}
