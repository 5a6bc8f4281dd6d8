//! Time source for token expiry and cache freshness checks

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Production code uses [`SystemClock`]; tests drive expiry deterministically
/// with `ManualClock`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;
