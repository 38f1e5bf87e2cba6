//! Dependency-injection traits shared by reducer environments.

use chrono::{DateTime, Utc};

/// Abstracts time so reducers stay deterministic under test.
///
/// Production uses [`SystemClock`]; tests use `FixedClock` from
/// `marquee-testing`.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation of [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
