//! Environment traits injected into the orchestrator.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
///
/// Quota and refund rules compare against "now"; reading it through this
/// trait keeps both deterministic under test.
///
/// # Examples
///
/// ```
/// use cinema_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let before = clock.now();
/// assert!(clock.now() >= before);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
