//! # Cinema Testing
//!
//! Testing utilities for the cinema booking orchestrator.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - [`InMemoryBackend`]: an owned booking store implementing both backend
//!   contracts, with failure injection for partial-checkout scenarios
//! - [`RecordingNotifier`]: captures published notifications
//!
//! ## Example
//!
//! ```
//! use cinema_core::{BookingBackend, ShowtimeId};
//! use cinema_testing::{fixtures, InMemoryBackend};
//!
//! # async fn example() {
//! let backend = InMemoryBackend::new();
//! let showtime = fixtures::showtime(1, cinema_testing::test_clock().time());
//! backend.add_showtime(showtime, 50);
//!
//! let seats = backend.fetch_seats(ShowtimeId::new(1)).await.unwrap();
//! assert_eq!(seats.len(), 50);
//! # }
//! ```

use chrono::{DateTime, Utc};
use cinema_core::environment::Clock;

pub mod backend;
pub mod fixtures;
pub mod notifier;

/// Mock clocks
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::TimeDelta;
    use std::sync::RwLock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use cinema_testing::mocks::FixedClock;
    /// use cinema_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// The instant this clock reports
        #[must_use]
        pub const fn time(&self) -> DateTime<Utc> {
            self.time
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test tells it to
    ///
    /// Used where time has to pass between two calls, e.g. a showtime
    /// crossing the refund window between lookup and submit.
    #[derive(Debug)]
    pub struct ManualClock {
        time: RwLock<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a manual clock starting at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: RwLock::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: TimeDelta) {
            let mut time = self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use backend::InMemoryBackend;
pub use mocks::{test_clock, FixedClock, ManualClock};
pub use notifier::RecordingNotifier;
