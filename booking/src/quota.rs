//! Early-access seat quota for movies that are not released yet.

use crate::seat_map::SeatMap;
use chrono::{DateTime, Utc};
use cinema_core::Movie;

/// Default share of an auditorium open before release, in percent
pub const DEFAULT_EARLY_ACCESS_PERCENT: u32 = 10;

/// Caps how many seats one booking may claim before a movie's release
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaPolicy {
    early_access_percent: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EARLY_ACCESS_PERCENT)
    }
}

impl QuotaPolicy {
    /// Policy opening `early_access_percent`% of seats before release
    #[must_use]
    pub const fn new(early_access_percent: u32) -> Self {
        Self {
            early_access_percent,
        }
    }

    /// Share of seats open before release, in percent
    #[must_use]
    pub const fn early_access_percent(&self) -> u32 {
        self.early_access_percent
    }

    /// Maximum number of seats the next selection may hold
    ///
    /// Released movies (no release date, an unparsable one, or one that is
    /// not in the future) are unrestricted. Unreleased movies get
    /// `ceil(total * pct / 100) - already_taken`, floored at zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use cinema_booking::quota::QuotaPolicy;
    /// use cinema_core::{Movie, MovieId};
    /// use chrono::{TimeZone, Utc};
    ///
    /// let movie = Movie {
    ///     movie_id: MovieId::new(1),
    ///     title: "Avatar 3".to_string(),
    ///     release_date: Some("2025-12-19".to_string()),
    /// };
    /// let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    ///
    /// assert_eq!(QuotaPolicy::default().compute_max_allowed(&movie, 50, 2, now), 3);
    /// ```
    #[must_use]
    pub fn compute_max_allowed(
        &self,
        movie: &Movie,
        total_seats: u32,
        already_taken: u32,
        now: DateTime<Utc>,
    ) -> u32 {
        if total_seats == 0 {
            return 0;
        }
        if !movie.is_unreleased_at(now) {
            return total_seats;
        }

        let open = (u64::from(total_seats) * u64::from(self.early_access_percent)).div_ceil(100);
        let open = u32::try_from(open).unwrap_or(u32::MAX);
        open.saturating_sub(already_taken)
    }

    /// Quota for a freshly loaded seat map
    #[must_use]
    pub fn for_seat_map(&self, movie: &Movie, map: &SeatMap, now: DateTime<Utc>) -> u32 {
        let max_allowed = self.compute_max_allowed(movie, map.total_seats(), map.taken_seats(), now);
        tracing::debug!(
            movie_id = %movie.movie_id,
            showtime_id = %map.showtime_id(),
            max_allowed,
            "Computed seat quota"
        );
        max_allowed
    }
}
