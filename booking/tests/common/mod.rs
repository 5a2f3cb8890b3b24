//! Shared wiring for the orchestration suites.

#![allow(dead_code)] // each suite uses a different subset
#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, TimeDelta, Utc};
use cinema_booking::{
    BookingConfig, CardDetails, CheckoutOrchestrator, CheckoutRequest, NotificationOutbox,
    PaymentSource, RefundPolicy, ReleaseAnnouncer,
};
use cinema_core::{Clock, MovieId, PaymentType, SeatNumber, ShowtimeId};
use cinema_testing::{fixtures, test_clock, InMemoryBackend, ManualClock};
use std::sync::Arc;

/// Registered user seeded into every harness
pub const USER: u64 = 1;

/// Showtime seeded into every harness
pub const SHOWTIME: u64 = 1;

pub struct Harness {
    pub backend: InMemoryBackend,
    pub clock: Arc<ManualClock>,
    pub outbox: NotificationOutbox,
    pub checkout: CheckoutOrchestrator,
    pub refunds: RefundPolicy,
    pub announcer: ReleaseAnnouncer,
    pub config: BookingConfig,
}

impl Harness {
    /// 50-seat showtime five days out, one registered user with 500 points
    pub fn new() -> Self {
        Self::with_showtime_in(TimeDelta::days(5))
    }

    pub fn with_showtime_in(until_showtime: TimeDelta) -> Self {
        let backend = InMemoryBackend::new();
        let now = test_clock().time();
        backend.add_movie(fixtures::movie(1, "The Long Projection", Some("2025-03-01")));
        backend.add_showtime(fixtures::showtime(SHOWTIME, now + until_showtime), 50);
        backend.add_user(fixtures::registered_user(USER, "john@example.com", 500));

        let config = BookingConfig::default();
        let clock = Arc::new(ManualClock::new(now));
        let shared = Arc::new(backend.clone());
        let outbox = NotificationOutbox::new(shared.clone());

        Self {
            checkout: CheckoutOrchestrator::new(shared.clone(), outbox.clone(), &config),
            refunds: RefundPolicy::new(shared.clone(), outbox.clone(), clock.clone(), &config),
            announcer: ReleaseAnnouncer::new(shared, outbox.clone(), clock.clone()),
            backend,
            clock,
            outbox,
            config,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Checkout request for the seeded showtime paying with a typed-in card
    pub async fn request(&self, seats: &[u32]) -> CheckoutRequest {
        use cinema_core::BookingBackend;

        CheckoutRequest {
            theatre: fixtures::theatre(1, "AcmePlex Downtown"),
            movie: self.backend.fetch_movie(MovieId::new(1)).await.unwrap(),
            showtime: self.backend.fetch_showtime(ShowtimeId::new(SHOWTIME)).await.unwrap(),
            seats: seats.iter().map(|n| seat(*n)).collect(),
            payment: PaymentSource::Card(card()),
            guest_email: Some("guest@example.com".to_string()),
            redeem_points: false,
        }
    }
}

pub fn seat(n: u32) -> SeatNumber {
    SeatNumber::new(n).expect("seat numbers start at 1")
}

pub fn card() -> CardDetails {
    CardDetails {
        payment_type: Some(PaymentType::Credit),
        owner: "Jane Doe".to_string(),
        number: "4242 4242 4242 4242".to_string(),
        expiry: "09/28".to_string(),
        cvv: "123".to_string(),
    }
}
