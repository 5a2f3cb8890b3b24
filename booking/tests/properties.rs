//! Property tests for the booking rules.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use chrono::{TimeZone, Utc};
use cinema_booking::{BookingError, QuotaPolicy, SeatLabel, SeatMap, SelectionSet, Session};
use cinema_core::{Money, Movie, MovieId, Seat, SeatId, SeatNumber, SeatStatus, ShowtimeId};
use common::Harness;
use proptest::prelude::*;

fn unreleased() -> Movie {
    Movie {
        movie_id: MovieId::new(1),
        title: "Upcoming".to_string(),
        release_date: Some("2030-01-01".to_string()),
    }
}

fn seat_map(statuses: &[bool]) -> SeatMap {
    let seats = statuses
        .iter()
        .zip(1u32..)
        .map(|(available, n)| Seat {
            seat_id: SeatId::new(u64::from(n)),
            seat_number: SeatNumber::new(n).unwrap(),
            status: if *available { SeatStatus::Available } else { SeatStatus::Booked },
        })
        .collect();
    SeatMap::new(ShowtimeId::new(1), 10, seats)
}

proptest! {
    #[test]
    fn label_round_trips(n in 1u32..100_000, per_row in 1u32..40) {
        let seat = SeatNumber::new(n).unwrap();
        let label = SeatLabel::from_seat_number(seat, per_row);

        prop_assert!(label.position() >= 1 && label.position() <= per_row);
        prop_assert_eq!(label.seat_number(per_row), Some(seat));
        prop_assert_eq!(label.to_string().parse::<SeatLabel>().unwrap(), label);
    }

    #[test]
    fn quota_never_exceeds_open_share(total in 0u32..2_000, taken in 0u32..2_000, percent in 0u32..=100) {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let policy = QuotaPolicy::new(percent);
        let max = policy.compute_max_allowed(&unreleased(), total, taken, now);

        let open = (u64::from(total) * u64::from(percent)).div_ceil(100);
        prop_assert!(u64::from(max) <= open);
        prop_assert!(max <= policy.compute_max_allowed(&unreleased(), total + 1, taken, now));
        prop_assert!(policy.compute_max_allowed(&unreleased(), total, taken + 1, now) <= max);
    }

    #[test]
    fn toggling_respects_availability_and_quota(
        statuses in prop::collection::vec(any::<bool>(), 1..60),
        picks in prop::collection::vec(1u32..60, 0..80),
        max_allowed in 0u32..10,
    ) {
        let map = seat_map(&statuses);
        let mut selection = SelectionSet::new();

        for n in picks {
            let seat = SeatNumber::new(n).unwrap();
            let before = selection.clone();
            match selection.toggle(seat, &map, max_allowed) {
                Ok(_) => {}
                Err(BookingError::QuotaExceeded { .. }) => prop_assert_eq!(&selection, &before),
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
            prop_assert!(selection.len() <= max_allowed);
            prop_assert!(selection.seats().iter().all(|s| map.is_available(*s)));
        }
        prop_assert!(selection.validate(&map, max_allowed).is_ok());
    }

    #[test]
    fn refund_is_price_minus_fee(cents in 0u64..10_000_000, percent in 0u32..=100) {
        let price = Money::from_cents(cents);
        let fee = price.percent_of(percent);

        prop_assert!(fee <= price);
        prop_assert_eq!(price.saturating_sub(fee).saturating_add(fee), price);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn failed_checkout_keeps_only_earlier_seats(count in 1usize..6, fail_at in 1usize..6) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let harness = Harness::new();
            harness.backend.fail_payment_on_call(fail_at);
            let seats: Vec<u32> = (1..=u32::try_from(count).unwrap()).collect();
            let request = harness.request(&seats).await;

            let result = harness.checkout.checkout(Session::Guest, request).await;

            let issued = match &result {
                Ok(receipts) => receipts.len(),
                Err(err) => err.issued_receipts().len(),
            };
            if fail_at <= count {
                assert!(matches!(result, Err(BookingError::PaymentFailed { .. })));
                assert_eq!(issued, fail_at - 1);
            } else {
                assert!(result.is_ok());
                assert_eq!(issued, count);
            }
            assert_eq!(harness.backend.tickets().len(), issued);
        });
    }
}
