//! Checkout orchestration against the in-memory backend.
//!
//! Covers the sequential per-seat loop, partial failures, validation before
//! any backend call, credit point redemption and booking notifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{seat, Harness, SHOWTIME, USER};
use cinema_booking::{BookingError, CheckoutOrchestrator, NotificationOutbox, PaymentSource, SeatLabel, Session};
use cinema_core::{
    BackendError, BackendFuture, Money, Notification, NotificationClient, PaymentType, SeatStatus,
    ShowtimeId, UserId,
};
use std::sync::Arc;
use std::time::Duration;

fn label(n: u32) -> SeatLabel {
    SeatLabel::from_seat_number(seat(n), 10)
}

#[tokio::test]
async fn test_every_seat_gets_a_receipt_in_selection_order() {
    let harness = Harness::new();
    let request = harness.request(&[14, 3, 27]).await;

    let receipts = harness.checkout.checkout(Session::Guest, request).await.expect("checkout should succeed");

    let labels: Vec<String> = receipts.iter().map(|r| r.seat.to_string()).collect();
    assert_eq!(labels, ["B4", "A3", "C7"]);
    assert!(receipts.iter().all(|r| r.movie_title == "The Long Projection"));
    assert!(receipts.iter().all(|r| r.theatre_name == "AcmePlex Downtown"));
    assert_eq!(receipts[0].showtime, "12:00 AM, Jan 6, 2025");

    // one payment of price plus tax per seat
    let payments = harness.backend.payments();
    assert_eq!(payments.len(), 3);
    assert!(payments.iter().all(|p| p.amount == Money::from_cents(2006)));
    assert!(payments.iter().all(|p| p.card_number == "****4242"));

    for n in [14, 3, 27] {
        assert_eq!(
            harness.backend.seat_status(ShowtimeId::new(SHOWTIME), seat(n)),
            Some(SeatStatus::Booked)
        );
    }
}

#[tokio::test]
async fn test_payment_failure_keeps_earlier_seats() {
    let harness = Harness::new();
    harness.backend.fail_payment_on_call(3);
    let request = harness.request(&[1, 2, 3, 4]).await;

    let err = harness.checkout.checkout(Session::Guest, request).await.unwrap_err();

    match &err {
        BookingError::PaymentFailed { seat, issued, reason } => {
            assert_eq!(*seat, label(3));
            assert_eq!(issued.len(), 2);
            assert!(reason.contains("card declined"));
        }
        other => panic!("expected PaymentFailed, got {other:?}"),
    }
    assert_eq!(err.issued_receipts().len(), 2);

    // no rollback and no attempt at the fourth seat
    assert_eq!(harness.backend.payments().len(), 2);
    assert_eq!(harness.backend.tickets().len(), 2);
    assert_eq!(harness.backend.payment_calls(), 3);
    assert_eq!(harness.backend.seat_status(ShowtimeId::new(SHOWTIME), seat(2)), Some(SeatStatus::Booked));
    assert_eq!(harness.backend.seat_status(ShowtimeId::new(SHOWTIME), seat(3)), Some(SeatStatus::Available));
}

#[tokio::test]
async fn test_ticket_failure_reports_the_taken_payment() {
    let harness = Harness::new();
    harness.backend.fail_ticket_on_call(2);
    let request = harness.request(&[5, 6]).await;

    let err = harness.checkout.checkout(Session::Guest, request).await.unwrap_err();

    let BookingError::TicketIssuanceFailed { seat, payment_id, issued, .. } = err else {
        panic!("expected TicketIssuanceFailed");
    };
    assert_eq!(seat, label(6));
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].seat, label(5));
    assert!(harness.backend.payments().iter().any(|p| p.payment_id == payment_id));
}

#[tokio::test]
async fn test_seat_lost_to_another_buyer() {
    let harness = Harness::new();
    let request = harness.request(&[8, 9]).await;
    harness
        .backend
        .set_seat_status(ShowtimeId::new(SHOWTIME), seat(9), SeatStatus::Booked);

    let err = harness.checkout.checkout(Session::Guest, request).await.unwrap_err();

    assert!(matches!(err, BookingError::TicketIssuanceFailed { seat, .. } if seat == label(9)));
    assert_eq!(err.issued_receipts().len(), 1);
}

#[tokio::test]
async fn test_validation_happens_before_any_backend_call() {
    let harness = Harness::new();

    let empty = harness.request(&[]).await;
    let duplicated = harness.request(&[1, 1]).await;
    let mut no_email = harness.request(&[1]).await;
    no_email.guest_email = None;
    let mut bad_card = harness.request(&[1]).await;
    if let PaymentSource::Card(card) = &mut bad_card.payment {
        card.cvv.clear();
    }

    for request in [empty, duplicated, no_email, bad_card] {
        let err = harness.checkout.checkout(Session::Guest, request).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)), "got {err:?}");
    }
    assert_eq!(harness.backend.payment_calls(), 0);
}

#[tokio::test]
async fn test_registered_checkout_redeems_points_and_notifies() {
    let harness = Harness::new();
    let mut request = harness.request(&[1, 2]).await;
    request.guest_email = None;
    request.redeem_points = true;

    let receipts = harness
        .checkout
        .checkout(Session::Registered(UserId::new(USER)), request)
        .await
        .expect("checkout should succeed");

    assert_eq!(receipts.len(), 2);
    harness.outbox.settle().await;
    let user = harness.backend.user(UserId::new(USER)).unwrap();
    assert_eq!(user.credit_points, 0);
    assert_eq!(user.notification_history.len(), 1);
    assert!(user.notification_history[0].message.starts_with("Booking confirmed: 2 ticket(s)"));
    assert!(harness.backend.payments().iter().all(|p| p.email == "john@example.com"));
    assert!(harness.outbox.pending().await.is_empty());
}

#[tokio::test]
async fn test_credit_update_failure_does_not_fail_checkout() {
    let harness = Harness::new();
    harness.backend.fail_credit_updates(true);
    let mut request = harness.request(&[1]).await;
    request.redeem_points = true;

    let receipts = harness
        .checkout
        .checkout(Session::Registered(UserId::new(USER)), request)
        .await
        .expect("checkout should succeed");

    assert_eq!(receipts.len(), 1);
    assert_eq!(harness.backend.user(UserId::new(USER)).unwrap().credit_points, 500);
}

#[tokio::test]
async fn test_notification_failure_stays_in_outbox() {
    let harness = Harness::new();
    harness.backend.fail_next_notifications(1);
    let request = harness.request(&[1]).await;

    let receipts = harness.checkout.checkout(Session::Registered(UserId::new(USER)), request).await;

    assert!(receipts.is_ok());
    harness.outbox.settle().await;
    assert_eq!(harness.outbox.pending().await.len(), 1);

    harness.outbox.flush().await;
    let user = harness.backend.user(UserId::new(USER)).unwrap();
    assert_eq!(user.notification_history.len(), 1);
}

#[tokio::test]
async fn test_guests_are_not_notified() {
    let harness = Harness::new();
    let request = harness.request(&[1]).await;

    harness.checkout.checkout(Session::Guest, request).await.unwrap();
    harness.outbox.settle().await;

    assert!(harness.outbox.pending().await.is_empty());
    assert!(harness.backend.user(UserId::new(USER)).unwrap().notification_history.is_empty());
}

#[tokio::test]
async fn test_saved_payment_method() {
    let harness = Harness::new();
    let registered = Session::Registered(UserId::new(USER));

    let mut saved = harness.request(&[10]).await;
    saved.payment = PaymentSource::Saved { method_id: 1, cvv: "999".to_string() };
    harness.checkout.checkout(registered, saved).await.expect("saved card should work");
    let payment = &harness.backend.payments()[0];
    assert_eq!(payment.card_owner, "John Smith");
    assert_eq!(payment.card_number, "****8123");
    assert_eq!(payment.payment_type, PaymentType::Debit);

    let mut unknown = harness.request(&[11]).await;
    unknown.payment = PaymentSource::Saved { method_id: 42, cvv: "999".to_string() };
    let err = harness.checkout.checkout(registered, unknown).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    let mut guest = harness.request(&[12]).await;
    guest.payment = PaymentSource::Saved { method_id: 1, cvv: "999".to_string() };
    let err = harness.checkout.checkout(Session::Guest, guest).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn test_quote_ignores_redemption_for_guests() {
    let harness = Harness::new();

    let guest = harness.checkout.quote(Session::Guest, 2, true).await.unwrap();
    let registered = harness
        .checkout
        .quote(Session::Registered(UserId::new(USER)), 2, true)
        .await
        .unwrap();

    assert_eq!(guest.redeemed_points, 0);
    assert_eq!(guest.total, Money::from_cents(4011));
    assert_eq!(registered.redeemed_points, 500);
    assert_eq!(registered.total, Money::from_cents(3511));
}

/// Notification service that hangs for a long time and then fails
struct StalledNotifier;

impl NotificationClient for StalledNotifier {
    fn publish(&self, _user_id: UserId, _message: String) -> BackendFuture<'_, ()> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(BackendError::Transport("timed out".to_string()))
        })
    }

    fn list(&self, _user_id: UserId) -> BackendFuture<'_, Vec<Notification>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_notifications_do_not_delay_checkout() {
    let harness = Harness::new();
    let outbox = NotificationOutbox::new(Arc::new(StalledNotifier));
    for n in 2..=5 {
        outbox.enqueue(UserId::new(n), "older backlog").await;
    }
    let checkout = CheckoutOrchestrator::new(Arc::new(harness.backend.clone()), outbox.clone(), &harness.config);
    let request = harness.request(&[1]).await;

    let started = tokio::time::Instant::now();
    let receipts = checkout.checkout(Session::Registered(UserId::new(USER)), request).await;

    assert!(receipts.is_ok());
    assert!(started.elapsed() < Duration::from_secs(1));

    // the booking notice is retried later, not lost
    outbox.settle().await;
    let pending = outbox.pending().await;
    assert_eq!(pending.len(), 5);
    assert!(pending.iter().any(|task| task.user_id() == UserId::new(USER)));
}
