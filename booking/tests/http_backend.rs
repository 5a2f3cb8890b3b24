//! REST backend against a mock server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use cinema_booking::HttpBackend;
use cinema_core::backend::PaymentRequest;
use cinema_core::{
    BackendError, BookingBackend, Money, NotificationClient, PaymentType, SeatStatus, ShowtimeId,
    TicketId, UserId,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_decodes_seat_inventory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/showtimes/7/seats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"seatID": 70, "seatNumber": 1, "status": "available"},
            {"seatID": 71, "seatNumber": 2, "status": "booked"},
        ])))
        .mount(&server)
        .await;

    let seats = backend(&server).await.fetch_seats(ShowtimeId::new(7)).await.unwrap();

    assert_eq!(seats.len(), 2);
    assert_eq!(seats[0].seat_number.get(), 1);
    assert_eq!(seats[1].status, SeatStatus::Booked);
}

#[tokio::test]
async fn test_missing_record_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tickets/12"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = backend(&server).await.fetch_ticket(TicketId::new(12)).await.unwrap_err();

    assert_eq!(err, BackendError::not_found("ticket 12"));
}

#[tokio::test]
async fn test_declined_payment_is_rejected_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/"))
        .and(body_partial_json(json!({
            "paymentType": "Credit",
            "amount": 20.06,
            "ccv": "123",
            "userID": 1,
        })))
        .respond_with(ResponseTemplate::new(402).set_body_string("card declined"))
        .expect(1)
        .mount(&server)
        .await;

    let request = PaymentRequest {
        payment_type: PaymentType::Credit,
        amount: Money::from_cents(2006),
        card_owner: "Jane Doe".to_string(),
        card_number: "4242424242424242".to_string(),
        ccv: "123".to_string(),
        expiry: "09/28".to_string(),
        email: "jane@example.com".to_string(),
        user_id: Some(UserId::new(1)),
    };
    let err = backend(&server).await.submit_payment(request).await.unwrap_err();

    assert_eq!(
        err,
        BackendError::Rejected {
            status: 402,
            message: "card declined".to_string(),
        }
    );
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movies/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = backend(&server).await.fetch_movies().await.unwrap_err();

    assert!(matches!(err, BackendError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let backend = HttpBackend::new(uri, Duration::from_secs(1)).unwrap();
    let err = backend.fetch_movies().await.unwrap_err();

    assert!(matches!(err, BackendError::Transport(_)));
}

#[tokio::test]
async fn test_cancellation_reads_refund_amount() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/tickets/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"refundAmount": 17.0})))
        .mount(&server)
        .await;

    let confirmation = backend(&server).await.cancel_ticket(TicketId::new(5)).await.unwrap();

    assert_eq!(confirmation.refund_amount, Money::from_cents(1700));
}

#[tokio::test]
async fn test_credit_update_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/users/3/credits"))
        .and(body_json(json!({"creditPoints": 120})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server)
        .await
        .update_credit_points(UserId::new(3), 120)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_publish_and_list_notifications() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notifications/"))
        .and(body_json(json!({"userID": 3, "message": "Booking confirmed"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userID": 3,
            "name": "Ada",
            "email": "ada@example.com",
            "notificationHistory": [{"message": "first"}, {"message": "second"}],
        })))
        .mount(&server)
        .await;

    let backend = backend(&server).await;
    backend
        .publish(UserId::new(3), "Booking confirmed".to_string())
        .await
        .unwrap();
    let history = backend.list(UserId::new(3)).await.unwrap();

    let messages: Vec<&str> = history.iter().map(|n| n.message.as_str()).collect();
    assert_eq!(messages, ["first", "second"]);
    assert_eq!(history[1].id, 1);
}
