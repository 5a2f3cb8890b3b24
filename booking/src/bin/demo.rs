//! Cinema Booking Demo
//!
//! Walks through the storefront flows against an in-memory backend:
//! - Seat map loading and early-access quota for an unreleased movie
//! - Registered checkout with a saved card and credit point redemption
//! - Guest checkout and a guest refund with the admin fee
//! - Sign-in announcements and the notification history
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=cinema_booking=debug cargo run --bin demo
//! ```

use anyhow::Context;
use chrono::TimeDelta;
use cinema_booking::{
    BookingConfig, BookingError, CardDetails, CheckoutOrchestrator, CheckoutRequest,
    NotificationOutbox, PaymentSource, RefundPolicy, ReleaseAnnouncer, SeatMap, SelectionSet,
    Session,
};
use cinema_core::{
    BookingBackend, Clock, MovieId, PaymentType, SeatNumber, ShowtimeId, SystemClock, UserId,
};
use cinema_testing::{fixtures, InMemoryBackend};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cinema_booking=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BookingConfig::from_env();
    config.validate().context("invalid configuration")?;

    println!("\n🎬 ============================================");
    println!("   AcmePlex Booking - Live Demo");
    println!("============================================\n");

    // ========== Setup ==========

    let now = SystemClock.now();
    let backend = InMemoryBackend::new();

    let release = (now + TimeDelta::days(30)).format("%Y-%m-%d").to_string();
    backend.add_movie(fixtures::movie(1, "The Long Projection", Some(&release)));
    backend.add_movie(fixtures::movie(2, "Matinee Classics", None));
    backend.add_showtime(fixtures::showtime(1, now + TimeDelta::days(7)), 50);
    backend.add_user(fixtures::registered_user(1, "john.smith@example.com", 500));

    let shared: Arc<InMemoryBackend> = Arc::new(backend.clone());
    let outbox = NotificationOutbox::new(shared.clone());
    let checkout = CheckoutOrchestrator::new(shared.clone(), outbox.clone(), &config);
    let refunds = RefundPolicy::new(shared.clone(), outbox.clone(), Arc::new(SystemClock), &config);
    let announcer = ReleaseAnnouncer::new(shared.clone(), outbox.clone(), Arc::new(SystemClock));
    let dispatcher = outbox.spawn_dispatcher(config.flush_interval(), config.retry_policy());

    let showtime_id = ShowtimeId::new(1);
    let showtime = backend.fetch_showtime(showtime_id).await?;
    let movie = backend.fetch_movie(MovieId::new(1)).await?;
    let theatre = fixtures::theatre(1, "AcmePlex Downtown");

    // ========== Seat selection ==========

    println!("1️⃣  Loading seats for '{}' ({})", movie.title, showtime.display_time());
    let map = SeatMap::load(&backend, showtime_id, config.policy.seats_per_row).await?;
    let max_allowed = config.quota_policy().for_seat_map(&movie, &map, now);
    println!("   {} seats, {} taken, early-access quota {max_allowed}", map.total_seats(), map.taken_seats());

    let mut selection = SelectionSet::new();
    for n in [12, 13, 14, 15, 16, 17] {
        let seat = SeatNumber::new(n).context("seat numbers start at 1")?;
        match selection.toggle(seat, &map, max_allowed) {
            Ok(outcome) => println!("   {} -> {outcome:?}", map.label(seat)),
            Err(BookingError::QuotaExceeded { max_allowed }) => {
                println!("   {} -> quota of {max_allowed} reached", map.label(seat));
            }
            Err(err) => return Err(err.into()),
        }
    }

    // ========== Registered checkout ==========

    let session = Session::Registered(UserId::new(1));
    let quote = checkout.quote(session, selection.len(), true).await?;
    println!("\n2️⃣  Quote: subtotal {}, tax {}, points -{}, total {}", quote.subtotal, quote.tax, quote.points_value, quote.total);

    let receipts = checkout
        .checkout(
            session,
            CheckoutRequest {
                theatre: theatre.clone(),
                movie: movie.clone(),
                showtime: showtime.clone(),
                seats: selection.seats().to_vec(),
                payment: PaymentSource::Saved {
                    method_id: 1,
                    cvv: "123".to_string(),
                },
                guest_email: None,
                redeem_points: true,
            },
        )
        .await?;
    for receipt in &receipts {
        println!("   🎟  #{} {} - {} - {}", receipt.ticket_id, receipt.movie_title, receipt.showtime, receipt.seat.describe());
    }

    // ========== Guest checkout and refund ==========

    println!("\n3️⃣  Guest buys one seat and asks for a refund");
    let guest_seat = SeatNumber::new(40).context("seat numbers start at 1")?;
    let guest_receipts = checkout
        .checkout(
            Session::Guest,
            CheckoutRequest {
                theatre,
                movie,
                showtime,
                seats: vec![guest_seat],
                payment: PaymentSource::Card(CardDetails {
                    payment_type: Some(PaymentType::Credit),
                    owner: "Jane Doe".to_string(),
                    number: "4242 4242 4242 4242".to_string(),
                    expiry: "09/28".to_string(),
                    cvv: "321".to_string(),
                }),
                guest_email: Some("jane@example.com".to_string()),
                redeem_points: false,
            },
        )
        .await?;

    let ticket_id = guest_receipts
        .first()
        .map(|r| r.ticket_id)
        .context("guest checkout issued no ticket")?;
    let assessment = refunds.lookup(ticket_id).await?;
    println!(
        "   price {}, admin fee {}, refund {} ({:?})",
        assessment.price, assessment.admin_fee, assessment.refund_amount, assessment.eligibility
    );
    let outcome = refunds.submit_refund(&assessment, "Plans changed").await?;
    println!("   ✓ refunded {}", outcome.refund_amount);

    // ========== Announcements ==========

    println!("\n4️⃣  Sign-in announcements");
    let queued = announcer.announce(UserId::new(1)).await?;
    println!("   queued {queued} announcement(s)");
    outbox.settle().await;
    for notification in outbox.recent(UserId::new(1), 5).await? {
        println!("   🔔 {}", notification.message);
    }

    dispatcher.abort();
    println!("\n✅ Demo complete\n");
    Ok(())
}
