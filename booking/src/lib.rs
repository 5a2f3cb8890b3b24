//! # Cinema Booking
//!
//! Booking and checkout orchestration for the cinema storefront.
//!
//! The UI is a thin shell over this crate. It owns the business rules:
//!
//! - **Seat selection**: [`SeatMap`] inventory, [`SelectionSet`] toggling,
//!   row/position labels
//! - **Early access**: [`QuotaPolicy`] caps seats for unreleased movies
//! - **Checkout**: [`CheckoutOrchestrator`] sells seats one payment and one
//!   ticket at a time, with credit point redemption
//! - **Refunds**: [`RefundPolicy`] enforces the refund window and the guest
//!   admin fee
//! - **Notifications**: [`NotificationOutbox`] delivers side effects without
//!   blocking the operations that produce them
//!
//! All I/O goes through the [`BookingBackend`](cinema_core::BookingBackend)
//! and [`NotificationClient`](cinema_core::NotificationClient) traits;
//! [`HttpBackend`] implements both over REST.
//!
//! ## Example
//!
//! ```
//! use cinema_booking::{BookingConfig, SeatMap, SelectionSet};
//! use cinema_core::{SeatNumber, ShowtimeId};
//! use cinema_testing::{fixtures, test_clock, InMemoryBackend};
//!
//! # async fn example() -> cinema_booking::Result<()> {
//! let backend = InMemoryBackend::new();
//! backend.add_showtime(fixtures::showtime(1, test_clock().time()), 30);
//!
//! let config = BookingConfig::default();
//! let map = SeatMap::load(&backend, ShowtimeId::new(1), config.policy.seats_per_row).await?;
//!
//! let mut selection = SelectionSet::new();
//! selection.toggle(SeatNumber::new(12).unwrap(), &map, 4)?;
//! assert_eq!(map.label(selection.seats()[0]).describe(), "Row B, Seat 2");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod announcements;
pub mod checkout;
pub mod config;
pub mod error;
pub mod http;
pub mod outbox;
pub mod pricing;
pub mod quota;
pub mod refund;
pub mod retry;
pub mod seat_map;
pub mod session;

pub use announcements::ReleaseAnnouncer;
pub use checkout::{CardDetails, CheckoutOrchestrator, CheckoutRequest, PaymentSource, TicketReceipt};
pub use config::{BookingConfig, ConfigError};
pub use error::{BookingError, Result};
pub use http::HttpBackend;
pub use outbox::{FlushReport, NotificationOutbox, OutboxTask};
pub use pricing::PriceQuote;
pub use quota::QuotaPolicy;
pub use refund::{Eligibility, IneligibleReason, RefundAssessment, RefundOutcome, RefundPolicy};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use seat_map::{SeatLabel, SeatMap, SelectionSet, Toggle};
pub use session::Session;
