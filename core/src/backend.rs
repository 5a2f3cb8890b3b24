//! The booking backend contract.
//!
//! Seat inventory, ticket and payment ledgers, and user profiles all live in
//! an external service. The orchestrator only talks to it through
//! [`BookingBackend`]; production wires in the HTTP client, tests wire in an
//! in-memory store.

use crate::types::{
    dollars, mask_card_number, Money, Movie, MovieId, Payment, PaymentId, PaymentType, Seat,
    SeatNumber, Showtime, ShowtimeId, TheatreId, Ticket, TicketId, TicketStatus, UserId,
    UserProfile,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by backend calls
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// Errors reported by a backend call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The referenced record does not exist
    #[error("{resource} not found")]
    NotFound {
        /// What was looked up, e.g. `ticket 42`
        resource: String,
    },

    /// The backend answered with a non-success status
    #[error("backend rejected request (status {status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The request never got a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("response decode error: {0}")]
    Decode(String),
}

impl BackendError {
    /// Shorthand for a [`BackendError::NotFound`]
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Whether the error means "no such record"
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Charge for a single ticket
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Card family
    pub payment_type: PaymentType,
    /// Amount to charge (one ticket including tax)
    #[serde(with = "dollars")]
    pub amount: Money,
    /// Name on the card
    pub card_owner: String,
    /// Full card number, or the stored reference of a saved card
    pub card_number: String,
    /// Card verification code
    pub ccv: String,
    /// Expiry as `MM/YY`
    pub expiry: String,
    /// Receipt address
    pub email: String,
    /// Registered payer, `None` for guests
    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl fmt::Debug for PaymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentRequest")
            .field("payment_type", &self.payment_type)
            .field("amount", &self.amount)
            .field("card_owner", &self.card_owner)
            .field("card_number", &mask_card_number(&self.card_number))
            .field("ccv", &"***")
            .field("expiry", &self.expiry)
            .field("email", &self.email)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Backend answer to a successful charge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    /// Id of the stored payment
    #[serde(rename = "paymentID")]
    pub payment_id: PaymentId,
    /// User the payment was attributed to
    #[serde(default)]
    pub user: Option<UserId>,
}

/// Issue one ticket for a paid seat
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    /// Screening
    #[serde(rename = "showtimeID")]
    pub showtime_id: ShowtimeId,
    /// Seat being sold
    pub seat_number: SeatNumber,
    /// Theatre of the screening
    #[serde(rename = "theatreID")]
    pub theatre_id: TheatreId,
    /// Registered purchaser, `None` for guests
    #[serde(rename = "userID")]
    pub user_id: Option<UserId>,
    /// Screening start
    pub date: DateTime<Utc>,
    /// Payment covering this seat
    #[serde(rename = "paymentID")]
    pub payment_id: PaymentId,
    /// Initial status, always [`TicketStatus::Booked`]
    pub status: TicketStatus,
}

/// Backend answer to a successful ticket issuance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketConfirmation {
    /// Id of the new ticket
    #[serde(rename = "ticketID")]
    pub ticket_id: TicketId,
}

/// Backend answer to a successful cancellation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationConfirmation {
    /// Amount actually refunded
    #[serde(with = "dollars")]
    pub refund_amount: Money,
}

/// Booking backend trait
///
/// Abstraction over the storefront's REST service. Every call resolves to
/// success or a [`BackendError`]; timeouts are the implementation's concern.
pub trait BookingBackend: Send + Sync {
    /// Seat inventory of a showtime
    fn fetch_seats(&self, showtime_id: ShowtimeId) -> BackendFuture<'_, Vec<Seat>>;

    /// A single showtime
    fn fetch_showtime(&self, showtime_id: ShowtimeId) -> BackendFuture<'_, Showtime>;

    /// The full movie catalogue
    fn fetch_movies(&self) -> BackendFuture<'_, Vec<Movie>>;

    /// A single movie
    fn fetch_movie(&self, movie_id: MovieId) -> BackendFuture<'_, Movie>;

    /// A registered user's profile
    fn fetch_user(&self, user_id: UserId) -> BackendFuture<'_, UserProfile>;

    /// Overwrite a user's credit point balance
    fn update_credit_points(&self, user_id: UserId, credit_points: u64) -> BackendFuture<'_, ()>;

    /// Charge one ticket
    fn submit_payment(&self, request: PaymentRequest) -> BackendFuture<'_, PaymentConfirmation>;

    /// A stored payment record
    fn fetch_payment(&self, payment_id: PaymentId) -> BackendFuture<'_, Payment>;

    /// Issue one ticket for a paid seat
    fn create_ticket(&self, request: TicketRequest) -> BackendFuture<'_, TicketConfirmation>;

    /// A single ticket
    fn fetch_ticket(&self, ticket_id: TicketId) -> BackendFuture<'_, Ticket>;

    /// Cancel a ticket and refund it
    fn cancel_ticket(&self, ticket_id: TicketId) -> BackendFuture<'_, CancellationConfirmation>;
}
