//! Error taxonomy of the booking orchestrator.

use crate::checkout::TicketReceipt;
use crate::seat_map::SeatLabel;
use cinema_core::{BackendError, PaymentId, TicketId};
use thiserror::Error;

/// Errors surfaced by seat selection, checkout and refunds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    /// Missing or malformed input, caught before any backend call
    #[error("validation failed: {0}")]
    Validation(String),

    /// Selection would exceed the early-access seat quota
    #[error("seat quota exceeded: at most {max_allowed} seat(s) may be selected")]
    QuotaExceeded {
        /// Quota in force for this selection
        max_allowed: u32,
    },

    /// Unknown ticket, showtime or seat
    #[error("not found: {0}")]
    NotFound(String),

    /// Refund requested for a ticket that was already refunded
    #[error("ticket {0} has already been cancelled")]
    AlreadyCancelled(TicketId),

    /// Charging the given seat failed; earlier seats stay charged and booked
    #[error("payment for seat {seat} failed: {reason}")]
    PaymentFailed {
        /// Seat whose payment failed
        seat: SeatLabel,
        /// Receipts for the seats completed before the failure
        issued: Vec<TicketReceipt>,
        /// Backend reason
        reason: String,
    },

    /// The seat was paid for but no ticket could be issued
    #[error("ticket issuance for seat {seat} failed (payment {payment_id} was taken): {reason}")]
    TicketIssuanceFailed {
        /// Seat whose ticket failed
        seat: SeatLabel,
        /// Payment already taken for that seat
        payment_id: PaymentId,
        /// Receipts for the seats completed before the failure
        issued: Vec<TicketReceipt>,
        /// Backend reason
        reason: String,
    },

    /// The backend refused or failed the cancellation
    #[error("refund processing failed: {0}")]
    RefundProcessing(String),

    /// Eligibility changed between lookup and submit
    #[error("refund eligibility changed since lookup: {0}")]
    ConcurrentModification(String),

    /// Any other backend failure
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl BookingError {
    /// Receipts issued before a mid-checkout failure
    ///
    /// Empty for every error that is not a partial checkout.
    #[must_use]
    pub fn issued_receipts(&self) -> &[TicketReceipt] {
        match self {
            Self::PaymentFailed { issued, .. } | Self::TicketIssuanceFailed { issued, .. } => issued,
            _ => &[],
        }
    }

    /// Whether the user can fix the problem by editing their input
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::QuotaExceeded { .. })
    }
}

/// Result alias for booking operations
pub type Result<T> = std::result::Result<T, BookingError>;
