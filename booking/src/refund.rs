//! Ticket refunds.
//!
//! A booked ticket can be refunded until a fixed window before its
//! showtime. Guests pay an admin fee out of the refund; registered users
//! get the full price back. The flow is two-step: [`RefundPolicy::lookup`]
//! assesses a ticket without touching it, [`RefundPolicy::submit_refund`]
//! re-checks the assessment and cancels the ticket.

use crate::config::BookingConfig;
use crate::error::{BookingError, Result};
use crate::outbox::NotificationOutbox;
use chrono::{DateTime, TimeDelta, Utc};
use cinema_core::{BackendError, BookingBackend, Clock, Money, Showtime, Ticket, TicketId, TicketStatus};
use serde::Serialize;
use std::sync::Arc;

/// Why a ticket cannot be refunded right now
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum IneligibleReason {
    /// Less than the refund window remains before the showtime
    TooCloseToShowtime,
}

/// Whether a refund may proceed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Eligibility {
    /// The ticket may be refunded
    Eligible,
    /// The ticket may not be refunded
    Ineligible(IneligibleReason),
}

impl Eligibility {
    /// Eligibility of a showtime starting at `starts_at`, seen at `now`
    ///
    /// Eligible when at least `window` remains; exactly `window` counts.
    #[must_use]
    pub fn at(starts_at: DateTime<Utc>, now: DateTime<Utc>, window: TimeDelta) -> Self {
        if starts_at - now >= window {
            Self::Eligible
        } else {
            Self::Ineligible(IneligibleReason::TooCloseToShowtime)
        }
    }

    /// Whether a refund may proceed
    #[must_use]
    pub const fn is_eligible(self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Result of looking a ticket up for a refund
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundAssessment {
    /// The ticket as currently stored
    pub ticket: Ticket,
    /// Its screening
    pub showtime: Showtime,
    /// Whether the refund may proceed
    pub eligibility: Eligibility,
    /// Whether the purchaser is treated as a guest
    pub is_guest: bool,
    /// What the ticket cost
    pub price: Money,
    /// Fee kept from the refund
    pub admin_fee: Money,
    /// `price - admin_fee`
    pub refund_amount: Money,
}

/// A completed refund
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundOutcome {
    /// Cancelled ticket
    pub ticket_id: TicketId,
    /// Amount the backend actually refunded
    pub refund_amount: Money,
}

/// Assesses and performs ticket refunds
#[derive(Clone)]
pub struct RefundPolicy {
    backend: Arc<dyn BookingBackend>,
    outbox: NotificationOutbox,
    clock: Arc<dyn Clock>,
    window: TimeDelta,
    guest_fee_percent: u32,
    fallback_price: Money,
}

impl RefundPolicy {
    /// Create a policy using the configured window, fee and flat price
    #[must_use]
    pub fn new(
        backend: Arc<dyn BookingBackend>,
        outbox: NotificationOutbox,
        clock: Arc<dyn Clock>,
        config: &BookingConfig,
    ) -> Self {
        Self {
            backend,
            outbox,
            clock,
            window: TimeDelta::hours(i64::from(config.policy.refund_window_hours)),
            guest_fee_percent: config.policy.guest_admin_fee_percent,
            fallback_price: config.ticket_price(),
        }
    }

    /// Assess a ticket without changing it
    ///
    /// A purchaser is a guest when the ticket has no user, or the user's
    /// profile cannot be read or carries no email.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown ticket or showtime
    /// - [`BookingError::AlreadyCancelled`] for a refunded ticket
    /// - [`BookingError::Backend`] for other backend failures
    #[tracing::instrument(skip(self))]
    pub async fn lookup(&self, ticket_id: TicketId) -> Result<RefundAssessment> {
        let ticket = self
            .backend
            .fetch_ticket(ticket_id)
            .await
            .map_err(not_found_as_booking_error)?;
        if ticket.status == TicketStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(ticket_id));
        }

        let (showtime, is_guest, price) = futures::join!(
            self.backend.fetch_showtime(ticket.showtime_id),
            self.is_guest(&ticket),
            self.price_of(&ticket),
        );
        let showtime = showtime.map_err(not_found_as_booking_error)?;

        let eligibility = Eligibility::at(showtime.starts_at, self.clock.now(), self.window);
        let admin_fee = if is_guest {
            price.percent_of(self.guest_fee_percent)
        } else {
            Money::ZERO
        };

        tracing::debug!(?eligibility, is_guest, %price, %admin_fee, "Assessed refund");
        Ok(RefundAssessment {
            ticket,
            showtime,
            eligibility,
            is_guest,
            price,
            admin_fee,
            refund_amount: price.saturating_sub(admin_fee),
        })
    }

    /// Cancel an eligible ticket and refund it
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for a blank reason or an ineligible assessment
    /// - [`BookingError::ConcurrentModification`] if the ticket was cancelled
    ///   or became ineligible since `assessment` was made
    /// - [`BookingError::RefundProcessing`] if the backend refuses the cancellation
    #[tracing::instrument(skip(self, assessment), fields(ticket_id = %assessment.ticket.ticket_id))]
    pub async fn submit_refund(&self, assessment: &RefundAssessment, reason: &str) -> Result<RefundOutcome> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(BookingError::Validation("a refund reason is required".to_string()));
        }
        if !assessment.eligibility.is_eligible() {
            return Err(BookingError::Validation(format!(
                "refunds close {} hours before the showtime",
                self.window.num_hours()
            )));
        }

        let ticket_id = assessment.ticket.ticket_id;
        let current = match self.lookup(ticket_id).await {
            Ok(current) if current.eligibility.is_eligible() => current,
            Ok(_) => {
                return Err(BookingError::ConcurrentModification(
                    "the showtime is now inside the refund window".to_string(),
                ));
            }
            Err(BookingError::AlreadyCancelled(_)) => {
                return Err(BookingError::ConcurrentModification(
                    "the ticket has already been cancelled".to_string(),
                ));
            }
            Err(err) => return Err(err),
        };

        let confirmation = self.backend.cancel_ticket(ticket_id).await.map_err(|err| {
            tracing::error!(error = %err, "Cancellation failed");
            BookingError::RefundProcessing(err.to_string())
        })?;
        let refund_amount = confirmation.refund_amount;

        if refund_amount != current.refund_amount {
            tracing::warn!(
                expected = %current.refund_amount,
                refunded = %refund_amount,
                "Backend refunded a different amount than assessed"
            );
        }
        tracing::info!(%refund_amount, reason, "Ticket refunded");

        if let (false, Some(user_id)) = (current.is_guest, current.ticket.user_id) {
            let message = format!("Refund of {refund_amount} processed for ticket {ticket_id}");
            self.outbox.notify(user_id, message).await;
        }

        Ok(RefundOutcome {
            ticket_id,
            refund_amount,
        })
    }

    async fn is_guest(&self, ticket: &Ticket) -> bool {
        let Some(user_id) = ticket.user_id else {
            return true;
        };
        match self.backend.fetch_user(user_id).await {
            Ok(profile) => profile.identity_email().is_none(),
            Err(err) => {
                tracing::warn!(%user_id, error = %err, "Purchaser profile unavailable, treating as guest");
                true
            }
        }
    }

    async fn price_of(&self, ticket: &Ticket) -> Money {
        match self.backend.fetch_payment(ticket.payment_id).await {
            Ok(payment) => payment.amount,
            Err(err) => {
                tracing::warn!(
                    payment_id = %ticket.payment_id,
                    error = %err,
                    fallback = %self.fallback_price,
                    "Payment record unavailable, using flat ticket price"
                );
                self.fallback_price
            }
        }
    }
}

fn not_found_as_booking_error(err: BackendError) -> BookingError {
    match err {
        BackendError::NotFound { resource } => BookingError::NotFound(resource),
        other => BookingError::Backend(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_window_is_inclusive() {
        let window = TimeDelta::hours(72);

        assert_eq!(Eligibility::at(now() + window, now(), window), Eligibility::Eligible);
        assert_eq!(
            Eligibility::at(now() + TimeDelta::hours(71) + TimeDelta::minutes(59), now(), window),
            Eligibility::Ineligible(IneligibleReason::TooCloseToShowtime)
        );
        assert!(!Eligibility::at(now() - TimeDelta::hours(1), now(), window).is_eligible());
    }

    #[test]
    fn test_not_found_mapping() {
        assert_eq!(
            not_found_as_booking_error(BackendError::not_found("ticket 3")),
            BookingError::NotFound("ticket 3".to_string())
        );
        assert!(matches!(
            not_found_as_booking_error(BackendError::Transport("reset".to_string())),
            BookingError::Backend(_)
        ));
    }
}
