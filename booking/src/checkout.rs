//! Multi-seat checkout.
//!
//! Each seat is an independent sale: one payment, then one ticket, strictly
//! in selection order. The first failure stops the loop. Seats completed
//! before it stay paid and booked, and the error carries their receipts so
//! the caller can show exactly what went through.

use crate::config::BookingConfig;
use crate::error::{BookingError, Result};
use crate::outbox::NotificationOutbox;
use crate::pricing::PriceQuote;
use crate::seat_map::SeatLabel;
use crate::session::Session;
use cinema_core::backend::{PaymentRequest, TicketRequest};
use cinema_core::{
    mask_card_number, BookingBackend, Money, Movie, PaymentId, PaymentType, SeatNumber, Showtime,
    Theatre, TicketId, TicketStatus, UserId, UserProfile,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Request
// ============================================================================

/// Card details typed in at checkout
#[derive(Clone, PartialEq, Eq)]
pub struct CardDetails {
    /// Card family, `None` until the user picks one
    pub payment_type: Option<PaymentType>,
    /// Name on the card
    pub owner: String,
    /// Card number, spaces allowed
    pub number: String,
    /// Expiry as `MM/YY`
    pub expiry: String,
    /// Verification code
    pub cvv: String,
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("payment_type", &self.payment_type)
            .field("owner", &self.owner)
            .field("number", &mask_card_number(&self.number))
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl CardDetails {
    /// Check that every field is present and well-formed
    ///
    /// # Errors
    ///
    /// [`BookingError::Validation`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let digits = self.compact_number();
        if digits.is_empty() {
            return invalid("card number is required");
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) || !(12..=19).contains(&digits.len()) {
            return invalid("card number must be 12 to 19 digits");
        }
        self.validate_holder_fields()
    }

    /// Check a card resolved from a saved payment method
    ///
    /// The stored number is a backend reference (usually masked, e.g.
    /// `****8123`) and only has to be present.
    ///
    /// # Errors
    ///
    /// [`BookingError::Validation`] naming the first bad field.
    pub fn validate_saved(&self) -> Result<()> {
        if self.compact_number().is_empty() {
            return invalid("saved card has no card reference");
        }
        self.validate_holder_fields()
    }

    fn compact_number(&self) -> String {
        self.number.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn validate_holder_fields(&self) -> Result<()> {
        if self.payment_type.is_none() {
            return invalid("payment type is required");
        }
        if self.owner.trim().is_empty() {
            return invalid("card owner is required");
        }
        if !is_valid_expiry(self.expiry.trim()) {
            return invalid("expiry must be MM/YY");
        }

        let cvv = self.cvv.trim();
        if cvv.is_empty() {
            return invalid("CVV is required");
        }
        if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            return invalid("CVV must be 3 or 4 digits");
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Result<()> {
    Err(BookingError::Validation(message.to_string()))
}

fn is_valid_expiry(expiry: &str) -> bool {
    let Some((month, year)) = expiry.split_once('/') else {
        return false;
    };
    let two_digits = |s: &str| s.len() == 2 && s.chars().all(|c| c.is_ascii_digit());
    two_digits(month)
        && two_digits(year)
        && month.parse::<u8>().is_ok_and(|m| (1..=12).contains(&m))
}

/// How the order is paid
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentSource {
    /// A card entered for this order
    Card(CardDetails),
    /// A card saved on the registered payer's profile
    Saved {
        /// Id of the saved method
        method_id: u64,
        /// Verification code, never stored
        cvv: String,
    },
}

/// Everything needed to sell a set of seats
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Theatre of the screening
    pub theatre: Theatre,
    /// Movie being shown
    pub movie: Movie,
    /// Screening
    pub showtime: Showtime,
    /// Seats in selection order
    pub seats: Vec<SeatNumber>,
    /// Payment method
    pub payment: PaymentSource,
    /// Receipt address, required for guests and ignored for registered payers
    pub guest_email: Option<String>,
    /// Spend the payer's credit points on this order
    pub redeem_points: bool,
}

/// Confirmation for one booked seat
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketReceipt {
    /// Issued ticket
    pub ticket_id: TicketId,
    /// Payment covering the ticket
    pub payment_id: PaymentId,
    /// Movie title
    pub movie_title: String,
    /// Theatre name
    pub theatre_name: String,
    /// Screening time, e.g. `4:30 PM, Nov 28, 2024`
    pub showtime: String,
    /// Seat number within the showtime
    pub seat_number: SeatNumber,
    /// Seat label, e.g. `B7`
    pub seat: SeatLabel,
    /// Amount charged for this seat
    pub amount: Money,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Resolved payer for one checkout
struct Payer {
    user_id: Option<UserId>,
    email: String,
    card: CardDetails,
    available_points: u64,
}

/// Sells seats against a [`BookingBackend`]
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    backend: Arc<dyn BookingBackend>,
    outbox: NotificationOutbox,
    ticket_price: Money,
    tax_percent: u32,
    seats_per_row: u32,
}

impl CheckoutOrchestrator {
    /// Create an orchestrator using the configured price, tax and row width
    #[must_use]
    pub fn new(backend: Arc<dyn BookingBackend>, outbox: NotificationOutbox, config: &BookingConfig) -> Self {
        Self {
            backend,
            outbox,
            ticket_price: config.ticket_price(),
            tax_percent: config.pricing.tax_percent,
            seats_per_row: config.policy.seats_per_row,
        }
    }

    /// Pricing summary for `seat_count` seats
    ///
    /// Guests never redeem points.
    ///
    /// # Errors
    ///
    /// Propagates a failed profile fetch for registered sessions.
    pub async fn quote(&self, session: Session, seat_count: u32, redeem: bool) -> Result<PriceQuote> {
        let available_points = match session.user_id() {
            Some(user_id) => self.backend.fetch_user(user_id).await?.credit_points,
            None => 0,
        };
        Ok(self.price(seat_count, available_points, redeem && !session.is_guest()))
    }

    /// Pay for and issue one ticket per selected seat
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for an empty or duplicated selection,
    ///   incomplete card details, a missing payer email or an unknown saved card
    /// - [`BookingError::PaymentFailed`] / [`BookingError::TicketIssuanceFailed`]
    ///   when a seat fails; both carry the receipts already issued
    /// - [`BookingError::Backend`] if the payer profile cannot be fetched
    #[tracing::instrument(
        skip(self, request),
        fields(
            showtime_id = %request.showtime.showtime_id,
            seats = request.seats.len(),
        )
    )]
    pub async fn checkout(&self, session: Session, request: CheckoutRequest) -> Result<Vec<TicketReceipt>> {
        validate_selection(&request.seats)?;
        if let PaymentSource::Card(card) = &request.payment {
            card.validate()?;
        }
        if session.is_guest() {
            guest_email(request.guest_email.as_deref())?;
        }

        let payer = self.resolve_payer(session, &request).await?;
        let seat_count = u32::try_from(request.seats.len()).unwrap_or(u32::MAX);
        let quote = self.price(seat_count, payer.available_points, request.redeem_points && payer.user_id.is_some());
        let amount = quote.per_seat_charge();

        let mut receipts = Vec::with_capacity(request.seats.len());
        for &seat_number in &request.seats {
            let receipt = self.sell_seat(&request, &payer, seat_number, amount, &receipts).await?;
            receipts.push(receipt);
        }

        tracing::info!(
            tickets = receipts.len(),
            per_seat = %amount,
            redeemed_points = quote.redeemed_points,
            "Checkout completed"
        );

        if let Some(user_id) = payer.user_id {
            if quote.redeemed_points > 0 {
                self.debit_points(user_id, quote.remaining_points(payer.available_points)).await;
            }
            self.notify_booking(user_id, &request, &receipts).await;
        }

        Ok(receipts)
    }

    fn price(&self, seat_count: u32, available_points: u64, redeem: bool) -> PriceQuote {
        PriceQuote::compute(self.ticket_price, seat_count, self.tax_percent, available_points, redeem)
    }

    async fn resolve_payer(&self, session: Session, request: &CheckoutRequest) -> Result<Payer> {
        match session {
            Session::Guest => {
                let PaymentSource::Card(card) = &request.payment else {
                    return Err(BookingError::Validation(
                        "saved payment methods require signing in".to_string(),
                    ));
                };
                Ok(Payer {
                    user_id: None,
                    email: guest_email(request.guest_email.as_deref())?,
                    card: card.clone(),
                    available_points: 0,
                })
            }
            Session::Registered(user_id) => {
                let profile = self.backend.fetch_user(user_id).await?;
                let email = profile
                    .identity_email()
                    .ok_or_else(|| {
                        BookingError::Validation("your profile has no email address".to_string())
                    })?
                    .to_string();
                let card = match &request.payment {
                    PaymentSource::Card(card) => card.clone(),
                    PaymentSource::Saved { method_id, cvv } => saved_card(&profile, *method_id, cvv)?,
                };
                Ok(Payer {
                    user_id: Some(user_id),
                    email,
                    card,
                    available_points: profile.credit_points,
                })
            }
        }
    }

    async fn sell_seat(
        &self,
        request: &CheckoutRequest,
        payer: &Payer,
        seat_number: SeatNumber,
        amount: Money,
        issued: &[TicketReceipt],
    ) -> Result<TicketReceipt> {
        let seat = SeatLabel::from_seat_number(seat_number, self.seats_per_row);
        let showtime = &request.showtime;

        let payment = PaymentRequest {
            // validated before the loop
            payment_type: payer.card.payment_type.unwrap_or(PaymentType::Credit),
            amount,
            card_owner: payer.card.owner.trim().to_string(),
            card_number: payer.card.compact_number(),
            ccv: payer.card.cvv.trim().to_string(),
            expiry: payer.card.expiry.trim().to_string(),
            email: payer.email.clone(),
            user_id: payer.user_id,
        };
        let payment_id = match self.backend.submit_payment(payment).await {
            Ok(confirmation) => confirmation.payment_id,
            Err(err) => {
                tracing::error!(%seat, error = %err, issued = issued.len(), "Payment failed");
                return Err(BookingError::PaymentFailed {
                    seat,
                    issued: issued.to_vec(),
                    reason: err.to_string(),
                });
            }
        };

        let ticket = TicketRequest {
            showtime_id: showtime.showtime_id,
            seat_number,
            theatre_id: request.theatre.theatre_id,
            user_id: payer.user_id,
            date: showtime.starts_at,
            payment_id,
            status: TicketStatus::Booked,
        };
        let ticket_id = match self.backend.create_ticket(ticket).await {
            Ok(confirmation) => confirmation.ticket_id,
            Err(err) => {
                tracing::error!(%seat, %payment_id, error = %err, issued = issued.len(), "Ticket issuance failed after payment");
                return Err(BookingError::TicketIssuanceFailed {
                    seat,
                    payment_id,
                    issued: issued.to_vec(),
                    reason: err.to_string(),
                });
            }
        };

        tracing::info!(%seat, %payment_id, %ticket_id, "Seat sold");
        Ok(TicketReceipt {
            ticket_id,
            payment_id,
            movie_title: request.movie.title.clone(),
            theatre_name: request.theatre.name.clone(),
            showtime: showtime.display_time(),
            seat_number,
            seat,
            amount,
        })
    }

    /// Credit point failures leave the balance untouched and are not surfaced
    async fn debit_points(&self, user_id: UserId, remaining: u64) {
        match self.backend.update_credit_points(user_id, remaining).await {
            Ok(()) => tracing::info!(%user_id, remaining, "Credit points debited"),
            Err(err) => tracing::error!(%user_id, remaining, error = %err, "Failed to debit credit points"),
        }
    }

    async fn notify_booking(&self, user_id: UserId, request: &CheckoutRequest, receipts: &[TicketReceipt]) {
        let seats: Vec<String> = receipts.iter().map(|r| r.seat.to_string()).collect();
        let message = format!(
            "Booking confirmed: {} ticket(s) for {} at {}, {} (seats {})",
            receipts.len(),
            request.movie.title,
            request.theatre.name,
            request.showtime.display_time(),
            seats.join(", ")
        );
        self.outbox.notify(user_id, message).await;
    }
}

fn validate_selection(seats: &[SeatNumber]) -> Result<()> {
    if seats.is_empty() {
        return Err(BookingError::Validation("select at least one seat".to_string()));
    }
    let mut seen = HashSet::with_capacity(seats.len());
    if let Some(duplicate) = seats.iter().find(|seat| !seen.insert(**seat)) {
        return Err(BookingError::Validation(format!("seat {duplicate} selected twice")));
    }
    Ok(())
}

fn guest_email(email: Option<&str>) -> Result<String> {
    match email.map(str::trim) {
        Some(email) if email.contains('@') && !email.starts_with('@') && !email.ends_with('@') => {
            Ok(email.to_string())
        }
        Some(email) if !email.is_empty() => {
            Err(BookingError::Validation(format!("'{email}' is not an email address")))
        }
        _ => Err(BookingError::Validation("an email address is required".to_string())),
    }
}

fn saved_card(profile: &UserProfile, method_id: u64, cvv: &str) -> Result<CardDetails> {
    let method = profile
        .payment_methods
        .iter()
        .find(|m| m.id == method_id)
        .ok_or_else(|| BookingError::Validation(format!("unknown saved payment method {method_id}")))?;

    let card = CardDetails {
        payment_type: Some(method.payment_type),
        owner: method.owner.clone(),
        number: method.number.clone(),
        expiry: method.expiry_date.clone(),
        cvv: cvv.to_string(),
    };
    card.validate_saved()?;
    Ok(card)
}
