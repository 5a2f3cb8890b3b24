//! In-memory booking backend.
//!
//! A single owned store holding every entity by id. It behaves like the real
//! service for the parts the orchestrator depends on: creating a ticket books
//! its seat (and fails if the seat is already taken), cancelling frees it.
//! Failures can be injected per call to exercise partial checkouts.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test already panicked

use cinema_core::backend::{
    BackendError, BackendFuture, BookingBackend, CancellationConfirmation, PaymentConfirmation,
    PaymentRequest, TicketConfirmation, TicketRequest,
};
use cinema_core::notification::{Notification, NotificationClient};
use cinema_core::types::{
    mask_card_number, Money, Movie, MovieId, NotificationEntry, Payment, PaymentId, PaymentType,
    Seat, SeatId, SeatNumber, SeatStatus, Showtime, ShowtimeId, Ticket, TicketId, TicketStatus,
    UserId, UserProfile,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Admin fee the backend keeps when refunding a guest ticket
pub const GUEST_REFUND_FEE_PERCENT: u32 = 15;

#[derive(Debug, Default)]
struct Failures {
    payment_on_call: Option<usize>,
    ticket_on_call: Option<usize>,
    cancellations: bool,
    credit_updates: bool,
    payment_lookups: bool,
    notifications: usize,
}

#[derive(Debug, Default)]
struct BookingStore {
    movies: BTreeMap<MovieId, Movie>,
    showtimes: HashMap<ShowtimeId, Showtime>,
    seats: HashMap<ShowtimeId, Vec<Seat>>,
    users: HashMap<UserId, UserProfile>,
    payments: BTreeMap<PaymentId, Payment>,
    tickets: BTreeMap<TicketId, Ticket>,
    next_id: u64,
    payment_calls: usize,
    ticket_calls: usize,
    failures: Failures,
}

impl BookingStore {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn seat_mut(&mut self, showtime_id: ShowtimeId, seat: SeatNumber) -> Option<&mut Seat> {
        self.seats
            .get_mut(&showtime_id)?
            .iter_mut()
            .find(|s| s.seat_number == seat)
    }
}

/// In-memory implementation of [`BookingBackend`] and [`NotificationClient`]
#[derive(Clone, Debug, Default)]
pub struct InMemoryBackend {
    store: Arc<RwLock<BookingStore>>,
}

impl InMemoryBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Seeding ==========

    /// Add a movie to the catalogue
    pub fn add_movie(&self, movie: Movie) {
        self.store.write().unwrap().movies.insert(movie.movie_id, movie);
    }

    /// Add a showtime with seats `1..=seat_count`, all available
    pub fn add_showtime(&self, showtime: Showtime, seat_count: u32) {
        let mut store = self.store.write().unwrap();
        let seats = (1..=seat_count)
            .filter_map(SeatNumber::new)
            .map(|seat_number| Seat {
                seat_id: SeatId::new(showtime.showtime_id.get() * 1000 + u64::from(seat_number.get())),
                seat_number,
                status: SeatStatus::Available,
            })
            .collect();
        store.seats.insert(showtime.showtime_id, seats);
        store.showtimes.insert(showtime.showtime_id, showtime);
    }

    /// Force a seat into a status
    pub fn set_seat_status(&self, showtime_id: ShowtimeId, seat: SeatNumber, status: SeatStatus) {
        if let Some(seat) = self.store.write().unwrap().seat_mut(showtime_id, seat) {
            seat.status = status;
        }
    }

    /// Add or replace a user profile
    pub fn add_user(&self, profile: UserProfile) {
        self.store.write().unwrap().users.insert(profile.user_id, profile);
    }

    /// Record a paid, booked ticket directly, bypassing checkout
    pub fn seed_ticket(
        &self,
        showtime_id: ShowtimeId,
        seat: SeatNumber,
        user_id: Option<UserId>,
        amount: Money,
    ) -> TicketId {
        let mut store = self.store.write().unwrap();
        let payment_id = PaymentId::new(store.next_id());
        let ticket_id = TicketId::new(store.next_id());
        let theatre_id = store
            .showtimes
            .get(&showtime_id)
            .map(|s| s.theatre_id)
            .unwrap();

        store.payments.insert(
            payment_id,
            Payment {
                payment_id,
                amount,
                payment_type: PaymentType::Credit,
                card_owner: "Seeded Payer".to_string(),
                card_number: "****0000".to_string(),
                expiry: "01/30".to_string(),
                email: "seeded@example.com".to_string(),
                user_id,
            },
        );
        store.tickets.insert(
            ticket_id,
            Ticket {
                ticket_id,
                showtime_id,
                seat_number: seat,
                theatre_id,
                user_id,
                payment_id,
                status: TicketStatus::Booked,
            },
        );
        if let Some(seat) = store.seat_mut(showtime_id, seat) {
            seat.status = SeatStatus::Booked;
        }
        ticket_id
    }

    // ========== Failure injection ==========

    /// Make the `n`th `submit_payment` call (1-based, counted from now on) fail
    pub fn fail_payment_on_call(&self, n: usize) {
        let mut store = self.store.write().unwrap();
        store.failures.payment_on_call = Some(store.payment_calls + n);
    }

    /// Make the `n`th `create_ticket` call (1-based, counted from now on) fail
    pub fn fail_ticket_on_call(&self, n: usize) {
        let mut store = self.store.write().unwrap();
        store.failures.ticket_on_call = Some(store.ticket_calls + n);
    }

    /// Reject every cancellation
    pub fn fail_cancellations(&self, fail: bool) {
        self.store.write().unwrap().failures.cancellations = fail;
    }

    /// Reject every credit point update
    pub fn fail_credit_updates(&self, fail: bool) {
        self.store.write().unwrap().failures.credit_updates = fail;
    }

    /// Pretend payment records cannot be read
    pub fn fail_payment_lookups(&self, fail: bool) {
        self.store.write().unwrap().failures.payment_lookups = fail;
    }

    /// Reject the next `n` notification publishes
    pub fn fail_next_notifications(&self, n: usize) {
        self.store.write().unwrap().failures.notifications = n;
    }

    // ========== Inspection ==========

    /// All stored payments in id order
    #[must_use]
    pub fn payments(&self) -> Vec<Payment> {
        self.store.read().unwrap().payments.values().cloned().collect()
    }

    /// All stored tickets in id order
    #[must_use]
    pub fn tickets(&self) -> Vec<Ticket> {
        self.store.read().unwrap().tickets.values().cloned().collect()
    }

    /// A user's current profile
    #[must_use]
    pub fn user(&self, user_id: UserId) -> Option<UserProfile> {
        self.store.read().unwrap().users.get(&user_id).cloned()
    }

    /// Current status of one seat
    #[must_use]
    pub fn seat_status(&self, showtime_id: ShowtimeId, seat: SeatNumber) -> Option<SeatStatus> {
        self.store
            .read()
            .unwrap()
            .seats
            .get(&showtime_id)?
            .iter()
            .find(|s| s.seat_number == seat)
            .map(|s| s.status)
    }

    /// Number of `submit_payment` calls received
    #[must_use]
    pub fn payment_calls(&self) -> usize {
        self.store.read().unwrap().payment_calls
    }

    /// Number of `create_ticket` calls received
    #[must_use]
    pub fn ticket_calls(&self) -> usize {
        self.store.read().unwrap().ticket_calls
    }
}

fn conflict(message: impl Into<String>) -> BackendError {
    BackendError::Rejected {
        status: 409,
        message: message.into(),
    }
}

fn declined() -> BackendError {
    BackendError::Rejected {
        status: 402,
        message: "card declined".to_string(),
    }
}

impl BookingBackend for InMemoryBackend {
    fn fetch_seats(&self, showtime_id: ShowtimeId) -> BackendFuture<'_, Vec<Seat>> {
        let seats = self.store.read().unwrap().seats.get(&showtime_id).cloned();
        Box::pin(async move { Ok(seats.unwrap_or_default()) })
    }

    fn fetch_showtime(&self, showtime_id: ShowtimeId) -> BackendFuture<'_, Showtime> {
        let showtime = self.store.read().unwrap().showtimes.get(&showtime_id).cloned();
        Box::pin(async move {
            showtime.ok_or_else(|| BackendError::not_found(format!("showtime {showtime_id}")))
        })
    }

    fn fetch_movies(&self) -> BackendFuture<'_, Vec<Movie>> {
        let movies = self.store.read().unwrap().movies.values().cloned().collect();
        Box::pin(async move { Ok(movies) })
    }

    fn fetch_movie(&self, movie_id: MovieId) -> BackendFuture<'_, Movie> {
        let movie = self.store.read().unwrap().movies.get(&movie_id).cloned();
        Box::pin(async move { movie.ok_or_else(|| BackendError::not_found(format!("movie {movie_id}"))) })
    }

    fn fetch_user(&self, user_id: UserId) -> BackendFuture<'_, UserProfile> {
        let user = self.store.read().unwrap().users.get(&user_id).cloned();
        Box::pin(async move { user.ok_or_else(|| BackendError::not_found(format!("user {user_id}"))) })
    }

    fn update_credit_points(&self, user_id: UserId, credit_points: u64) -> BackendFuture<'_, ()> {
        let result = {
            let mut store = self.store.write().unwrap();
            if store.failures.credit_updates {
                Err(BackendError::Transport("connection reset".to_string()))
            } else if let Some(user) = store.users.get_mut(&user_id) {
                user.credit_points = credit_points;
                Ok(())
            } else {
                Err(BackendError::not_found(format!("user {user_id}")))
            }
        };
        Box::pin(async move { result })
    }

    fn submit_payment(&self, request: PaymentRequest) -> BackendFuture<'_, PaymentConfirmation> {
        let result = {
            let mut store = self.store.write().unwrap();
            store.payment_calls += 1;
            if store.failures.payment_on_call == Some(store.payment_calls) {
                Err(declined())
            } else {
                let payment_id = PaymentId::new(store.next_id());
                store.payments.insert(
                    payment_id,
                    Payment {
                        payment_id,
                        amount: request.amount,
                        payment_type: request.payment_type,
                        card_owner: request.card_owner,
                        card_number: mask_card_number(&request.card_number),
                        expiry: request.expiry,
                        email: request.email,
                        user_id: request.user_id,
                    },
                );
                Ok(PaymentConfirmation {
                    payment_id,
                    user: request.user_id,
                })
            }
        };
        Box::pin(async move { result })
    }

    fn fetch_payment(&self, payment_id: PaymentId) -> BackendFuture<'_, Payment> {
        let result = {
            let store = self.store.read().unwrap();
            if store.failures.payment_lookups {
                Err(BackendError::Rejected {
                    status: 503,
                    message: "payments unavailable".to_string(),
                })
            } else {
                store
                    .payments
                    .get(&payment_id)
                    .cloned()
                    .ok_or_else(|| BackendError::not_found(format!("payment {payment_id}")))
            }
        };
        Box::pin(async move { result })
    }

    fn create_ticket(&self, request: TicketRequest) -> BackendFuture<'_, TicketConfirmation> {
        let result = {
            let mut store = self.store.write().unwrap();
            store.ticket_calls += 1;
            if store.failures.ticket_on_call == Some(store.ticket_calls) {
                Err(conflict("ticket service unavailable"))
            } else {
                match store.seat_mut(request.showtime_id, request.seat_number) {
                    None => Err(BackendError::not_found(format!(
                        "seat {} of showtime {}",
                        request.seat_number, request.showtime_id
                    ))),
                    Some(seat) if !seat.status.is_available() => {
                        Err(conflict(format!("seat {} already taken", request.seat_number)))
                    }
                    Some(seat) => {
                        seat.status = SeatStatus::Booked;
                        let ticket_id = TicketId::new(store.next_id());
                        store.tickets.insert(
                            ticket_id,
                            Ticket {
                                ticket_id,
                                showtime_id: request.showtime_id,
                                seat_number: request.seat_number,
                                theatre_id: request.theatre_id,
                                user_id: request.user_id,
                                payment_id: request.payment_id,
                                status: request.status,
                            },
                        );
                        Ok(TicketConfirmation { ticket_id })
                    }
                }
            }
        };
        Box::pin(async move { result })
    }

    fn fetch_ticket(&self, ticket_id: TicketId) -> BackendFuture<'_, Ticket> {
        let ticket = self.store.read().unwrap().tickets.get(&ticket_id).cloned();
        Box::pin(async move { ticket.ok_or_else(|| BackendError::not_found(format!("ticket {ticket_id}"))) })
    }

    fn cancel_ticket(&self, ticket_id: TicketId) -> BackendFuture<'_, CancellationConfirmation> {
        let result = {
            let mut store = self.store.write().unwrap();
            let ticket = store.tickets.get(&ticket_id).cloned();
            match ticket {
                _ if store.failures.cancellations => Err(BackendError::Rejected {
                    status: 500,
                    message: "refund processor unavailable".to_string(),
                }),
                None => Err(BackendError::not_found(format!("ticket {ticket_id}"))),
                Some(ticket) if ticket.status == TicketStatus::Cancelled => {
                    Err(conflict(format!("ticket {ticket_id} already cancelled")))
                }
                Some(ticket) => {
                    let paid = store
                        .payments
                        .get(&ticket.payment_id)
                        .map_or(Money::ZERO, |p| p.amount);
                    let refund_amount = if ticket.user_id.is_some() {
                        paid
                    } else {
                        paid.saturating_sub(paid.percent_of(GUEST_REFUND_FEE_PERCENT))
                    };
                    if let Some(stored) = store.tickets.get_mut(&ticket_id) {
                        stored.status = TicketStatus::Cancelled;
                    }
                    if let Some(seat) = store.seat_mut(ticket.showtime_id, ticket.seat_number) {
                        seat.status = SeatStatus::Available;
                    }
                    Ok(CancellationConfirmation { refund_amount })
                }
            }
        };
        Box::pin(async move { result })
    }
}

impl NotificationClient for InMemoryBackend {
    fn publish(&self, user_id: UserId, message: String) -> BackendFuture<'_, ()> {
        let result = {
            let mut store = self.store.write().unwrap();
            if store.failures.notifications > 0 {
                store.failures.notifications -= 1;
                Err(BackendError::Transport("notification service unreachable".to_string()))
            } else if let Some(user) = store.users.get_mut(&user_id) {
                user.notification_history.push(NotificationEntry { message });
                Ok(())
            } else {
                Err(BackendError::not_found(format!("user {user_id}")))
            }
        };
        Box::pin(async move { result })
    }

    fn list(&self, user_id: UserId) -> BackendFuture<'_, Vec<Notification>> {
        let result = self
            .store
            .read()
            .unwrap()
            .users
            .get(&user_id)
            .map(|user| {
                user.notification_history
                    .iter()
                    .zip(0..)
                    .map(|(entry, id)| Notification {
                        id,
                        message: entry.message.clone(),
                    })
                    .collect()
            })
            .ok_or_else(|| BackendError::not_found(format!("user {user_id}")));
        Box::pin(async move { result })
    }
}
