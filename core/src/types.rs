//! Domain types for the cinema booking system.
//!
//! Value objects, entities and wire records shared by the orchestrator and
//! every backend implementation. Field names follow the backend's JSON
//! contract (`movieID`, `seatNumber`, ...), so these types can be decoded
//! straight off the wire.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates an identifier from its raw backend value
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw backend value
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

numeric_id!(
    /// Unique identifier for a movie
    MovieId
);
numeric_id!(
    /// Unique identifier for a theatre
    TheatreId
);
numeric_id!(
    /// Unique identifier for a scheduled screening
    ShowtimeId
);
numeric_id!(
    /// Backend identifier of a seat record
    SeatId
);
numeric_id!(
    /// Unique identifier for a registered user
    UserId
);
numeric_id!(
    /// Unique identifier for an issued ticket
    TicketId
);
numeric_id!(
    /// Unique identifier for a payment
    PaymentId
);

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero dollars
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from dollars with overflow checking
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Adds two money amounts, clamping at the maximum representable value
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts two money amounts (returns None if result would be negative)
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        if self.0 >= other.0 {
            Some(Self(self.0 - other.0))
        } else {
            None
        }
    }

    /// Subtracts two money amounts, flooring at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies money by a quantity, clamping on overflow
    #[must_use]
    pub const fn saturating_multiply(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }

    /// Returns `percent`% of this amount, rounded half-up to the cent
    ///
    /// `percent_of(15)` on $20.00 is $3.00; `percent_of(5)` on $57.30 is $2.87.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn percent_of(self, percent: u32) -> Self {
        let cents = ((self.0 as u128) * (percent as u128) + 50) / 100;
        if cents > u64::MAX as u128 {
            Self(u64::MAX)
        } else {
            Self(cents as u64)
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

/// Serde adapter for amounts the backend exchanges as decimal dollars
///
/// `19.1` on the wire is `Money::from_cents(1910)` in memory.
pub mod dollars {
    use super::Money;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes cents as a decimal dollar amount
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::cast_precision_loss, clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(money: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(money.cents() as f64 / 100.0)
    }

    /// Deserializes a decimal dollar amount into cents
    ///
    /// # Errors
    ///
    /// Fails on negative, infinite or NaN amounts.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() || value < 0.0 {
            return Err(D::Error::custom(format!("invalid amount: {value}")));
        }
        Ok(Money::from_cents((value * 100.0).round() as u64))
    }
}

// ============================================================================
// Seats
// ============================================================================

/// Seat number within a showtime (1-based)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SeatNumber(u32);

impl SeatNumber {
    /// Creates a seat number, rejecting zero
    #[must_use]
    pub const fn new(number: u32) -> Option<Self> {
        if number == 0 { None } else { Some(Self(number)) }
    }

    /// Returns the raw seat number
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for SeatNumber {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "seat numbers start at 1".to_string())
    }
}

impl From<SeatNumber> for u32 {
    fn from(seat: SeatNumber) -> Self {
        seat.0
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Availability of a single seat
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    /// Free to select
    Available,
    /// Held but not paid for
    Reserved,
    /// Sold
    Booked,
}

impl SeatStatus {
    /// Whether the seat can be added to a selection
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// One seat of a showtime's inventory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    /// Backend record id
    #[serde(rename = "seatID")]
    pub seat_id: SeatId,
    /// Seat number within the showtime
    pub seat_number: SeatNumber,
    /// Current availability
    pub status: SeatStatus,
}

// ============================================================================
// Catalogue
// ============================================================================

/// A movie as listed by the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    /// Movie id
    #[serde(rename = "movieID")]
    pub movie_id: MovieId,
    /// Display title
    #[serde(rename = "movieTitle")]
    pub title: String,
    /// Release date as sent by the backend (`YYYY-MM-DD` or RFC 3339)
    #[serde(rename = "releaseDate", default)]
    pub release_date: Option<String>,
}

impl Movie {
    /// Parsed release date, `None` when absent or unparsable
    #[must_use]
    pub fn release_date(&self) -> Option<NaiveDate> {
        let raw = self.release_date.as_deref()?.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|ts| ts.with_timezone(&Utc).date_naive())
        })
    }

    /// Whether the movie is still unreleased at `now`
    ///
    /// A bare `YYYY-MM-DD` date releases at the start of that calendar day;
    /// a full timestamp releases at that instant.
    #[must_use]
    pub fn is_unreleased_at(&self, now: DateTime<Utc>) -> bool {
        let Some(raw) = self.release_date.as_deref().map(str::trim) else {
            return false;
        };
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return date > now.date_naive();
        }
        DateTime::parse_from_rfc3339(raw).is_ok_and(|release| release.with_timezone(&Utc) > now)
    }
}

/// A cinema
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theatre {
    /// Theatre id
    #[serde(rename = "theatreID")]
    pub theatre_id: TheatreId,
    /// Display name
    pub name: String,
    /// Address line
    #[serde(default)]
    pub location: Option<String>,
}

/// A scheduled screening of a movie at a theatre
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Showtime {
    /// Showtime id
    #[serde(rename = "showtimeID")]
    pub showtime_id: ShowtimeId,
    /// Screened movie
    #[serde(rename = "movieID")]
    pub movie_id: MovieId,
    /// Hosting theatre
    #[serde(rename = "theatreID")]
    pub theatre_id: TheatreId,
    /// Start of the screening
    pub starts_at: DateTime<Utc>,
}

impl Showtime {
    /// Receipt formatting, e.g. `4:30 PM, Nov 28, 2024`
    #[must_use]
    pub fn display_time(&self) -> String {
        self.starts_at.format("%-I:%M %p, %b %-d, %Y").to_string()
    }
}

// ============================================================================
// Users
// ============================================================================

/// Card family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    /// Credit card
    #[serde(alias = "Credit Card")]
    Credit,
    /// Debit card
    #[serde(alias = "Debit Card")]
    Debit,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credit => write!(f, "Credit"),
            Self::Debit => write!(f, "Debit"),
        }
    }
}

/// A card stored on a user profile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPaymentMethod {
    /// Id within the profile
    pub id: u64,
    /// Card family
    pub payment_type: PaymentType,
    /// Name on the card
    pub owner: String,
    /// Card number (usually already masked by the backend)
    pub number: String,
    /// Expiry as `MM/YY`
    pub expiry_date: String,
}

/// One entry of a user's notification history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEntry {
    /// Notification text
    pub message: String,
}

/// A registered user's profile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User id
    #[serde(rename = "userID")]
    pub user_id: UserId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Contact email, required for checkout receipts
    #[serde(default)]
    pub email: Option<String>,
    /// Redeemable points, 1 point = $0.01
    #[serde(default)]
    pub credit_points: u64,
    /// Saved cards
    #[serde(default)]
    pub payment_methods: Vec<SavedPaymentMethod>,
    /// Messages published to this user, oldest first
    #[serde(default)]
    pub notification_history: Vec<NotificationEntry>,
}

impl UserProfile {
    /// The profile's email if it carries a non-blank one
    #[must_use]
    pub fn identity_email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|email| !email.is_empty())
    }
}

// ============================================================================
// Tickets & Payments
// ============================================================================

/// Lifecycle of an issued ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Paid and valid
    #[serde(alias = "valid", alias = "Valid", alias = "Booked")]
    Booked,
    /// Refunded
    #[serde(alias = "Cancelled")]
    Cancelled,
}

/// One booked seat
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Ticket id
    #[serde(rename = "ticketID")]
    pub ticket_id: TicketId,
    /// Screening
    #[serde(rename = "showtimeID")]
    pub showtime_id: ShowtimeId,
    /// Booked seat
    pub seat_number: SeatNumber,
    /// Theatre of the screening
    #[serde(rename = "theatreID")]
    pub theatre_id: TheatreId,
    /// Purchaser, `None` for guests
    #[serde(rename = "userID", default)]
    pub user_id: Option<UserId>,
    /// Payment that paid for this seat
    #[serde(rename = "paymentID")]
    pub payment_id: PaymentId,
    /// Current status
    pub status: TicketStatus,
}

/// A stored payment record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment id
    #[serde(rename = "paymentID")]
    pub payment_id: PaymentId,
    /// Charged amount
    #[serde(with = "dollars")]
    pub amount: Money,
    /// Card family
    pub payment_type: PaymentType,
    /// Name on the card
    pub card_owner: String,
    /// Masked card number
    pub card_number: String,
    /// Expiry as `MM/YY`
    pub expiry: String,
    /// Payer email
    pub email: String,
    /// Registered payer, if any
    #[serde(rename = "userID", default)]
    pub user_id: Option<UserId>,
}

/// Masks all but the last four digits of a card number
#[must_use]
pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("****{tail}")
}
