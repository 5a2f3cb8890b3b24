//! Seat inventory of one showtime and the user's seat selection.

use crate::error::{BookingError, Result};
use cinema_core::{BookingBackend, Seat, SeatNumber, SeatStatus, ShowtimeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Labels
// ============================================================================

/// Row letter(s) plus 1-based position within the row, e.g. `B7`
///
/// Rows run `A..=Z`, then `AA`, `AB`, ... so every seat number has exactly
/// one label for a given row width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatLabel {
    row: u32,
    position: u32,
}

impl SeatLabel {
    /// Label of `seat` for rows `seats_per_row` wide
    ///
    /// # Examples
    ///
    /// ```
    /// use cinema_booking::seat_map::SeatLabel;
    /// use cinema_core::SeatNumber;
    ///
    /// let seat = SeatNumber::new(17).unwrap();
    /// assert_eq!(SeatLabel::from_seat_number(seat, 10).to_string(), "B7");
    /// ```
    #[must_use]
    pub fn from_seat_number(seat: SeatNumber, seats_per_row: u32) -> Self {
        let width = seats_per_row.max(1);
        let index = seat.get() - 1;
        Self {
            row: index / width,
            position: index % width + 1,
        }
    }

    /// Inverse of [`SeatLabel::from_seat_number`]
    ///
    /// `None` if the position does not fit in a row of that width.
    #[must_use]
    pub fn seat_number(self, seats_per_row: u32) -> Option<SeatNumber> {
        if self.position == 0 || self.position > seats_per_row {
            return None;
        }
        self.row
            .checked_mul(seats_per_row)?
            .checked_add(self.position)
            .and_then(SeatNumber::new)
    }

    /// Zero-based row index
    #[must_use]
    pub const fn row_index(self) -> u32 {
        self.row
    }

    /// One-based position within the row
    #[must_use]
    pub const fn position(self) -> u32 {
        self.position
    }

    /// Row letters: `A`..`Z`, `AA`, `AB`, ...
    #[must_use]
    pub fn row_letters(self) -> String {
        let mut n = u64::from(self.row) + 1;
        let mut letters = Vec::new();
        while n > 0 {
            n -= 1;
            let offset = u8::try_from(n % 26).unwrap_or_default();
            letters.push(char::from(b'A' + offset));
            n /= 26;
        }
        letters.iter().rev().collect()
    }

    /// Parse a label such as `B7` or `AA3`
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for anything that is not
    /// uppercase letters followed by a positive number.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let split = input
            .find(|c: char| !c.is_ascii_uppercase())
            .unwrap_or(input.len());
        let (letters, digits) = input.split_at(split);

        let invalid = || BookingError::Validation(format!("invalid seat label '{input}'"));
        if letters.is_empty() || digits.is_empty() {
            return Err(invalid());
        }

        let mut row: u64 = 0;
        for byte in letters.bytes() {
            row = row
                .checked_mul(26)
                .and_then(|r| r.checked_add(u64::from(byte - b'A') + 1))
                .ok_or_else(invalid)?;
        }
        let row = u32::try_from(row - 1).map_err(|_| invalid())?;
        let position: u32 = digits.parse().map_err(|_| invalid())?;
        if position == 0 {
            return Err(invalid());
        }

        Ok(Self { row, position })
    }

    /// Human-readable form, e.g. `Row B, Seat 7`
    #[must_use]
    pub fn describe(self) -> String {
        format!("Row {}, Seat {}", self.row_letters(), self.position)
    }
}

impl fmt::Display for SeatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letters(), self.position)
    }
}

impl FromStr for SeatLabel {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ============================================================================
// Seat map
// ============================================================================

/// Seat inventory of a showtime, sorted by seat number
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeatMap {
    showtime_id: ShowtimeId,
    seats_per_row: u32,
    seats: Vec<Seat>,
}

impl SeatMap {
    /// Build a map from already fetched seats
    #[must_use]
    pub fn new(showtime_id: ShowtimeId, seats_per_row: u32, mut seats: Vec<Seat>) -> Self {
        seats.sort_by_key(|seat| seat.seat_number);
        Self {
            showtime_id,
            seats_per_row: seats_per_row.max(1),
            seats,
        }
    }

    /// Fetch the inventory of a showtime
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] if the showtime has no seats, or the
    /// backend error if the fetch fails.
    #[tracing::instrument(skip(backend))]
    pub async fn load(
        backend: &dyn BookingBackend,
        showtime_id: ShowtimeId,
        seats_per_row: u32,
    ) -> Result<Self> {
        let seats = backend.fetch_seats(showtime_id).await?;
        if seats.is_empty() {
            tracing::warn!(%showtime_id, "Showtime has no seat records");
            return Err(BookingError::NotFound(format!("seats for showtime {showtime_id}")));
        }

        let map = Self::new(showtime_id, seats_per_row, seats);
        tracing::debug!(
            %showtime_id,
            total = map.total_seats(),
            taken = map.taken_seats(),
            "Loaded seat map"
        );
        Ok(map)
    }

    /// Showtime this inventory belongs to
    #[must_use]
    pub const fn showtime_id(&self) -> ShowtimeId {
        self.showtime_id
    }

    /// Row width used for labels
    #[must_use]
    pub const fn seats_per_row(&self) -> u32 {
        self.seats_per_row
    }

    /// Seats in seat-number order
    #[must_use]
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Number of seats in the auditorium
    #[must_use]
    pub fn total_seats(&self) -> u32 {
        u32::try_from(self.seats.len()).unwrap_or(u32::MAX)
    }

    /// Number of seats that are reserved or booked
    #[must_use]
    pub fn taken_seats(&self) -> u32 {
        let taken = self.seats.iter().filter(|s| !s.status.is_available()).count();
        u32::try_from(taken).unwrap_or(u32::MAX)
    }

    /// Status of a seat, `None` if the showtime has no such seat
    #[must_use]
    pub fn status_of(&self, seat: SeatNumber) -> Option<SeatStatus> {
        self.seats
            .binary_search_by_key(&seat, |s| s.seat_number)
            .ok()
            .map(|index| self.seats[index].status)
    }

    /// Whether the seat exists and can be selected
    #[must_use]
    pub fn is_available(&self, seat: SeatNumber) -> bool {
        self.status_of(seat).is_some_and(SeatStatus::is_available)
    }

    /// Display label of a seat
    #[must_use]
    pub fn label(&self, seat: SeatNumber) -> SeatLabel {
        SeatLabel::from_seat_number(seat, self.seats_per_row)
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Outcome of [`SelectionSet::toggle`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    /// The seat joined the selection
    Added,
    /// The seat left the selection
    Removed,
    /// The seat is unknown or not available; nothing changed
    Unavailable,
}

/// Seats picked for one showtime, in the order they were picked
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSet {
    seats: Vec<SeatNumber>,
}

impl SelectionSet {
    /// Empty selection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select or deselect a seat
    ///
    /// # Errors
    ///
    /// [`BookingError::QuotaExceeded`] if adding the seat would exceed
    /// `max_allowed`. The selection is left unchanged.
    pub fn toggle(&mut self, seat: SeatNumber, map: &SeatMap, max_allowed: u32) -> Result<Toggle> {
        if !map.is_available(seat) {
            return Ok(Toggle::Unavailable);
        }

        if let Some(index) = self.seats.iter().position(|s| *s == seat) {
            self.seats.remove(index);
            return Ok(Toggle::Removed);
        }

        if self.len() >= max_allowed {
            return Err(BookingError::QuotaExceeded { max_allowed });
        }

        self.seats.push(seat);
        Ok(Toggle::Added)
    }

    /// Re-check the selection against a freshly loaded map
    ///
    /// # Errors
    ///
    /// [`BookingError::Validation`] if a selected seat is no longer
    /// available, [`BookingError::QuotaExceeded`] if the quota shrank below
    /// the selection size.
    pub fn validate(&self, map: &SeatMap, max_allowed: u32) -> Result<()> {
        if let Some(seat) = self.seats.iter().find(|seat| !map.is_available(**seat)) {
            return Err(BookingError::Validation(format!(
                "seat {} is no longer available",
                map.label(*seat)
            )));
        }
        if self.len() > max_allowed {
            return Err(BookingError::QuotaExceeded { max_allowed });
        }
        Ok(())
    }

    /// Whether a seat is selected
    #[must_use]
    pub fn contains(&self, seat: SeatNumber) -> bool {
        self.seats.contains(&seat)
    }

    /// Number of selected seats
    #[must_use]
    pub fn len(&self) -> u32 {
        u32::try_from(self.seats.len()).unwrap_or(u32::MAX)
    }

    /// Whether nothing is selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Selected seats in selection order
    #[must_use]
    pub fn seats(&self) -> &[SeatNumber] {
        &self.seats
    }

    /// Drop every selected seat
    pub fn clear(&mut self) {
        self.seats.clear();
    }
}
