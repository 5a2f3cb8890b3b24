//! Ready-made domain records for tests and demos.

use chrono::{DateTime, Utc};
use cinema_core::{
    Movie, MovieId, SavedPaymentMethod, PaymentType, Showtime, ShowtimeId, Theatre, TheatreId,
    UserId, UserProfile,
};

/// Movie with the given release date (`YYYY-MM-DD`), or already released
#[must_use]
pub fn movie(id: u64, title: &str, release_date: Option<&str>) -> Movie {
    Movie {
        movie_id: MovieId::new(id),
        title: title.to_string(),
        release_date: release_date.map(str::to_string),
    }
}

/// Theatre without a location
#[must_use]
pub fn theatre(id: u64, name: &str) -> Theatre {
    Theatre {
        theatre_id: TheatreId::new(id),
        name: name.to_string(),
        location: None,
    }
}

/// Showtime of movie 1 at theatre 1
#[must_use]
pub fn showtime(id: u64, starts_at: DateTime<Utc>) -> Showtime {
    Showtime {
        showtime_id: ShowtimeId::new(id),
        movie_id: MovieId::new(1),
        theatre_id: TheatreId::new(1),
        starts_at,
    }
}

/// Registered user with an email, a point balance and one saved debit card
#[must_use]
pub fn registered_user(id: u64, email: &str, credit_points: u64) -> UserProfile {
    UserProfile {
        user_id: UserId::new(id),
        name: "John Smith".to_string(),
        email: Some(email.to_string()),
        credit_points,
        payment_methods: vec![SavedPaymentMethod {
            id: 1,
            payment_type: PaymentType::Debit,
            owner: "John Smith".to_string(),
            number: "****8123".to_string(),
            expiry_date: "12/27".to_string(),
        }],
        notification_history: Vec::new(),
    }
}
