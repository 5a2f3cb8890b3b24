//! Who is buying.

use cinema_core::UserId;
use std::fmt;

/// Identity of the current purchaser
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Session {
    /// Signed-in user; payer email, saved cards and points come from the profile
    Registered(UserId),
    /// Anonymous purchaser; supplies an email at checkout
    Guest,
}

impl Session {
    /// The signed-in user, if any
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Registered(user_id) => Some(*user_id),
            Self::Guest => None,
        }
    }

    /// Whether nobody is signed in
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }
}

impl From<Option<UserId>> for Session {
    fn from(user_id: Option<UserId>) -> Self {
        user_id.map_or(Self::Guest, Self::Registered)
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered(user_id) => write!(f, "user {user_id}"),
            Self::Guest => write!(f, "guest"),
        }
    }
}
