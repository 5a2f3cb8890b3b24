//! Notification delivery contract.
//!
//! Notifications are side effects of bookings and refunds. Callers publish
//! and move on; a failed publish must never fail the operation it belongs
//! to, which is why the orchestrator routes them through an outbox.

use crate::backend::BackendFuture;
use crate::types::UserId;
use serde::{Deserialize, Serialize};

/// A delivered notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Position in the user's history
    pub id: u64,
    /// Notification text
    pub message: String,
}

/// Notification client trait
pub trait NotificationClient: Send + Sync {
    /// Publish a message to a user
    fn publish(&self, user_id: UserId, message: String) -> BackendFuture<'_, ()>;

    /// A user's notifications in insertion order
    fn list(&self, user_id: UserId) -> BackendFuture<'_, Vec<Notification>>;
}
