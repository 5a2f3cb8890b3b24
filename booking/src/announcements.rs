//! Sign-in announcements: upcoming releases and the membership fee notice.

use crate::error::Result;
use crate::outbox::{NotificationOutbox, OutboxTask};
use cinema_core::{BookingBackend, Clock, Movie, UserId};
use std::collections::HashSet;
use std::sync::Arc;

/// Notice sent once to every registered user
pub const MEMBERSHIP_FEE_MESSAGE: &str = "Membership fee automatically withdrawn";

/// Announcement text for an unreleased movie
#[must_use]
pub fn release_message(movie: &Movie) -> Option<String> {
    let date = movie.release_date.as_deref()?.trim();
    Some(format!("{} is coming out on {date}", movie.title))
}

/// Queues announcements a user has not received yet
#[derive(Clone)]
pub struct ReleaseAnnouncer {
    backend: Arc<dyn BookingBackend>,
    outbox: NotificationOutbox,
    clock: Arc<dyn Clock>,
}

impl ReleaseAnnouncer {
    /// Create an announcer
    #[must_use]
    pub fn new(backend: Arc<dyn BookingBackend>, outbox: NotificationOutbox, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            outbox,
            clock,
        }
    }

    /// Queue every release announcement and the membership notice missing
    /// from the user's history
    ///
    /// Returns the number of messages queued. Messages already in the
    /// history or already waiting in the outbox are skipped.
    ///
    /// # Errors
    ///
    /// Propagates failures to read the profile or the catalogue. Delivery
    /// failures are only logged.
    #[tracing::instrument(skip(self))]
    pub async fn announce(&self, user_id: UserId) -> Result<usize> {
        let (profile, movies) = futures::try_join!(
            self.backend.fetch_user(user_id),
            self.backend.fetch_movies()
        )?;

        let pending: Vec<String> = self
            .outbox
            .pending()
            .await
            .into_iter()
            .filter(|task| task.user_id() == user_id)
            .map(|OutboxTask::Notify { message, .. }| message)
            .collect();

        let now = self.clock.now();
        let mut messages: Vec<String> = movies
            .iter()
            .filter(|movie| movie.is_unreleased_at(now))
            .filter_map(release_message)
            .collect();
        messages.push(MEMBERSHIP_FEE_MESSAGE.to_string());

        let mut known: HashSet<&str> = profile
            .notification_history
            .iter()
            .map(|entry| entry.message.as_str())
            .chain(pending.iter().map(String::as_str))
            .collect();

        let mut queued = 0;
        for message in &messages {
            if known.insert(message.as_str()) {
                self.outbox.notify(user_id, message.clone()).await;
                queued += 1;
            }
        }

        tracing::info!(queued, "Queued sign-in announcements");
        Ok(queued)
    }
}
