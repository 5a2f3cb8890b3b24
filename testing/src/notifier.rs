//! Notification client that records what it was asked to deliver.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use cinema_core::backend::{BackendError, BackendFuture};
use cinema_core::notification::{Notification, NotificationClient};
use cinema_core::types::UserId;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct Recorded {
    delivered: Vec<(UserId, String)>,
    failures_left: usize,
    attempts: usize,
}

/// Captures published notifications, optionally failing the first few
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    inner: Arc<RwLock<Recorded>>,
}

impl RecordingNotifier {
    /// Create a notifier that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notifier whose first `n` publishes fail
    #[must_use]
    pub fn failing_first(n: usize) -> Self {
        let notifier = Self::new();
        notifier.inner.write().unwrap().failures_left = n;
        notifier
    }

    /// Everything delivered so far, in order
    #[must_use]
    pub fn delivered(&self) -> Vec<(UserId, String)> {
        self.inner.read().unwrap().delivered.clone()
    }

    /// Number of publish attempts, successful or not
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.inner.read().unwrap().attempts
    }
}

impl NotificationClient for RecordingNotifier {
    fn publish(&self, user_id: UserId, message: String) -> BackendFuture<'_, ()> {
        let result = {
            let mut inner = self.inner.write().unwrap();
            inner.attempts += 1;
            if inner.failures_left > 0 {
                inner.failures_left -= 1;
                Err(BackendError::Transport("notification service unreachable".to_string()))
            } else {
                inner.delivered.push((user_id, message));
                Ok(())
            }
        };
        Box::pin(async move { result })
    }

    fn list(&self, user_id: UserId) -> BackendFuture<'_, Vec<Notification>> {
        let listed = self
            .inner
            .read()
            .unwrap()
            .delivered
            .iter()
            .filter(|(recipient, _)| *recipient == user_id)
            .zip(0..)
            .map(|((_, message), id)| Notification {
                id,
                message: message.clone(),
            })
            .collect();
        Box::pin(async move { Ok(listed) })
    }
}
