//! Notification outbox.
//!
//! Bookings and refunds do not publish notifications inline. They hand an
//! [`OutboxTask`] to [`NotificationOutbox::notify`] and move on; the outbox
//! attempts it on a background task, and anything that fails stays queued
//! for [`NotificationOutbox::flush`] or the dispatcher. A failed delivery is
//! logged and kept or dropped, but never fails or delays the operation that
//! queued it.

use crate::retry::{retry_if, RetryPolicy};
use cinema_core::{BackendError, Notification, NotificationClient, UserId};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};

/// A side effect waiting to be delivered
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboxTask {
    /// Publish `message` to `user_id`
    Notify {
        /// Recipient
        user_id: UserId,
        /// Notification text
        message: String,
    },
}

impl OutboxTask {
    /// Recipient of the task
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::Notify { user_id, .. } => *user_id,
        }
    }
}

/// Result of one delivery pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Tasks delivered and removed from the queue
    pub delivered: usize,
    /// Tasks that failed and were put back
    pub requeued: usize,
    /// Tasks that failed permanently and were discarded
    pub dropped: usize,
}

/// Queue of pending notifications in front of a [`NotificationClient`]
///
/// Cloning is cheap; clones share one queue.
#[derive(Clone)]
pub struct NotificationOutbox {
    client: Arc<dyn NotificationClient>,
    queue: Arc<Mutex<VecDeque<OutboxTask>>>,
    in_flight: Arc<Mutex<JoinSet<()>>>,
}

impl std::fmt::Debug for NotificationOutbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationOutbox").finish_non_exhaustive()
    }
}

impl NotificationOutbox {
    /// Create an empty outbox delivering through `client`
    #[must_use]
    pub fn new(client: Arc<dyn NotificationClient>) -> Self {
        Self {
            client,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Queue a notification for later delivery
    pub async fn enqueue(&self, user_id: UserId, message: impl Into<String>) {
        let task = OutboxTask::Notify {
            user_id,
            message: message.into(),
        };
        tracing::debug!(%user_id, "Queued notification");
        self.queue.lock().await.push_back(task);
    }

    /// Queue a notification and attempt it in the background
    ///
    /// Returns as soon as the task is queued. The attempt delivers only this
    /// task; on failure it goes back to the queue for the next flush or
    /// dispatcher pass.
    pub async fn notify(&self, user_id: UserId, message: impl Into<String>) {
        let task = OutboxTask::Notify {
            user_id,
            message: message.into(),
        };
        self.queue.lock().await.push_back(task.clone());

        let outbox = self.clone();
        let mut in_flight = self.in_flight.lock().await;
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(async move { outbox.deliver_queued(task).await });
    }

    /// Wait for every background attempt started by [`NotificationOutbox::notify`]
    pub async fn settle(&self) {
        let mut in_flight = self.in_flight.lock().await;
        while in_flight.join_next().await.is_some() {}
    }

    /// Snapshot of the tasks still waiting, oldest first
    pub async fn pending(&self) -> Vec<OutboxTask> {
        self.queue.lock().await.iter().cloned().collect()
    }

    /// Try every queued task once
    ///
    /// Failed tasks go back to the front of the queue in their original
    /// order so the next pass retries them first.
    pub async fn flush(&self) -> FlushReport {
        let tasks: Vec<OutboxTask> = self.queue.lock().await.drain(..).collect();
        let mut report = FlushReport::default();
        let mut failed = Vec::new();

        for task in tasks {
            match self.deliver(&task).await {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    tracing::warn!(user_id = %task.user_id(), error = %err, "Notification delivery failed, keeping it queued");
                    failed.push(task);
                }
            }
        }

        report.requeued = failed.len();
        if !failed.is_empty() {
            let mut queue = self.queue.lock().await;
            for task in failed.into_iter().rev() {
                queue.push_front(task);
            }
        }
        report
    }

    /// Deliver every queued task, retrying each with backoff
    ///
    /// Tasks that still fail after the policy is exhausted, or that the
    /// service rejects outright, are dropped and logged.
    pub async fn drain_with_retry(&self, policy: &RetryPolicy) -> FlushReport {
        let tasks: Vec<OutboxTask> = self.queue.lock().await.drain(..).collect();
        let mut report = FlushReport::default();

        for task in tasks {
            match retry_if(policy, || self.deliver(&task), is_transient).await {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    tracing::error!(user_id = %task.user_id(), error = %err, "Dropping undeliverable notification");
                    report.dropped += 1;
                }
            }
        }
        report
    }

    /// Drain the outbox every `interval` until the handle is aborted
    #[must_use]
    pub fn spawn_dispatcher(&self, interval: Duration, policy: RetryPolicy) -> JoinHandle<()> {
        let outbox = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = outbox.drain_with_retry(&policy).await;
                if report.delivered > 0 || report.dropped > 0 {
                    tracing::info!(
                        delivered = report.delivered,
                        dropped = report.dropped,
                        "Outbox dispatcher pass"
                    );
                }
            }
        })
    }

    /// A user's `limit` most recent notifications, newest first
    ///
    /// # Errors
    ///
    /// Returns the client error if the history cannot be read.
    pub async fn recent(&self, user_id: UserId, limit: usize) -> Result<Vec<Notification>, BackendError> {
        let history = self.client.list(user_id).await?;
        Ok(history.into_iter().rev().take(limit).collect())
    }

    /// Take `task` off the queue and deliver it, unless a flush got to it first
    async fn deliver_queued(&self, task: OutboxTask) {
        {
            let mut queue = self.queue.lock().await;
            let Some(index) = queue.iter().position(|queued| *queued == task) else {
                return;
            };
            queue.remove(index);
        }

        if let Err(err) = self.deliver(&task).await {
            tracing::warn!(user_id = %task.user_id(), error = %err, "Notification delivery failed, keeping it queued");
            self.queue.lock().await.push_back(task);
        }
    }

    async fn deliver(&self, task: &OutboxTask) -> Result<(), BackendError> {
        match task {
            OutboxTask::Notify { user_id, message } => {
                self.client.publish(*user_id, message.clone()).await
            }
        }
    }
}

/// Whether retrying a failed publish could help
fn is_transient(err: &BackendError) -> bool {
    match err {
        BackendError::Transport(_) => true,
        BackendError::Rejected { status, .. } => *status >= 500 || *status == 429,
        BackendError::NotFound { .. } | BackendError::Decode(_) => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cinema_testing::RecordingNotifier;

    fn outbox_with(notifier: &RecordingNotifier) -> NotificationOutbox {
        NotificationOutbox::new(Arc::new(notifier.clone()))
    }

    #[tokio::test]
    async fn test_flush_delivers_in_order() {
        let notifier = RecordingNotifier::new();
        let outbox = outbox_with(&notifier);

        outbox.enqueue(UserId::new(1), "first").await;
        outbox.enqueue(UserId::new(2), "second").await;
        let report = outbox.flush().await;

        assert_eq!(report.delivered, 2);
        assert!(outbox.pending().await.is_empty());
        assert_eq!(
            notifier.delivered(),
            vec![
                (UserId::new(1), "first".to_string()),
                (UserId::new(2), "second".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_flush_keeps_failures_queued() {
        let notifier = RecordingNotifier::failing_first(1);
        let outbox = outbox_with(&notifier);

        outbox.enqueue(UserId::new(1), "first").await;
        outbox.enqueue(UserId::new(1), "second").await;
        let report = outbox.flush().await;

        assert_eq!(report, FlushReport { delivered: 1, requeued: 1, dropped: 0 });
        let pending = outbox.pending().await;
        assert_eq!(
            pending,
            vec![OutboxTask::Notify {
                user_id: UserId::new(1),
                message: "first".to_string()
            }]
        );

        assert_eq!(outbox.flush().await.delivered, 1);
        assert!(outbox.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_notify_delivers_only_its_own_task() {
        let notifier = RecordingNotifier::failing_first(1);
        let outbox = outbox_with(&notifier);
        outbox.enqueue(UserId::new(2), "backlog").await;

        outbox.notify(UserId::new(1), "first").await;
        outbox.settle().await;
        outbox.notify(UserId::new(1), "second").await;
        outbox.settle().await;

        assert_eq!(notifier.attempts(), 2);
        assert_eq!(notifier.delivered(), vec![(UserId::new(1), "second".to_string())]);
        let pending: Vec<UserId> = outbox.pending().await.iter().map(OutboxTask::user_id).collect();
        assert_eq!(pending, [UserId::new(2), UserId::new(1)]);
    }

    #[tokio::test]
    async fn test_notify_after_flush_does_not_deliver_twice() {
        let notifier = RecordingNotifier::new();
        let outbox = outbox_with(&notifier);

        outbox.notify(UserId::new(3), "once").await;
        outbox.flush().await;
        outbox.settle().await;

        assert_eq!(notifier.delivered().len(), 1);
        assert!(outbox.pending().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_retries_transient_failures() {
        let notifier = RecordingNotifier::failing_first(2);
        let outbox = outbox_with(&notifier);

        outbox.enqueue(UserId::new(1), "hello").await;
        let report = outbox.drain_with_retry(&RetryPolicy::default()).await;

        assert_eq!(report.delivered, 1);
        assert_eq!(notifier.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_drops_after_exhaustion() {
        let notifier = RecordingNotifier::failing_first(10);
        let outbox = outbox_with(&notifier);

        outbox.enqueue(UserId::new(1), "hello").await;
        let policy = RetryPolicy::builder().max_retries(2).build();
        let report = outbox.drain_with_retry(&policy).await;

        assert_eq!(report.dropped, 1);
        assert_eq!(notifier.attempts(), 3);
        assert!(outbox.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let notifier = RecordingNotifier::new();
        let outbox = outbox_with(&notifier);
        for message in ["a", "b", "c"] {
            outbox.enqueue(UserId::new(4), message).await;
        }
        outbox.flush().await;

        let recent = outbox.recent(UserId::new(4), 2).await.unwrap();

        let messages: Vec<_> = recent.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, ["c", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatcher_drains_in_background() {
        let notifier = RecordingNotifier::new();
        let outbox = outbox_with(&notifier);
        let handle = outbox.spawn_dispatcher(Duration::from_secs(30), RetryPolicy::no_retry());

        outbox.enqueue(UserId::new(9), "later").await;
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(notifier.delivered().len(), 1);
        handle.abort();
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&BackendError::Transport("reset".to_string())));
        assert!(is_transient(&BackendError::Rejected { status: 503, message: String::new() }));
        assert!(!is_transient(&BackendError::Rejected { status: 400, message: String::new() }));
        assert!(!is_transient(&BackendError::not_found("user 1")));
    }
}
