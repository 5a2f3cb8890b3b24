//! REST implementation of the backend and notification contracts.

use crate::config::BookingConfig;
use cinema_core::backend::{
    CancellationConfirmation, PaymentConfirmation, PaymentRequest, TicketConfirmation, TicketRequest,
};
use cinema_core::{
    BackendError, BackendFuture, BookingBackend, Movie, MovieId, Notification, NotificationClient,
    Payment, PaymentId, Seat, Showtime, ShowtimeId, Ticket, TicketId, UserId, UserProfile,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Storefront backend reached over HTTP
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreditUpdate {
    credit_points: u64,
}

#[derive(Serialize)]
struct PublishNotification<'a> {
    #[serde(rename = "userID")]
    user_id: UserId,
    message: &'a str,
}

impl HttpBackend {
    /// Create a client for `base_url` with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the backend section of the configuration
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &BookingConfig) -> Result<Self, BackendError> {
        Self::new(config.backend.url.clone(), config.backend_timeout())
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, path: String, resource: String) -> Result<T, BackendError> {
        fetch_json(self.client.get(self.url(&path)), resource).await
    }
}

/// Send a request and decode its JSON body
async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder, resource: String) -> Result<T, BackendError> {
    let response = send(request, &resource).await?;
    response.json::<T>().await.map_err(|e| {
        tracing::warn!(%resource, error = %e, "Undecodable backend response");
        BackendError::Decode(e.to_string())
    })
}

/// Send a request and map non-success statuses
async fn send(request: RequestBuilder, resource: &str) -> Result<reqwest::Response, BackendError> {
    let response = request.send().await.map_err(|e| {
        tracing::warn!(%resource, error = %e, "Backend request failed");
        BackendError::Transport(e.to_string())
    })?;

    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(BackendError::not_found(resource)),
        status => {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(%resource, status = status.as_u16(), %message, "Backend rejected request");
            Err(BackendError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl BookingBackend for HttpBackend {
    fn fetch_seats(&self, showtime_id: ShowtimeId) -> BackendFuture<'_, Vec<Seat>> {
        Box::pin(self.get(
            format!("/showtimes/{showtime_id}/seats"),
            format!("seats of showtime {showtime_id}"),
        ))
    }

    fn fetch_showtime(&self, showtime_id: ShowtimeId) -> BackendFuture<'_, Showtime> {
        Box::pin(self.get(format!("/showtimes/{showtime_id}"), format!("showtime {showtime_id}")))
    }

    fn fetch_movies(&self) -> BackendFuture<'_, Vec<Movie>> {
        Box::pin(self.get("/movies/".to_string(), "movie catalogue".to_string()))
    }

    fn fetch_movie(&self, movie_id: MovieId) -> BackendFuture<'_, Movie> {
        Box::pin(self.get(format!("/movies/{movie_id}"), format!("movie {movie_id}")))
    }

    fn fetch_user(&self, user_id: UserId) -> BackendFuture<'_, UserProfile> {
        Box::pin(self.get(format!("/users/{user_id}"), format!("user {user_id}")))
    }

    fn update_credit_points(&self, user_id: UserId, credit_points: u64) -> BackendFuture<'_, ()> {
        let request = self
            .client
            .put(self.url(&format!("/users/{user_id}/credits")))
            .json(&CreditUpdate { credit_points });
        Box::pin(async move {
            send(request, &format!("user {user_id}")).await?;
            Ok(())
        })
    }

    fn submit_payment(&self, request: PaymentRequest) -> BackendFuture<'_, PaymentConfirmation> {
        let builder = self.client.post(self.url("/payments/")).json(&request);
        Box::pin(fetch_json(builder, "payment".to_string()))
    }

    fn fetch_payment(&self, payment_id: PaymentId) -> BackendFuture<'_, Payment> {
        Box::pin(self.get(format!("/payments/{payment_id}"), format!("payment {payment_id}")))
    }

    fn create_ticket(&self, request: TicketRequest) -> BackendFuture<'_, TicketConfirmation> {
        let resource = format!("seat {} of showtime {}", request.seat_number, request.showtime_id);
        let builder = self.client.post(self.url("/tickets/")).json(&request);
        Box::pin(fetch_json(builder, resource))
    }

    fn fetch_ticket(&self, ticket_id: TicketId) -> BackendFuture<'_, Ticket> {
        Box::pin(self.get(format!("/tickets/{ticket_id}"), format!("ticket {ticket_id}")))
    }

    fn cancel_ticket(&self, ticket_id: TicketId) -> BackendFuture<'_, CancellationConfirmation> {
        let builder = self.client.delete(self.url(&format!("/tickets/{ticket_id}")));
        Box::pin(fetch_json(builder, format!("ticket {ticket_id}")))
    }
}

impl NotificationClient for HttpBackend {
    fn publish(&self, user_id: UserId, message: String) -> BackendFuture<'_, ()> {
        let builder = self.client.post(self.url("/notifications/")).json(&PublishNotification {
            user_id,
            message: &message,
        });
        Box::pin(async move {
            send(builder, &format!("notifications of user {user_id}")).await?;
            Ok(())
        })
    }

    fn list(&self, user_id: UserId) -> BackendFuture<'_, Vec<Notification>> {
        Box::pin(async move {
            let profile: UserProfile = self.get(format!("/users/{user_id}"), format!("user {user_id}")).await?;
            Ok(profile
                .notification_history
                .into_iter()
                .zip(0..)
                .map(|(entry, id)| Notification {
                    id,
                    message: entry.message,
                })
                .collect())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let backend = HttpBackend::new("http://localhost:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8080");
        assert_eq!(backend.url("/movies/"), "http://localhost:8080/movies/");
    }

    #[test]
    fn test_publish_body_shape() {
        let body = serde_json::to_value(PublishNotification {
            user_id: UserId::new(7),
            message: "hi",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"userID": 7, "message": "hi"}));
    }
}
