//! # Cinema Core
//!
//! Domain types and dependency traits for the cinema booking orchestrator.
//!
//! The storefront's seat inventory, ticket and payment ledgers live in an
//! external service. This crate defines:
//!
//! - **Types**: identifiers, [`Money`](types::Money) in cents, seats,
//!   showtimes, tickets, payments and user profiles, decoded straight from
//!   the backend's JSON
//! - **Backend**: the [`BookingBackend`](backend::BookingBackend) contract
//! - **Notifications**: the [`NotificationClient`](notification::NotificationClient) contract
//! - **Environment**: the injected [`Clock`](environment::Clock)
//!
//! ## Architecture Principles
//!
//! - All I/O behind traits, injected as `Arc<dyn Trait>`
//! - Money as integer cents, converted to dollars only at the wire boundary
//! - Timestamps as `DateTime<Utc>` end to end

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod environment;
pub mod notification;
pub mod types;

pub use backend::{BackendError, BackendFuture, BookingBackend};
pub use environment::{Clock, SystemClock};
pub use notification::{Notification, NotificationClient};
pub use types::*;
