//! Configuration management for the booking orchestrator.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::retry::RetryPolicy;
use crate::quota::QuotaPolicy;
use cinema_core::Money;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Invalid configuration values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A percentage setting above 100
    #[error("{name} must be between 0 and 100, got {value}")]
    PercentOutOfRange {
        /// Setting name
        name: &'static str,
        /// Configured value
        value: u32,
    },

    /// A setting that must be positive is zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// The backend URL is unusable
    #[error("invalid backend URL '{0}'")]
    InvalidUrl(String),
}

/// Booking configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Backend service connection
    pub backend: BackendConfig,
    /// Ticket pricing
    pub pricing: PricingConfig,
    /// Seat quota and refund rules
    pub policy: PolicyConfig,
    /// Notification outbox
    pub outbox: OutboxConfig,
}

/// Backend service connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the REST backend
    pub url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Ticket pricing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Flat price of one ticket, in cents
    pub ticket_price_cents: u64,
    /// Tax rate, in percent
    pub tax_percent: u32,
}

/// Seat quota and refund rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Seats per row, used for seat labels
    pub seats_per_row: u32,
    /// Share of seats open before a movie's release, in percent
    pub early_access_percent: u32,
    /// Minimum notice for a refund, in hours
    pub refund_window_hours: u32,
    /// Admin fee kept on guest refunds, in percent
    pub guest_admin_fee_percent: u32,
}

/// Notification outbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Retries per notification before it is dropped
    pub max_retries: usize,
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Background flush interval, in seconds
    pub flush_interval_secs: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl BookingConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults; call
    /// [`BookingConfig::validate`] before using the result.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
            default: T,
        ) -> T {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        }

        Self {
            backend: BackendConfig {
                url: lookup("BACKEND_URL")
                    .unwrap_or_else(|| "http://localhost:8080".to_string()),
                timeout_secs: parsed(&lookup, "BACKEND_TIMEOUT_SECS", 30),
            },
            pricing: PricingConfig {
                ticket_price_cents: parsed(&lookup, "TICKET_PRICE_CENTS", 1910),
                tax_percent: parsed(&lookup, "TAX_PERCENT", 5),
            },
            policy: PolicyConfig {
                seats_per_row: parsed(&lookup, "SEATS_PER_ROW", 10),
                early_access_percent: parsed(&lookup, "EARLY_ACCESS_PERCENT", 10),
                refund_window_hours: parsed(&lookup, "REFUND_WINDOW_HOURS", 72),
                guest_admin_fee_percent: parsed(&lookup, "GUEST_ADMIN_FEE_PERCENT", 15),
            },
            outbox: OutboxConfig {
                max_retries: parsed(&lookup, "OUTBOX_MAX_RETRIES", 3),
                initial_delay_ms: parsed(&lookup, "OUTBOX_INITIAL_DELAY_MS", 100),
                flush_interval_secs: parsed(&lookup, "OUTBOX_FLUSH_INTERVAL_SECS", 30),
            },
        }
    }

    /// Reject values the orchestrator cannot work with
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.backend.url.clone()));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Zero("BACKEND_TIMEOUT_SECS"));
        }
        if self.policy.seats_per_row == 0 {
            return Err(ConfigError::Zero("SEATS_PER_ROW"));
        }
        if self.outbox.flush_interval_secs == 0 {
            return Err(ConfigError::Zero("OUTBOX_FLUSH_INTERVAL_SECS"));
        }

        for (name, value) in [
            ("TAX_PERCENT", self.pricing.tax_percent),
            ("EARLY_ACCESS_PERCENT", self.policy.early_access_percent),
            ("GUEST_ADMIN_FEE_PERCENT", self.policy.guest_admin_fee_percent),
        ] {
            if value > 100 {
                return Err(ConfigError::PercentOutOfRange { name, value });
            }
        }
        Ok(())
    }

    /// Flat ticket price
    #[must_use]
    pub const fn ticket_price(&self) -> Money {
        Money::from_cents(self.pricing.ticket_price_cents)
    }

    /// Per-request backend timeout
    #[must_use]
    pub const fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    /// Seat quota policy
    #[must_use]
    pub const fn quota_policy(&self) -> QuotaPolicy {
        QuotaPolicy::new(self.policy.early_access_percent)
    }

    /// Retry policy for draining the notification outbox
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.outbox.max_retries)
            .initial_delay(Duration::from_millis(self.outbox.initial_delay_ms))
            .build()
    }

    /// Interval of the background outbox dispatcher
    #[must_use]
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.outbox.flush_interval_secs)
    }
}
