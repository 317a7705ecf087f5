//! Outbound collaborator contracts
//!
//! The engine reaches the outside world only through these two traits. Each
//! provider is a concrete adapter; see [`crate::adapters`] for the built-in
//! ones.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dispatchx_core::errors::ExError;
use dispatchx_core::model::CalendarSlot;
use mockall::automock;

/// One outbound email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// The dispatch idempotency key, repeated in subject and body
    pub correlation_id: String,
}

/// Constraints for a calendar slot search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRequest {
    pub asset_category: String,
    /// No slot may start before this instant
    pub earliest: DateTime<Utc>,
    /// No slot may end after this instant
    pub latest: DateTime<Utc>,
    pub duration: Duration,
}

#[automock]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send `email`, returning the provider's message id.
    ///
    /// Failures are `ERR_TRANSPORT`.
    async fn send(&self, email: OutboundEmail) -> Result<String, ExError>;
}

#[automock]
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Next open slot satisfying `request`, or `None` when the calendar is full.
    ///
    /// An `Err` means the calendar could not be consulted at all.
    async fn find_slot(&self, request: SlotRequest) -> Result<Option<CalendarSlot>, ExError>;

    /// Book `slot`. Booking twice with the same key returns the first booking id.
    async fn book(&self, slot: CalendarSlot, idempotency_key: String) -> Result<String, ExError>;
}
