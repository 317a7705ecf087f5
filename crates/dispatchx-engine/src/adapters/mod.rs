//! Built-in collaborator adapters
//!
//! - [`InMemoryCalendar`]: a business-hours slot grid with idempotent booking
//! - [`OutboxEmailSender`]: appends every email to the store's outbox table

pub mod calendar;
pub mod outbox_email;

pub use calendar::InMemoryCalendar;
pub use outbox_email::OutboxEmailSender;
