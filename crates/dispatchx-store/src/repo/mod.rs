//! Repository layer for the Context Store
//!
//! Each repository is a stateless namespace of functions over a borrowed
//! connection, so callers decide the transaction scope.

pub mod context_repo;
pub mod outbox_repo;
pub mod record_repo;

pub use context_repo::ContextRepo;
pub use outbox_repo::{OutboxEntry, OutboxRepo, OutboxStatus};
pub use record_repo::{ClaimOutcome, RecordRepo, RecordUpdate};

use crate::errors::{corrupt_column, Result};
use chrono::{DateTime, Utc};

pub(crate) fn to_millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

pub(crate) fn from_millis(column: &str, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| corrupt_column(column, &millis.to_string()))
}

pub(crate) fn from_millis_opt(column: &str, millis: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    millis.map(|m| from_millis(column, m)).transpose()
}
