//! Email outbox
//!
//! One row per correlation id. Enqueueing a message whose correlation id is
//! already present returns the original message id instead of a second row.

#![allow(clippy::result_large_err)]

use crate::errors::{corrupt_column, from_rusqlite, Result};
use crate::repo::{from_millis, to_millis};
use chrono::{DateTime, Utc};
use dispatchx_core::errors::{ExError, ExErrorKind};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboxEntry {
    pub message_id: String,
    pub correlation_id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: OutboxStatus,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Sent,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Sent => "sent",
            OutboxStatus::Failed => "failed",
        }
    }
}

pub struct OutboxRepo;

impl OutboxRepo {
    /// Append `entry`, returning the message id that holds its correlation id
    ///
    /// # Errors
    ///
    /// - `Transport` if the correlation id is held by a failed send
    pub fn enqueue(conn: &Connection, entry: &OutboxEntry) -> Result<String> {
        conn.execute(
            "INSERT INTO email_outbox (message_id, correlation_id, recipient, subject, body, status, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(correlation_id) DO NOTHING",
            rusqlite::params![
                entry.message_id,
                entry.correlation_id,
                entry.recipient,
                entry.subject,
                entry.body,
                entry.status.as_str(),
                to_millis(entry.sent_at),
            ],
        )
        .map_err(from_rusqlite)?;

        let message_id: Option<String> = conn
            .query_row(
                "SELECT message_id FROM email_outbox
                 WHERE correlation_id = ?1 AND status = 'sent'",
                [&entry.correlation_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;

        message_id.ok_or_else(|| {
            ExError::new(ExErrorKind::Transport)
                .with_op("enqueue_email")
                .with_entity_id(entry.correlation_id.clone())
                .with_message("a failed send already holds this correlation id")
        })
    }

    /// Most recently sent messages first
    pub fn list_recent(conn: &Connection, limit: usize) -> Result<Vec<OutboxEntry>> {
        let mut stmt = conn
            .prepare(
                "SELECT message_id, correlation_id, recipient, subject, body, status, sent_at
                 FROM email_outbox ORDER BY sent_at DESC, message_id DESC LIMIT ?1",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        rows.into_iter()
            .map(
                |(message_id, correlation_id, recipient, subject, body, status, sent_at)| {
                    let status = match status.as_str() {
                        "sent" => OutboxStatus::Sent,
                        "failed" => OutboxStatus::Failed,
                        other => return Err(corrupt_column("status", other)),
                    };
                    Ok(OutboxEntry {
                        message_id,
                        correlation_id,
                        recipient,
                        subject,
                        body,
                        status,
                        sent_at: from_millis("sent_at", sent_at)?,
                    })
                },
            )
            .collect()
    }

    pub fn count(conn: &Connection) -> Result<u64> {
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM email_outbox", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        Ok(count as u64)
    }
}
