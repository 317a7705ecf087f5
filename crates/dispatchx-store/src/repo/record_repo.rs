//! Dispatch record ledger
//!
//! A record is claimed by inserting it under its idempotency key; the unique
//! constraint on that key makes the claim atomic across processes. After the
//! claim, every write is a guarded compare-and-set on the current state, and
//! the database refuses updates to terminal rows.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::repo::{from_millis, from_millis_opt, to_millis};
use chrono::{DateTime, Utc};
use dispatchx_core::errors::{ExError, ExErrorKind};
use dispatchx_core::lifecycle::DispatchState;
use dispatchx_core::model::{DispatchRecord, Outcome, Route, WarrantyStatus};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};

pub(crate) const RECORD_COLUMNS: &str = "id, idempotency_key, tenant_hint, asset_hint, tenant_id, \
     asset_id, issue_description, warranty_status, route, outcome, state, failure_code, \
     failure_detail, external_ref, booking_id, message_id, scheduled_start, supersedes, \
     created_at, decided_at, executed_at";

/// Result of trying to claim an idempotency key
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// The record was inserted; the caller owns its execution
    Claimed,
    /// Another request already holds the key
    Existing(DispatchRecord),
}

/// Fields written by a state transition. `None` leaves the column unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub state: DispatchState,
    pub warranty_status: Option<WarrantyStatus>,
    pub route: Option<Route>,
    pub outcome: Option<Outcome>,
    pub failure_code: Option<String>,
    pub failure_detail: Option<String>,
    pub external_ref: Option<String>,
    pub booking_id: Option<String>,
    pub message_id: Option<String>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl RecordUpdate {
    pub fn to(state: DispatchState) -> Self {
        Self {
            state,
            warranty_status: None,
            route: None,
            outcome: None,
            failure_code: None,
            failure_detail: None,
            external_ref: None,
            booking_id: None,
            message_id: None,
            scheduled_start: None,
            decided_at: None,
            executed_at: None,
        }
    }
}

pub struct RecordRepo;

impl RecordRepo {
    /// Insert `record` unless its idempotency key is already taken
    ///
    /// A record may be inserted directly in a terminal state, which is how
    /// requests that fail before routing are logged in a single write.
    pub fn claim(conn: &Connection, record: &DispatchRecord) -> Result<ClaimOutcome> {
        let inserted = conn
            .execute(
                &format!(
                    "INSERT INTO dispatch_records ({RECORD_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                             ?15, ?16, ?17, ?18, ?19, ?20, ?21)
                     ON CONFLICT(idempotency_key) DO NOTHING"
                ),
                rusqlite::params![
                    record.id,
                    record.idempotency_key,
                    record.tenant_hint,
                    record.asset_hint,
                    record.tenant_id,
                    record.asset_id,
                    record.issue_description,
                    record.warranty_status.map(|s| s.as_str()),
                    record.route.map(|r| r.as_str()),
                    record.outcome.as_str(),
                    record.state.as_str(),
                    record.failure_code,
                    record.failure_detail,
                    record.external_ref,
                    record.booking_id,
                    record.message_id,
                    record.scheduled_start.map(to_millis),
                    record.supersedes,
                    to_millis(record.created_at),
                    record.decided_at.map(to_millis),
                    record.executed_at.map(to_millis),
                ],
            )
            .map_err(from_rusqlite)?;

        if inserted == 1 {
            tracing::debug!(record_id = %record.id, state = %record.state, "Dispatch record claimed");
            return Ok(ClaimOutcome::Claimed);
        }

        match Self::get_by_key(conn, &record.idempotency_key)? {
            Some(existing) => Ok(ClaimOutcome::Existing(existing)),
            None => Err(ExError::new(ExErrorKind::Concurrency)
                .with_op("claim_record")
                .with_entity_id(record.idempotency_key.clone())
                .with_message("idempotency key conflicted but no record is visible")),
        }
    }

    /// Move a record from `from` to `update.state`, writing the given fields
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` if the lifecycle forbids `from -> update.state`
    /// - `RecordImmutable` if the record is already terminal
    /// - `Concurrency` if the record is no longer in state `from`
    /// - `NotFound` if no record has this id
    pub fn advance(
        conn: &Connection,
        record_id: &str,
        from: DispatchState,
        update: &RecordUpdate,
    ) -> Result<()> {
        from.advance(update.state)
            .map_err(|e| ExError::from(e).with_entity_id(record_id))?;

        let changed = conn
            .execute(
                "UPDATE dispatch_records SET
                    state = ?3,
                    warranty_status = COALESCE(?4, warranty_status),
                    route = COALESCE(?5, route),
                    outcome = COALESCE(?6, outcome),
                    failure_code = COALESCE(?7, failure_code),
                    failure_detail = COALESCE(?8, failure_detail),
                    external_ref = COALESCE(?9, external_ref),
                    booking_id = COALESCE(?10, booking_id),
                    message_id = COALESCE(?11, message_id),
                    scheduled_start = COALESCE(?12, scheduled_start),
                    decided_at = COALESCE(?13, decided_at),
                    executed_at = COALESCE(?14, executed_at)
                 WHERE id = ?1 AND state = ?2",
                rusqlite::params![
                    record_id,
                    from.as_str(),
                    update.state.as_str(),
                    update.warranty_status.map(|s| s.as_str()),
                    update.route.map(|r| r.as_str()),
                    update.outcome.map(|o| o.as_str()),
                    update.failure_code,
                    update.failure_detail,
                    update.external_ref,
                    update.booking_id,
                    update.message_id,
                    update.scheduled_start.map(to_millis),
                    update.decided_at.map(to_millis),
                    update.executed_at.map(to_millis),
                ],
            )
            .map_err(|e| from_rusqlite(e).with_entity_id(record_id))?;

        if changed == 1 {
            tracing::debug!(record_id, from = %from, to = %update.state, "Dispatch record advanced");
            return Ok(());
        }

        match Self::get(conn, record_id)? {
            None => Err(ExError::new(ExErrorKind::NotFound)
                .with_op("advance_record")
                .with_entity_id(record_id)
                .with_message("dispatch record not found")),
            Some(current) if current.is_terminal() => {
                Err(ExError::new(ExErrorKind::RecordImmutable)
                    .with_op("advance_record")
                    .with_entity_id(record_id)
                    .with_message(format!("record is already {}", current.state)))
            }
            Some(current) => Err(ExError::new(ExErrorKind::Concurrency)
                .with_op("advance_record")
                .with_entity_id(record_id)
                .with_message(format!(
                    "expected state {}, found {}",
                    from, current.state
                ))),
        }
    }

    /// Bring a record whose owner lost track of it to a terminal state
    ///
    /// Reads the stored state instead of trusting the caller's view, inside
    /// one write transaction: a record already `executed` has its outcome
    /// stored and is moved to `logged`; any other non-terminal record gets
    /// `failure` applied. A route already decided is kept. Terminal records
    /// are returned untouched.
    pub fn settle_stranded(
        conn: &mut Connection,
        record_id: &str,
        failure: &RecordUpdate,
    ) -> Result<DispatchRecord> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_rusqlite)?;
        let current = Self::get(&tx, record_id)?.ok_or_else(|| {
            ExError::new(ExErrorKind::NotFound)
                .with_op("settle_record")
                .with_entity_id(record_id)
                .with_message("dispatch record not found")
        })?;

        if !current.is_terminal() {
            if current.state == DispatchState::Executed {
                Self::advance(&tx, record_id, current.state, &RecordUpdate::to(DispatchState::Logged))?;
            } else {
                let mut update = failure.clone();
                if current.route.is_some() {
                    update.route = None;
                }
                Self::advance(&tx, record_id, current.state, &update)?;
            }
        }

        let settled = Self::get(&tx, record_id)?.unwrap_or(current);
        tx.commit().map_err(from_rusqlite)?;
        tracing::debug!(record_id, state = %settled.state, "Stranded dispatch record settled");
        Ok(settled)
    }

    pub fn get(conn: &Connection, record_id: &str) -> Result<Option<DispatchRecord>> {
        let row = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM dispatch_records WHERE id = ?1"),
                [record_id],
                RecordRow::from_row,
            )
            .optional()
            .map_err(from_rusqlite)?;
        row.map(RecordRow::into_record).transpose()
    }

    pub fn get_by_key(conn: &Connection, idempotency_key: &str) -> Result<Option<DispatchRecord>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM dispatch_records WHERE idempotency_key = ?1"
                ),
                [idempotency_key],
                RecordRow::from_row,
            )
            .optional()
            .map_err(from_rusqlite)?;
        row.map(RecordRow::into_record).transpose()
    }

    /// Records that name `record_id` as the record they supersede
    pub fn list_superseding(conn: &Connection, record_id: &str) -> Result<Vec<DispatchRecord>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM dispatch_records
                 WHERE supersedes = ?1 ORDER BY created_at, id"
            ))
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([record_id], RecordRow::from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }
}

/// A raw row from `dispatch_records`, before label and timestamp decoding
pub(crate) struct RecordRow {
    id: String,
    idempotency_key: String,
    tenant_hint: String,
    asset_hint: String,
    tenant_id: Option<String>,
    asset_id: Option<String>,
    issue_description: String,
    warranty_status: Option<String>,
    route: Option<String>,
    outcome: String,
    state: String,
    failure_code: Option<String>,
    failure_detail: Option<String>,
    external_ref: Option<String>,
    booking_id: Option<String>,
    message_id: Option<String>,
    scheduled_start: Option<i64>,
    supersedes: Option<String>,
    created_at: i64,
    decided_at: Option<i64>,
    executed_at: Option<i64>,
}

impl RecordRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            idempotency_key: row.get(1)?,
            tenant_hint: row.get(2)?,
            asset_hint: row.get(3)?,
            tenant_id: row.get(4)?,
            asset_id: row.get(5)?,
            issue_description: row.get(6)?,
            warranty_status: row.get(7)?,
            route: row.get(8)?,
            outcome: row.get(9)?,
            state: row.get(10)?,
            failure_code: row.get(11)?,
            failure_detail: row.get(12)?,
            external_ref: row.get(13)?,
            booking_id: row.get(14)?,
            message_id: row.get(15)?,
            scheduled_start: row.get(16)?,
            supersedes: row.get(17)?,
            created_at: row.get(18)?,
            decided_at: row.get(19)?,
            executed_at: row.get(20)?,
        })
    }

    pub(crate) fn into_record(self) -> Result<DispatchRecord> {
        Ok(DispatchRecord {
            warranty_status: self
                .warranty_status
                .as_deref()
                .map(str::parse::<WarrantyStatus>)
                .transpose()
                .map_err(ExError::from)?,
            route: self
                .route
                .as_deref()
                .map(str::parse::<Route>)
                .transpose()
                .map_err(ExError::from)?,
            outcome: self.outcome.parse::<Outcome>().map_err(ExError::from)?,
            state: self.state.parse::<DispatchState>().map_err(ExError::from)?,
            scheduled_start: from_millis_opt("scheduled_start", self.scheduled_start)?,
            created_at: from_millis("created_at", self.created_at)?,
            decided_at: from_millis_opt("decided_at", self.decided_at)?,
            executed_at: from_millis_opt("executed_at", self.executed_at)?,
            id: self.id,
            idempotency_key: self.idempotency_key,
            tenant_hint: self.tenant_hint,
            asset_hint: self.asset_hint,
            tenant_id: self.tenant_id,
            asset_id: self.asset_id,
            issue_description: self.issue_description,
            failure_code: self.failure_code,
            failure_detail: self.failure_detail,
            external_ref: self.external_ref,
            booking_id: self.booking_id,
            message_id: self.message_id,
            supersedes: self.supersedes,
        })
    }
}
