//! Read-only monitoring queries over the dispatch record ledger.
//!
//! Nothing here writes. Listing is keyset-paginated newest first on
//! `(created_at, id)` so pages stay stable while new records arrive.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::repo::context_repo::ContextRepo;
use crate::repo::record_repo::{RecordRow, RECORD_COLUMNS};
use crate::repo::{to_millis, RecordRepo};
use chrono::{DateTime, Utc};
use dispatchx_core::errors::{ExError, ExErrorKind};
use dispatchx_core::model::{DispatchRecord, Outcome, Route};
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

/// Position of the last record on a previous page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCursor {
    pub created_at_ms: i64,
    pub id: String,
}

/// Filter for [`list_records`]. Every field is optional and combined with AND.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Inclusive lower bound on `created_at`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub to: Option<DateTime<Utc>>,
    pub route: Option<Route>,
    pub outcome: Option<Outcome>,
    pub tenant_id: Option<String>,
    pub after: Option<RecordCursor>,
}

/// List records matching `filter`, newest first, returning at most `fetch` rows.
///
/// Callers that paginate ask for one row more than the page size to learn
/// whether another page exists.
pub fn list_records(
    conn: &Connection,
    filter: &RecordFilter,
    fetch: usize,
) -> Result<Vec<DispatchRecord>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(from) = filter.from {
        params.push(Value::Integer(to_millis(from)));
        clauses.push("created_at >= ?");
    }
    if let Some(to) = filter.to {
        params.push(Value::Integer(to_millis(to)));
        clauses.push("created_at < ?");
    }
    if let Some(route) = filter.route {
        params.push(Value::Text(route.as_str().to_string()));
        clauses.push("route = ?");
    }
    if let Some(outcome) = filter.outcome {
        params.push(Value::Text(outcome.as_str().to_string()));
        clauses.push("outcome = ?");
    }
    if let Some(tenant_id) = &filter.tenant_id {
        params.push(Value::Text(tenant_id.clone()));
        clauses.push("tenant_id = ?");
    }
    if let Some(cursor) = &filter.after {
        params.push(Value::Integer(cursor.created_at_ms));
        params.push(Value::Integer(cursor.created_at_ms));
        params.push(Value::Text(cursor.id.clone()));
        clauses.push("(created_at < ? OR (created_at = ? AND id < ?))");
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    params.push(Value::Integer(fetch as i64));

    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM dispatch_records {where_sql}
         ORDER BY created_at DESC, id DESC LIMIT ?"
    );

    let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), RecordRow::from_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    rows.into_iter().map(RecordRow::into_record).collect()
}

/// Fetch one record by id.
///
/// # Errors
///
/// - `NotFound` - no record with this id exists
/// - `Persistence` - SQLite query failed
pub fn fetch_record(conn: &Connection, record_id: &str) -> Result<DispatchRecord> {
    RecordRepo::get(conn, record_id)?.ok_or_else(|| {
        ExError::new(ExErrorKind::NotFound)
            .with_op("fetch_record")
            .with_entity_id(record_id)
            .with_message("dispatch record not found")
    })
}

/// Aggregate counts for the operator dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchStats {
    pub tenants: u64,
    pub assets_under_warranty: u64,
    pub records_total: u64,
    pub records_in_flight: u64,
    pub by_route: BTreeMap<String, u64>,
    pub by_outcome: BTreeMap<String, u64>,
}

pub fn dispatch_stats(conn: &Connection, now: DateTime<Utc>) -> Result<DispatchStats> {
    let by_route = grouped_counts(
        conn,
        "SELECT COALESCE(route, 'undecided'), COUNT(*) FROM dispatch_records GROUP BY 1",
    )?;
    let by_outcome = grouped_counts(
        conn,
        "SELECT outcome, COUNT(*) FROM dispatch_records GROUP BY 1",
    )?;
    let in_flight: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM dispatch_records WHERE state NOT IN ('logged', 'failed')",
            [],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)?;

    Ok(DispatchStats {
        tenants: ContextRepo::count_tenants(conn)?,
        assets_under_warranty: ContextRepo::count_assets_under_warranty(conn, now)?,
        records_total: by_outcome.values().sum(),
        records_in_flight: in_flight as u64,
        by_route,
        by_outcome,
    })
}

fn grouped_counts(conn: &Connection, sql: &str) -> Result<BTreeMap<String, u64>> {
    let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
    let pairs = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(pairs.into_iter().map(|(k, v)| (k, v as u64)).collect())
}
