//! Engine-level read-only query surface.
//!
//! `apply_engine_query` is the single entry point for the monitoring
//! dashboard and the read tools. It takes a shared connection and never
//! writes.

#![allow(clippy::result_large_err)]

use chrono::{DateTime, Utc};
use dispatchx_core::errors::{ExError, ExErrorKind};
use dispatchx_core::model::{warranty_status_at, DispatchRecord};
use dispatchx_core::{log_op_end, log_op_error, log_op_start};
use dispatchx_store::errors::Result;
use dispatchx_store::query::{dispatch_stats, fetch_record, list_records, DispatchStats};
use dispatchx_store::repo::{ContextRepo, OutboxEntry, OutboxRepo, RecordRepo};
use rusqlite::Connection;

use crate::commands::read_tools::{
    record_cursor_key, AssetContext, Page, RecordGetResult, RecordListOptions,
    TenantContextResult, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
use crate::resolver::lookup_tenant;

/// Read-only queries supported by the engine.
#[derive(Debug, Clone)]
pub enum EngineQuery {
    /// Fetch a dispatch record by id, with the records that supersede it.
    RecordGet { record_id: String },
    /// Fetch the dispatch record holding an idempotency key.
    RecordGetByKey { idempotency_key: String },
    /// List dispatch records newest first.
    RecordList(RecordListOptions),
    /// Resolve a tenant hint and report every owned asset's warranty status.
    TenantContext { tenant_hint: String },
    /// Dashboard counters.
    Stats,
    /// Most recent outbox emails.
    OutboxList { limit: Option<usize> },
}

/// All possible results from `apply_engine_query`.
#[derive(Debug, Clone)]
pub enum EngineQueryResult {
    RecordGet(RecordGetResult),
    RecordList(Page<DispatchRecord>),
    TenantContext(TenantContextResult),
    Stats(DispatchStats),
    OutboxList(Vec<OutboxEntry>),
}

impl EngineQuery {
    fn op_name(&self) -> &'static str {
        match self {
            EngineQuery::RecordGet { .. } => "record_get",
            EngineQuery::RecordGetByKey { .. } => "record_get_by_key",
            EngineQuery::RecordList(_) => "record_list",
            EngineQuery::TenantContext { .. } => "tenant_context",
            EngineQuery::Stats => "dispatch_stats",
            EngineQuery::OutboxList { .. } => "outbox_list",
        }
    }
}

/// Execute a read-only query.
///
/// `now` is the instant warranty status is computed against.
pub fn apply_engine_query(
    query: EngineQuery,
    conn: &Connection,
    now: DateTime<Utc>,
) -> Result<EngineQueryResult> {
    let op = query.op_name();
    log_op_start!(op);
    let start = std::time::Instant::now();

    let result = run_query(query, conn, now);

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => log_op_end!(op, duration_ms = elapsed),
        Err(e) => {
            let e_clone = e.clone();
            log_op_error!(op, e_clone, duration_ms = elapsed);
        }
    }
    result
}

fn run_query(
    query: EngineQuery,
    conn: &Connection,
    now: DateTime<Utc>,
) -> Result<EngineQueryResult> {
    match query {
        EngineQuery::RecordGet { record_id } => {
            let record = fetch_record(conn, &record_id)?;
            record_get_result(conn, record).map(EngineQueryResult::RecordGet)
        }

        EngineQuery::RecordGetByKey { idempotency_key } => {
            let record = RecordRepo::get_by_key(conn, &idempotency_key)?.ok_or_else(|| {
                ExError::new(ExErrorKind::NotFound)
                    .with_op("record_get_by_key")
                    .with_entity_id(idempotency_key.clone())
                    .with_message("no dispatch record holds this idempotency key")
            })?;
            record_get_result(conn, record).map(EngineQueryResult::RecordGet)
        }

        EngineQuery::RecordList(options) => {
            let limit = options.effective_limit();
            let filter = options.to_filter()?;
            let raw = list_records(conn, &filter, limit + 1)?;
            Ok(EngineQueryResult::RecordList(Page::from_overshot(
                raw,
                limit,
                record_cursor_key,
            )))
        }

        EngineQuery::TenantContext { tenant_hint } => {
            let tenant = lookup_tenant(conn, &tenant_hint)?.map_err(ExError::from)?;
            let mut assets = Vec::new();
            for asset in ContextRepo::list_assets_for_tenant(conn, &tenant.id)? {
                let warranties = ContextRepo::list_warranties_for_asset(conn, &asset.id)?;
                assets.push(AssetContext {
                    warranty_status: warranty_status_at(&warranties, now),
                    coverage_end: warranties.iter().map(|w| w.coverage_end).max(),
                    asset,
                });
            }
            Ok(EngineQueryResult::TenantContext(TenantContextResult {
                tenant,
                assets,
            }))
        }

        EngineQuery::Stats => dispatch_stats(conn, now).map(EngineQueryResult::Stats),

        EngineQuery::OutboxList { limit } => {
            let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
            OutboxRepo::list_recent(conn, limit).map(EngineQueryResult::OutboxList)
        }
    }
}

fn record_get_result(conn: &Connection, record: DispatchRecord) -> Result<RecordGetResult> {
    let superseded_by = RecordRepo::list_superseding(conn, &record.id)?
        .into_iter()
        .map(|r| r.id)
        .collect();
    Ok(RecordGetResult {
        record,
        superseded_by,
    })
}
