//! Result types and pagination helpers for the read-only query surface.
//!
//! Plain data containers returned by `apply_engine_query`. Cursors are
//! opaque to callers: URL-safe base64 of the `(created_at, id)` sort key of
//! the last item on the page.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use dispatchx_core::errors::{ExError, ExErrorKind};
use dispatchx_core::model::{Asset, DispatchRecord, Outcome, Route, Tenant, WarrantyStatus};
use dispatchx_store::query::{RecordCursor, RecordFilter};
use serde::Serialize;

/// Default maximum items per paginated list query.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Hard ceiling on a single page.
pub const MAX_LIST_LIMIT: usize = 500;

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// A paginated page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque cursor for the next page; `None` on the last page.
    pub cursor: Option<String>,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Build a page from a raw over-fetched slice.
    ///
    /// `raw` holds at most `limit + 1` items. The extra item, if present, is
    /// dropped and marks that another page exists.
    pub fn from_overshot(mut raw: Vec<T>, limit: usize, cursor_fn: impl Fn(&T) -> String) -> Self {
        let has_more = raw.len() > limit;
        if has_more {
            raw.truncate(limit);
        }
        let cursor = if has_more {
            raw.last().map(|item| URL_SAFE_NO_PAD.encode(cursor_fn(item)))
        } else {
            None
        };
        Page {
            items: raw,
            cursor,
            has_more,
        }
    }
}

/// Options for listing dispatch records.
#[derive(Debug, Clone, Default)]
pub struct RecordListOptions {
    /// Inclusive lower bound on creation time
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on creation time
    pub to: Option<DateTime<Utc>>,
    pub route: Option<Route>,
    pub outcome: Option<Outcome>,
    pub tenant_id: Option<String>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

impl RecordListOptions {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }

    /// Store filter for these options; fails on a malformed cursor.
    pub fn to_filter(&self) -> Result<RecordFilter, ExError> {
        let after = self.cursor.as_deref().map(decode_record_cursor).transpose()?;
        Ok(RecordFilter {
            from: self.from,
            to: self.to,
            route: self.route,
            outcome: self.outcome,
            tenant_id: self.tenant_id.clone(),
            after,
        })
    }
}

/// Sort key of `record` in the form the cursor encodes.
pub fn record_cursor_key(record: &DispatchRecord) -> String {
    format!("{}:{}", record.created_at.timestamp_millis(), record.id)
}

pub fn decode_record_cursor(cursor: &str) -> Result<RecordCursor, ExError> {
    let invalid = || {
        ExError::new(ExErrorKind::InvalidInput)
            .with_op("decode_cursor")
            .with_message(format!("malformed cursor '{}'", cursor))
    };

    let bytes = URL_SAFE_NO_PAD.decode(cursor).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    let (millis, id) = text.split_once(':').ok_or_else(invalid)?;
    let created_at_ms = millis.parse::<i64>().map_err(|_| invalid())?;
    if id.is_empty() {
        return Err(invalid());
    }

    Ok(RecordCursor {
        created_at_ms,
        id: id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Result of a `RecordGet` query.
#[derive(Debug, Clone, Serialize)]
pub struct RecordGetResult {
    pub record: DispatchRecord,
    /// Ids of later records that name this one in `supersedes`
    pub superseded_by: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tenant context
// ---------------------------------------------------------------------------

/// One owned asset with its warranty status at query time.
#[derive(Debug, Clone, Serialize)]
pub struct AssetContext {
    pub asset: Asset,
    pub warranty_status: WarrantyStatus,
    /// Latest coverage end across the asset's warranty records
    pub coverage_end: Option<DateTime<Utc>>,
}

/// Result of a `TenantContext` query.
#[derive(Debug, Clone, Serialize)]
pub struct TenantContextResult {
    pub tenant: Tenant,
    pub assets: Vec<AssetContext>,
}
