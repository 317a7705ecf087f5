//! Dispatch Engine
//!
//! Drives one request through `Requested → ContextResolved → Decided →
//! Executed → Logged`. The record is claimed under its idempotency key before
//! any side effect, so a concurrent duplicate finds the claim and waits for
//! the first request's terminal outcome instead of executing again.
//!
//! Every request runs in its own spawned task. Dropping the caller's future
//! does not stop the request from reaching a terminal, logged state.

#![allow(clippy::result_large_err)]

use chrono::{DateTime, Utc};
use dispatchx_core::clock::Clock;
use dispatchx_core::errors::{DispatchError, ExError, ExErrorKind};
use dispatchx_core::idempotency::IdempotencyKey;
use dispatchx_core::lifecycle::DispatchState;
use dispatchx_core::model::{DispatchRecord, Outcome, Route, TimeWindow, WarrantyStatus};
use dispatchx_core::router::{decide, Availability, InternalPlan, RouteDecision};
use dispatchx_core::{log_op_end, log_op_error, log_op_start};
use dispatchx_core_types::schema::EVENT_DUPLICATE;
use dispatchx_core_types::RequestContext;
use dispatchx_store::errors::Result;
use dispatchx_store::query::fetch_record;
use dispatchx_store::repo::{ClaimOutcome, RecordRepo, RecordUpdate};
use dispatchx_store::ContextStore;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::availability::AvailabilityChecker;
use crate::collaborators::{CalendarService, EmailSender};
use crate::commands::engine_query::{apply_engine_query, EngineQuery, EngineQueryResult};
use crate::executor::{ActionExecutor, ExecutionOutcome};
use crate::resolver::{self, Resolution, ResolvedContext};
use crate::settings::{with_timeout, EngineSettings};

const OP_DISPATCH: &str = "dispatch_issue";

/// One maintenance issue reported by the voice layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub tenant_hint: String,
    pub asset_hint: String,
    pub issue_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_window: Option<TimeWindow>,
    /// Overrides the category-based visit length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hint_minutes: Option<u32>,
    /// Caller-supplied key; derived from tenant, asset and window when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// Id of a terminal record this request replaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,
}

impl DispatchRequest {
    pub fn new(
        tenant_hint: impl Into<String>,
        asset_hint: impl Into<String>,
        issue_description: impl Into<String>,
    ) -> Self {
        Self {
            tenant_hint: tenant_hint.into(),
            asset_hint: asset_hint.into(),
            issue_description: issue_description.into(),
            requested_window: None,
            duration_hint_minutes: None,
            idempotency_key: None,
            supersedes: None,
        }
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.requested_window = Some(window);
        self
    }

    pub fn with_duration_hint_minutes(mut self, minutes: u32) -> Self {
        self.duration_hint_minutes = Some(minutes);
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn superseding(mut self, record_id: impl Into<String>) -> Self {
        self.supersedes = Some(record_id.into());
        self
    }

    /// Reject malformed requests before anything is written; returns the caller key if any
    fn validate(&self) -> std::result::Result<Option<IdempotencyKey>, DispatchError> {
        if self.issue_description.trim().is_empty() {
            return Err(DispatchError::InvalidInput {
                reason: "issue description must not be empty".to_string(),
            });
        }
        if let Some(TimeWindow {
            start,
            end: Some(end),
        }) = &self.requested_window
        {
            if end <= start {
                return Err(DispatchError::InvalidInput {
                    reason: format!("requested window ends ({}) before it starts ({})", end, start),
                });
            }
        }
        self.idempotency_key
            .as_deref()
            .map(IdempotencyKey::from_caller)
            .transpose()
    }
}

/// What the caller learns about its request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub record_id: String,
    pub idempotency_key: String,
    pub state: DispatchState,
    pub route: Option<Route>,
    pub outcome: Outcome,
    pub warranty_status: Option<WarrantyStatus>,
    pub tenant_id: Option<String>,
    pub asset_id: Option<String>,
    pub external_ref: Option<String>,
    pub message_id: Option<String>,
    pub booking_id: Option<String>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub failure_code: Option<String>,
    pub failure_detail: Option<String>,
    pub supersedes: Option<String>,
    /// No slot was free; check availability again later
    pub retry_suggested: bool,
    /// The key was already taken; this is the original request's outcome
    pub duplicate: bool,
}

impl DispatchOutcome {
    pub fn from_record(record: &DispatchRecord, duplicate: bool) -> Self {
        Self {
            record_id: record.id.clone(),
            idempotency_key: record.idempotency_key.clone(),
            state: record.state,
            route: record.route,
            outcome: record.outcome,
            warranty_status: record.warranty_status,
            tenant_id: record.tenant_id.clone(),
            asset_id: record.asset_id.clone(),
            external_ref: record.external_ref.clone(),
            message_id: record.message_id.clone(),
            booking_id: record.booking_id.clone(),
            scheduled_start: record.scheduled_start,
            failure_code: record.failure_code.clone(),
            failure_detail: record.failure_detail.clone(),
            supersedes: record.supersedes.clone(),
            retry_suggested: record.route == Some(Route::Internal)
                && record.outcome == Outcome::Pending,
            duplicate,
        }
    }
}

/// Dispatch Engine façade
///
/// Cheap to clone; clones share the store handle, collaborators and settings.
#[derive(Clone)]
pub struct DispatchEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    store: ContextStore,
    clock: Arc<dyn Clock>,
    availability: AvailabilityChecker,
    executor: ActionExecutor,
    settings: EngineSettings,
}

/// How far an in-flight record got, for abandoning it on infrastructure failure
struct Progress {
    record_id: String,
    state: DispatchState,
    execution: Option<ExecutionOutcome>,
}

impl DispatchEngine {
    pub fn new(
        store: ContextStore,
        email: Arc<dyn EmailSender>,
        calendar: Arc<dyn CalendarService>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let availability = AvailabilityChecker::new(Arc::clone(&calendar), settings.clone());
        let executor = ActionExecutor::new(email, calendar, settings.clone());
        Self {
            inner: Arc::new(EngineInner {
                store,
                clock,
                availability,
                executor,
                settings,
            }),
        }
    }

    pub fn store(&self) -> &ContextStore {
        &self.inner.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    pub async fn dispatch_issue(&self, request: DispatchRequest) -> Result<DispatchOutcome> {
        self.dispatch_issue_with_context(request, RequestContext::new())
            .await
    }

    /// Dispatch one issue under the caller's correlation ids
    ///
    /// Routing and execution failures are not `Err`: they come back as a
    /// logged record with outcome `error` and a `failure_code`. A request
    /// whose key is already taken returns the original outcome with
    /// `duplicate` set.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty issue, an inverted window, an empty
    ///   caller key, or a superseded record that is not yet terminal or
    ///   belongs to another tenant or asset
    /// - `NotFound` when `supersedes` names no record
    /// - `Concurrency` when a duplicate outwaited `duplicate_wait`
    /// - `Persistence` or `Timeout` when the store failed before a record
    ///   could be written
    pub async fn dispatch_issue_with_context(
        &self,
        request: DispatchRequest,
        ctx: RequestContext,
    ) -> Result<DispatchOutcome> {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.run(request, ctx).await });
        match task.await {
            Ok(result) => result,
            Err(e) => Err(ExError::new(ExErrorKind::Internal)
                .with_op(OP_DISPATCH)
                .with_message(format!("dispatch task failed: {}", e))),
        }
    }

    /// Run a read-only query against the store
    pub async fn query(&self, query: EngineQuery) -> Result<EngineQueryResult> {
        let now = self.inner.clock.now();
        self.inner
            .with_conn("engine_query", move |conn| {
                apply_engine_query(query, conn, now)
            })
            .await
    }
}

impl EngineInner {
    async fn run(&self, request: DispatchRequest, ctx: RequestContext) -> Result<DispatchOutcome> {
        log_op_start!(
            OP_DISPATCH,
            request_id = %ctx.request_id,
            tenant_hint = %request.tenant_hint,
            asset_hint = %request.asset_hint
        );
        let start = Instant::now();

        let result = self.process(&request, &ctx).await;

        let elapsed = start.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => log_op_end!(
                OP_DISPATCH,
                duration_ms = elapsed,
                request_id = %ctx.request_id,
                record_id = %outcome.record_id,
                idempotency_key = %outcome.idempotency_key,
                route = outcome.route.map(|r| r.as_str()).unwrap_or("undecided"),
                outcome = %outcome.outcome,
                duplicate = outcome.duplicate
            ),
            Err(e) => {
                let e_clone = e.clone();
                log_op_error!(
                    OP_DISPATCH,
                    e_clone,
                    duration_ms = elapsed,
                    request_id = %ctx.request_id
                );
            }
        }

        result.map_err(|e| correlate(e, &ctx))
    }

    async fn process(
        &self,
        request: &DispatchRequest,
        ctx: &RequestContext,
    ) -> Result<DispatchOutcome> {
        let caller_key = request.validate()?;
        let now = self.clock.now();

        let prior = match &request.supersedes {
            Some(record_id) => Some(self.load_superseded(record_id).await?),
            None => None,
        };

        let tenant_hint = request.tenant_hint.clone();
        let asset_hint = request.asset_hint.clone();
        let resolution = self
            .with_conn("resolve_context", move |conn| {
                resolver::resolve(conn, &tenant_hint, &asset_hint, now)
            })
            .await?;

        if let Some(prior) = &prior {
            check_lineage(prior, &resolution)?;
        }
        let supersedes = prior.map(|p| p.id);

        let window_day = request
            .requested_window
            .as_ref()
            .map(TimeWindow::issue_day)
            .unwrap_or_else(|| now.date_naive());
        let key = caller_key.unwrap_or_else(|| match &resolution {
            Resolution::Resolved(context) => {
                IdempotencyKey::derive(&context.tenant.id, &context.asset.id, window_day)
            }
            Resolution::Unresolved { .. } => IdempotencyKey::derive_unresolved(
                &request.tenant_hint,
                &request.asset_hint,
                window_day,
            ),
        });
        let key = match &supersedes {
            Some(prior_id) => key.superseding(prior_id),
            None => key,
        };

        let mut record = DispatchRecord {
            id: uuid::Uuid::now_v7().to_string(),
            idempotency_key: key.as_str().to_string(),
            tenant_hint: request.tenant_hint.clone(),
            asset_hint: request.asset_hint.clone(),
            tenant_id: None,
            asset_id: None,
            issue_description: request.issue_description.clone(),
            warranty_status: None,
            route: None,
            outcome: Outcome::Pending,
            state: DispatchState::Requested,
            failure_code: None,
            failure_detail: None,
            external_ref: None,
            booking_id: None,
            message_id: None,
            scheduled_start: None,
            supersedes,
            created_at: now,
            decided_at: None,
            executed_at: None,
        };

        match resolution {
            Resolution::Unresolved { tenant_id, error } => {
                record.tenant_id = tenant_id;
                self.log_unresolved(record, error, ctx).await
            }
            Resolution::Resolved(context) => {
                record.tenant_id = Some(context.tenant.id.clone());
                record.asset_id = Some(context.asset.id.clone());
                self.dispatch_resolved(record, &context, request, &key, ctx)
                    .await
            }
        }
    }

    async fn load_superseded(&self, record_id: &str) -> Result<DispatchRecord> {
        let id = record_id.to_string();
        let prior = self
            .with_conn("load_superseded", move |conn| fetch_record(conn, &id))
            .await?;
        if !prior.is_terminal() {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op(OP_DISPATCH)
                .with_entity_id(prior.id.clone())
                .with_message(format!(
                    "record is still {}; only terminal records can be superseded",
                    prior.state
                )));
        }
        Ok(prior)
    }

    /// Failed resolution is written as a single terminal record
    async fn log_unresolved(
        &self,
        mut record: DispatchRecord,
        error: DispatchError,
        ctx: &RequestContext,
    ) -> Result<DispatchOutcome> {
        let decision = decide(None, &Availability::NotChecked);
        let failure = ExError::from(error.clone());
        tracing::debug!(
            record_id = %record.id,
            err_code = failure.code(),
            "Context unresolved"
        );

        record.route = Some(decision.route());
        record.outcome = Outcome::Error;
        record.state = DispatchState::Failed;
        record.failure_code = Some(failure.code().to_string());
        record.failure_detail = Some(error.to_string());
        record.decided_at = Some(record.created_at);

        match self.claim(record.clone()).await? {
            ClaimOutcome::Claimed => Ok(DispatchOutcome::from_record(&record, false)),
            ClaimOutcome::Existing(existing) => self.settle_duplicate(existing, ctx).await,
        }
    }

    async fn dispatch_resolved(
        &self,
        record: DispatchRecord,
        context: &ResolvedContext,
        request: &DispatchRequest,
        key: &IdempotencyKey,
        ctx: &RequestContext,
    ) -> Result<DispatchOutcome> {
        if let ClaimOutcome::Existing(existing) = self.claim(record.clone()).await? {
            return self.settle_duplicate(existing, ctx).await;
        }

        let mut progress = Progress {
            record_id: record.id.clone(),
            state: DispatchState::Requested,
            execution: None,
        };
        if let Err(err) = self
            .drive(&mut progress, context, request, key, record.created_at)
            .await
        {
            if let Err(abandon_err) = self.abandon(&progress, &err).await {
                return Err(err.with_source(abandon_err));
            }
        }

        let record_id = record.id;
        let stored = self
            .with_conn("load_record", move |conn| fetch_record(conn, &record_id))
            .await?;
        Ok(DispatchOutcome::from_record(&stored, false))
    }

    async fn drive(
        &self,
        progress: &mut Progress,
        context: &ResolvedContext,
        request: &DispatchRequest,
        key: &IdempotencyKey,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let status = context.warranty_status;
        self.advance(
            progress,
            RecordUpdate {
                warranty_status: Some(status),
                ..RecordUpdate::to(DispatchState::ContextResolved)
            },
        )
        .await?;

        let availability = match status {
            WarrantyStatus::Active => Availability::NotChecked,
            WarrantyStatus::Expired => {
                let duration_hint = request
                    .duration_hint_minutes
                    .map(|m| chrono::Duration::minutes(i64::from(m)));
                self.availability
                    .find_slot(
                        &context.asset.category,
                        request.requested_window.as_ref(),
                        duration_hint,
                        now,
                    )
                    .await
            }
        };

        let decision = decide(Some(status), &availability);
        let decided_at = self.clock.now();
        tracing::debug!(
            record_id = %progress.record_id,
            route = %decision.route(),
            availability = ?availability,
            "Route decided"
        );

        if let Some(failure) = decision.failure(&availability) {
            let code = ExError::from(failure.clone()).code();
            return self
                .advance(
                    progress,
                    RecordUpdate {
                        route: Some(Route::Failed),
                        outcome: Some(Outcome::Error),
                        failure_code: Some(code.to_string()),
                        failure_detail: Some(failure.to_string()),
                        decided_at: Some(decided_at),
                        ..RecordUpdate::to(DispatchState::Failed)
                    },
                )
                .await;
        }

        let scheduled_start = match &decision {
            RouteDecision::InternalDispatch(InternalPlan::Scheduled(slot)) => Some(slot.start),
            _ => None,
        };
        self.advance(
            progress,
            RecordUpdate {
                route: Some(decision.route()),
                scheduled_start,
                decided_at: Some(decided_at),
                ..RecordUpdate::to(DispatchState::Decided)
            },
        )
        .await?;

        let execution = self
            .executor
            .execute(&decision, context, &request.issue_description, key)
            .await;
        let executed_at = self.clock.now();
        progress.execution = Some(execution.clone());

        let (failure_code, failure_detail) = match &execution.failure {
            Some(failure) => (Some(failure.code().to_string()), Some(failure.to_string())),
            None => (None, None),
        };
        self.advance(
            progress,
            RecordUpdate {
                outcome: Some(execution.outcome),
                failure_code,
                failure_detail,
                external_ref: execution.external_ref(),
                booking_id: execution.booking_id.clone(),
                message_id: execution.message_id.clone(),
                scheduled_start: execution.scheduled_start,
                executed_at: Some(executed_at),
                ..RecordUpdate::to(DispatchState::Executed)
            },
        )
        .await?;

        self.advance(progress, RecordUpdate::to(DispatchState::Logged))
            .await
    }

    async fn advance(&self, progress: &mut Progress, update: RecordUpdate) -> Result<()> {
        let record_id = progress.record_id.clone();
        let from = progress.state;
        let next = update.state;
        self.with_conn("advance_record", move |conn| {
            RecordRepo::advance(conn, &record_id, from, &update)
        })
        .await?;
        progress.state = next;
        Ok(())
    }

    /// Move a record stranded by an infrastructure error to a terminal state
    ///
    /// The store decides from the row itself, since a write that timed out
    /// here may still have committed. Side-effect references already
    /// obtained are kept.
    async fn abandon(&self, progress: &Progress, err: &ExError) -> Result<()> {
        tracing::warn!(
            record_id = %progress.record_id,
            state = %progress.state,
            err_code = err.code(),
            "Abandoning in-flight dispatch"
        );

        let execution = progress.execution.as_ref();
        let failure = RecordUpdate {
            route: Some(Route::Failed),
            outcome: Some(Outcome::Error),
            failure_code: Some(err.code().to_string()),
            failure_detail: Some(err.to_string()),
            external_ref: execution.and_then(ExecutionOutcome::external_ref),
            booking_id: execution.and_then(|e| e.booking_id.clone()),
            message_id: execution.and_then(|e| e.message_id.clone()),
            executed_at: execution.map(|_| self.clock.now()),
            ..RecordUpdate::to(DispatchState::Failed)
        };
        let record_id = progress.record_id.clone();
        let settled = self
            .with_conn("abandon_record", move |conn| {
                RecordRepo::settle_stranded(conn, &record_id, &failure)
            })
            .await?;
        tracing::debug!(record_id = %settled.id, state = %settled.state, "Dispatch settled");
        Ok(())
    }

    async fn claim(&self, record: DispatchRecord) -> Result<ClaimOutcome> {
        self.with_conn("claim_record", move |conn| RecordRepo::claim(conn, &record))
            .await
    }

    /// Return the outcome of the request already holding this key
    ///
    /// An in-flight original is polled until it turns terminal or
    /// `duplicate_wait` runs out.
    async fn settle_duplicate(
        &self,
        existing: DispatchRecord,
        ctx: &RequestContext,
    ) -> Result<DispatchOutcome> {
        tracing::info!(
            component = module_path!(),
            op = OP_DISPATCH,
            event = EVENT_DUPLICATE,
            request_id = %ctx.request_id,
            record_id = %existing.id,
            idempotency_key = %existing.idempotency_key,
            state = %existing.state,
        );
        if existing.is_terminal() {
            return Ok(DispatchOutcome::from_record(&existing, true));
        }

        let timeouts = self.settings.timeouts;
        let deadline = Instant::now() + timeouts.duplicate_wait;
        loop {
            tokio::time::sleep(timeouts.duplicate_poll).await;

            let key = existing.idempotency_key.clone();
            let current = self
                .with_conn("await_duplicate", move |conn| {
                    RecordRepo::get_by_key(conn, &key)
                })
                .await?;
            if let Some(record) = current.filter(DispatchRecord::is_terminal) {
                return Ok(DispatchOutcome::from_record(&record, true));
            }

            if Instant::now() >= deadline {
                return Err(ExError::new(ExErrorKind::Concurrency)
                    .with_op(OP_DISPATCH)
                    .with_entity_id(existing.id.clone())
                    .with_message(format!(
                        "request with this idempotency key still in flight after {}ms",
                        timeouts.duplicate_wait.as_millis()
                    )));
            }
        }
    }

    /// Run `work` on a fresh connection off the async runtime, under the store timeout
    async fn with_conn<T, F>(&self, op: &'static str, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut conn = store.connect()?;
            work(&mut conn)
        });

        with_timeout(self.settings.timeouts.store, op, async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(ExError::new(ExErrorKind::Internal)
                    .with_op(op)
                    .with_message(format!("store task failed: {}", e))),
            }
        })
        .await
    }
}

/// A superseding request must be about the same tenant and asset as the
/// record it replaces. Ids the prior request never resolved are not compared.
fn check_lineage(prior: &DispatchRecord, resolution: &Resolution) -> Result<()> {
    let (tenant_id, asset_id) = match resolution {
        Resolution::Resolved(context) => (
            Some(context.tenant.id.as_str()),
            Some(context.asset.id.as_str()),
        ),
        Resolution::Unresolved { tenant_id, .. } => (tenant_id.as_deref(), None),
    };
    let differs = |before: &Option<String>, now: Option<&str>| match (before.as_deref(), now) {
        (Some(before), Some(now)) => before != now,
        _ => false,
    };

    if differs(&prior.tenant_id, tenant_id) || differs(&prior.asset_id, asset_id) {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op(OP_DISPATCH)
            .with_entity_id(prior.id.clone())
            .with_message(format!(
                "superseded record is for tenant {} asset {}, not this request's",
                prior.tenant_id.as_deref().unwrap_or("?"),
                prior.asset_id.as_deref().unwrap_or("?")
            )));
    }
    Ok(())
}

fn correlate(err: ExError, ctx: &RequestContext) -> ExError {
    let err = err.with_request_id(ctx.request_id.clone());
    match &ctx.trace_id {
        Some(trace_id) => err.with_trace_id(trace_id.clone()),
        None => err,
    }
}
