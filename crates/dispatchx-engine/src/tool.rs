//! Tool-call adapter
//!
//! The voice layer talks to the engine through a fixed set of tools. Each
//! call is a JSON object `{"tool": <name>, "arguments": {...}}` that maps onto
//! exactly one engine operation; unknown tool names fail to parse. Responses
//! are `{"ok": true, "result": ...}` or `{"ok": false, "error": {...}}`.

use chrono::{DateTime, Utc};
use dispatchx_core::errors::{ExError, ExErrorKind};
use dispatchx_core::model::{Outcome, Route};
use dispatchx_core_types::RequestContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::commands::dispatch::{DispatchEngine, DispatchRequest};
use crate::commands::engine_query::{EngineQuery, EngineQueryResult};
use crate::commands::read_tools::RecordListOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    DispatchIssue(DispatchRequest),
    GetTenantContext {
        tenant_hint: String,
    },
    GetDispatchRecord {
        #[serde(default)]
        record_id: Option<String>,
        #[serde(default)]
        idempotency_key: Option<String>,
    },
    ListDispatchRecords(ListRecordsArgs),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListRecordsArgs {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub route: Option<Route>,
    pub outcome: Option<Outcome>,
    pub tenant_id: Option<String>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

impl From<ListRecordsArgs> for RecordListOptions {
    fn from(args: ListRecordsArgs) -> Self {
        RecordListOptions {
            from: args.from,
            to: args.to,
            route: args.route,
            outcome: args.outcome,
            tenant_id: args.tenant_id,
            limit: args.limit,
            cursor: args.cursor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    /// Matching ids when a hint was ambiguous
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
}

impl ToolResponse {
    fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(err: &ExError) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(ToolError {
                code: err.code().to_string(),
                message: err.message().to_string(),
                candidates: err.candidates().map(<[String]>::to_vec).unwrap_or_default(),
            }),
        }
    }
}

pub async fn handle_tool_call(engine: &DispatchEngine, call: ToolCall) -> ToolResponse {
    handle_tool_call_with_context(engine, call, RequestContext::new()).await
}

pub async fn handle_tool_call_with_context(
    engine: &DispatchEngine,
    call: ToolCall,
    ctx: RequestContext,
) -> ToolResponse {
    match run_tool(engine, call, ctx).await {
        Ok(value) => ToolResponse::success(value),
        Err(err) => ToolResponse::failure(&err),
    }
}

/// Parse one JSON line, run it, and render the response as one JSON line
pub async fn handle_tool_line(engine: &DispatchEngine, line: &str) -> String {
    let response = match serde_json::from_str::<ToolCall>(line) {
        Ok(call) => handle_tool_call(engine, call).await,
        Err(e) => ToolResponse::failure(
            &ExError::new(ExErrorKind::InvalidInput)
                .with_op("parse_tool_call")
                .with_message(e.to_string()),
        ),
    };
    serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(
            r#"{{"ok":false,"error":{{"code":"{}","message":"response not serializable: {}"}}}}"#,
            ExErrorKind::Serialization.code(),
            e.to_string().replace('"', "'")
        )
    })
}

async fn run_tool(
    engine: &DispatchEngine,
    call: ToolCall,
    ctx: RequestContext,
) -> Result<Value, ExError> {
    match call {
        ToolCall::DispatchIssue(request) => {
            let outcome = engine.dispatch_issue_with_context(request, ctx).await?;
            Ok(serde_json::to_value(outcome)?)
        }
        ToolCall::GetTenantContext { tenant_hint } => {
            query_value(engine, EngineQuery::TenantContext { tenant_hint }).await
        }
        ToolCall::GetDispatchRecord {
            record_id,
            idempotency_key,
        } => {
            let query = match (record_id, idempotency_key) {
                (Some(record_id), _) => EngineQuery::RecordGet { record_id },
                (None, Some(idempotency_key)) => EngineQuery::RecordGetByKey { idempotency_key },
                (None, None) => {
                    return Err(ExError::new(ExErrorKind::InvalidInput)
                        .with_op("get_dispatch_record")
                        .with_message("either record_id or idempotency_key is required"))
                }
            };
            query_value(engine, query).await
        }
        ToolCall::ListDispatchRecords(args) => {
            query_value(engine, EngineQuery::RecordList(args.into())).await
        }
    }
}

async fn query_value(engine: &DispatchEngine, query: EngineQuery) -> Result<Value, ExError> {
    let value = match engine.query(query).await? {
        EngineQueryResult::RecordGet(result) => serde_json::to_value(result)?,
        EngineQueryResult::RecordList(page) => serde_json::to_value(page)?,
        EngineQueryResult::TenantContext(result) => serde_json::to_value(result)?,
        EngineQueryResult::Stats(stats) => serde_json::to_value(stats)?,
        EngineQueryResult::OutboxList(entries) => serde_json::to_value(entries)?,
    };
    Ok(value)
}
