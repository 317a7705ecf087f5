//! Dispatch command
//!
//! Usage: dispatchx dispatch --tenant <HINT> --asset <HINT> --issue <TEXT>

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use dispatchx_core::model::TimeWindow;
use dispatchx_core_types::correlation::{RequestContext, TraceId};
use dispatchx_engine::DispatchRequest;

use super::{build_engine, print_json};
use crate::config::DispatchConfig;

#[derive(Debug, Args)]
pub struct DispatchArgs {
    /// Tenant id, name, unit or name fragment
    #[arg(long)]
    pub tenant: String,

    /// Asset id, serial number or description
    #[arg(long)]
    pub asset: String,

    /// What the tenant reported
    #[arg(long)]
    pub issue: String,

    /// Earliest acceptable start (RFC 3339)
    #[arg(long)]
    pub window_start: Option<DateTime<Utc>>,

    /// Latest acceptable end (RFC 3339); needs --window-start
    #[arg(long, requires = "window_start")]
    pub window_end: Option<DateTime<Utc>>,

    /// Expected repair duration in minutes
    #[arg(long)]
    pub duration_minutes: Option<u32>,

    /// Caller-supplied idempotency key
    #[arg(long)]
    pub key: Option<String>,

    /// Record id this request replaces
    #[arg(long)]
    pub supersedes: Option<String>,

    /// Trace id to correlate with the calling session
    #[arg(long)]
    pub trace_id: Option<String>,
}

impl DispatchArgs {
    fn into_request(self) -> DispatchRequest {
        let mut request = DispatchRequest::new(self.tenant, self.asset, self.issue);
        if let Some(start) = self.window_start {
            request = request.with_window(TimeWindow {
                start,
                end: self.window_end,
            });
        }
        if let Some(minutes) = self.duration_minutes {
            request = request.with_duration_hint_minutes(minutes);
        }
        if let Some(key) = self.key {
            request = request.with_idempotency_key(key);
        }
        if let Some(prior) = self.supersedes {
            request = request.superseding(prior);
        }
        request
    }
}

pub async fn execute(args: DispatchArgs, config: &DispatchConfig) -> Result<()> {
    let engine = build_engine(config)?;

    let mut ctx = RequestContext::new();
    if let Some(trace) = args.trace_id.clone() {
        ctx = ctx.with_trace_id(TraceId::from_string(trace));
    }

    let outcome = engine
        .dispatch_issue_with_context(args.into_request(), ctx)
        .await?;
    print_json(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn args() -> DispatchArgs {
        DispatchArgs {
            tenant: "Charlie".to_string(),
            asset: "fridge".to_string(),
            issue: "Warm inside".to_string(),
            window_start: None,
            window_end: None,
            duration_minutes: None,
            key: None,
            supersedes: None,
            trace_id: None,
        }
    }

    #[test]
    fn test_plain_args_build_plain_request() {
        assert_eq!(
            args().into_request(),
            DispatchRequest::new("Charlie", "fridge", "Warm inside")
        );
    }

    #[test]
    fn test_optional_args_carry_through() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let request = DispatchArgs {
            window_start: Some(start),
            duration_minutes: Some(90),
            key: Some("call-1".to_string()),
            supersedes: Some("rec-1".to_string()),
            ..args()
        }
        .into_request();

        assert_eq!(request.requested_window, Some(TimeWindow { start, end: None }));
        assert_eq!(request.duration_hint_minutes, Some(90));
        assert_eq!(request.idempotency_key.as_deref(), Some("call-1"));
        assert_eq!(request.supersedes.as_deref(), Some("rec-1"));
    }
}
