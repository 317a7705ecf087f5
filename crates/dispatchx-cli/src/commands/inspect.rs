//! Tenant, stats and outbox inspection

use anyhow::Result;
use clap::Args;
use dispatchx_engine::commands::engine_query::{EngineQuery, EngineQueryResult};

use super::{print_json, run_query};
use crate::config::DispatchConfig;

#[derive(Debug, Args)]
pub struct TenantArgs {
    /// Tenant id, name, unit or name fragment
    pub hint: String,
}

#[derive(Debug, Args)]
pub struct OutboxArgs {
    #[arg(long)]
    pub limit: Option<usize>,
}

pub async fn execute_tenant(args: TenantArgs, config: &DispatchConfig) -> Result<()> {
    match run_query(config, EngineQuery::TenantContext { tenant_hint: args.hint }).await? {
        EngineQueryResult::TenantContext(result) => print_json(&result),
        other => anyhow::bail!("unexpected query result: {:?}", other),
    }
}

pub async fn execute_stats(config: &DispatchConfig) -> Result<()> {
    match run_query(config, EngineQuery::Stats).await? {
        EngineQueryResult::Stats(stats) => print_json(&stats),
        other => anyhow::bail!("unexpected query result: {:?}", other),
    }
}

pub async fn execute_outbox(args: OutboxArgs, config: &DispatchConfig) -> Result<()> {
    match run_query(config, EngineQuery::OutboxList { limit: args.limit }).await? {
        EngineQueryResult::OutboxList(entries) => print_json(&entries),
        other => anyhow::bail!("unexpected query result: {:?}", other),
    }
}
