//! Dispatch record inspection
//!
//! Usage: dispatchx records list [filters] | dispatchx records get <ID> | --key <KEY>

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use dispatchx_core::model::{Outcome, Route};
use dispatchx_engine::commands::engine_query::{EngineQuery, EngineQueryResult};
use dispatchx_engine::commands::read_tools::RecordListOptions;

use super::{print_json, run_query};
use crate::config::DispatchConfig;

#[derive(Debug, Args)]
pub struct RecordsArgs {
    #[command(subcommand)]
    pub command: RecordsCommand,
}

#[derive(Debug, Subcommand)]
pub enum RecordsCommand {
    /// List records, newest first
    List(ListArgs),
    /// Show one record and anything that superseded it
    Get(GetArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Created at or after (RFC 3339)
    #[arg(long)]
    pub from: Option<DateTime<Utc>>,

    /// Created before (RFC 3339)
    #[arg(long)]
    pub to: Option<DateTime<Utc>>,

    /// manufacturer, internal or failed
    #[arg(long)]
    pub route: Option<Route>,

    /// pending, sent, booked or error
    #[arg(long)]
    pub outcome: Option<Outcome>,

    #[arg(long)]
    pub tenant: Option<String>,

    #[arg(long)]
    pub limit: Option<usize>,

    /// Cursor printed by the previous page
    #[arg(long)]
    pub cursor: Option<String>,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    #[arg(required_unless_present = "key", conflicts_with = "key")]
    pub record_id: Option<String>,

    /// Look up by idempotency key instead
    #[arg(long)]
    pub key: Option<String>,
}

pub async fn execute(args: RecordsArgs, config: &DispatchConfig) -> Result<()> {
    let query = match args.command {
        RecordsCommand::List(list) => EngineQuery::RecordList(RecordListOptions {
            from: list.from,
            to: list.to,
            route: list.route,
            outcome: list.outcome,
            tenant_id: list.tenant,
            limit: list.limit,
            cursor: list.cursor,
        }),
        RecordsCommand::Get(GetArgs {
            record_id: Some(record_id),
            ..
        }) => EngineQuery::RecordGet { record_id },
        RecordsCommand::Get(GetArgs { key: Some(key), .. }) => EngineQuery::RecordGetByKey {
            idempotency_key: key,
        },
        RecordsCommand::Get(_) => anyhow::bail!("either a record id or --key is required"),
    };

    match run_query(config, query).await? {
        EngineQueryResult::RecordList(page) => print_json(&page),
        EngineQueryResult::RecordGet(result) => print_json(&result),
        other => anyhow::bail!("unexpected query result: {:?}", other),
    }
}
