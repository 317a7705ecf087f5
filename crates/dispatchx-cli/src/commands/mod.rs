//! Subcommand implementations and the wiring they share

pub mod config_show;
pub mod dispatch;
pub mod inspect;
pub mod migrate;
pub mod records;
pub mod seed;
pub mod tool;

use anyhow::{Context, Result};
use dispatchx_core::clock::{Clock, SystemClock};
use dispatchx_engine::adapters::{InMemoryCalendar, OutboxEmailSender};
use dispatchx_engine::commands::engine_query::{EngineQuery, EngineQueryResult};
use dispatchx_engine::DispatchEngine;
use dispatchx_store::ContextStore;
use serde::Serialize;
use std::sync::Arc;

use crate::config::DispatchConfig;

pub fn open_store(config: &DispatchConfig) -> Result<ContextStore> {
    ContextStore::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Engine over the configured store, the built-in calendar and the outbox sender
pub fn build_engine(config: &DispatchConfig) -> Result<DispatchEngine> {
    let store = open_store(config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let calendar = InMemoryCalendar::new(config.calendar.business_hours.clone())
        .with_daily_busy(config.calendar.busy.clone());
    let email = OutboxEmailSender::new(store.clone(), &config.sender_address, clock.clone());

    Ok(DispatchEngine::new(
        store,
        Arc::new(email),
        Arc::new(calendar),
        clock,
        config.engine_settings(),
    ))
}

/// Run one read-only query against a fresh engine
pub async fn run_query(config: &DispatchConfig, query: EngineQuery) -> Result<EngineQueryResult> {
    let engine = build_engine(config)?;
    Ok(engine.query(query).await?)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
