//! Schema migration command
//!
//! Usage: dispatchx migrate

use anyhow::Result;
use dispatchx_store::migrations::applied_migrations;

use super::open_store;
use crate::config::DispatchConfig;

pub fn execute(config: &DispatchConfig) -> Result<()> {
    // Opening the store applies any pending migrations
    let store = open_store(config)?;
    let conn = store.connect()?;

    println!("Database: {}", store.path().display());
    for id in applied_migrations(&conn)? {
        println!("✓ {}", id);
    }
    Ok(())
}
