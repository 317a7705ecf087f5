//! Context Store handle
//!
//! The handle is cheap to clone and holds no connection. Every unit of work
//! acquires its own connection through [`ContextStore::connect`] and drops it
//! when done, so no lock outlives an operation.

use crate::db;
use crate::errors::{io_error, Result};
use crate::migrations::apply_migrations;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ContextStore {
    path: PathBuf,
}

impl ContextStore {
    /// Open (creating if needed) the store at `path` and apply migrations
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_error("create_store_dir", e))?;
        }

        let store = Self { path };
        let mut conn = store.connect()?;
        apply_migrations(&mut conn)?;

        tracing::debug!(path = %store.path.display(), "Context store opened");
        Ok(store)
    }

    /// Acquire a configured connection for one unit of work
    pub fn connect(&self) -> Result<Connection> {
        let conn = db::open(&self.path)?;
        db::configure(&conn)?;
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
