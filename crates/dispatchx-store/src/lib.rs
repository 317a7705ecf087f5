//! DispatchX Store - the Context Store
//!
//! Provides:
//! - SQLite connection management with scoped per-unit-of-work connections
//! - Checksummed, embedded schema migrations
//! - Context repository (tenants, assets, warranty records)
//! - Dispatch record ledger with an atomic idempotency claim and
//!   append-only enforcement
//! - Read-only monitoring queries over dispatch records
//! - YAML seed import and the email outbox

pub mod db;
pub mod errors;
pub mod migrations;
pub mod query;
pub mod repo;
pub mod seed;
pub mod store;

// Re-export key types
pub use errors::Result;
pub use store::ContextStore;
