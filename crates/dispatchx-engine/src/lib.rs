//! DispatchX Engine - Orchestration layer
//!
//! Sequences context resolution, availability checking, routing and action
//! execution for one maintenance issue, and records every outcome in the
//! Context Store.
//!
//! - [`commands::dispatch`] holds the Dispatch Engine façade
//! - [`commands::engine_query`] is the read-only monitoring surface
//! - [`collaborators`] defines the outbound email and calendar contracts
//! - [`tool`] maps enumerated tool calls onto engine operations

pub mod adapters;
pub mod availability;
pub mod collaborators;
pub mod commands;
pub mod executor;
pub mod resolver;
pub mod settings;
pub mod tool;

pub use commands::dispatch::{DispatchEngine, DispatchOutcome, DispatchRequest};
pub use settings::{EngineSettings, TimeoutConfig};
