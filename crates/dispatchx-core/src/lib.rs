//! DispatchX Core - pure domain kernel for maintenance dispatch
//!
//! This crate holds everything that can be decided without I/O:
//! - Tenant, asset, warranty and dispatch-record models
//! - Warranty status computation against an injected clock
//! - Idempotency key derivation
//! - The per-request lifecycle state machine
//! - The dispatch router decision table
//! - The error and logging facilities shared by the outer crates

pub mod clock;
pub mod errors;
pub mod idempotency;
pub mod lifecycle;
pub mod logging_facility;
pub mod model;
pub mod router;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{DispatchError, ExError, ExErrorKind, Result};
pub use idempotency::IdempotencyKey;
pub use lifecycle::DispatchState;
pub use model::{
    Asset, CalendarSlot, DispatchRecord, Outcome, Route, Tenant, TimeWindow, WarrantyRecord,
    WarrantyStatus,
};
pub use router::{decide, Availability, FailReason, InternalPlan, RouteDecision};
