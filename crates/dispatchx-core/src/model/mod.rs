//! Domain models for the dispatch kernel

pub mod asset;
pub mod record;
pub mod slot;
pub mod tenant;
pub mod warranty;

pub use asset::Asset;
pub use record::{DispatchRecord, Outcome, Route};
pub use slot::{CalendarSlot, TimeWindow};
pub use tenant::Tenant;
pub use warranty::{warranty_status_at, WarrantyRecord, WarrantyStatus};
