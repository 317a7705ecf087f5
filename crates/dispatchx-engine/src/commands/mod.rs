//! Command orchestration layer.
//!
//! `dispatch` drives one maintenance request through its lifecycle;
//! `engine_query` and `read_tools` make up the read-only surface.

pub mod dispatch;
pub mod engine_query;
pub mod read_tools;
