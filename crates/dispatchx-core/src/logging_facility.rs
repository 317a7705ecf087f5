//! Structured logging facility for DispatchX
//!
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! The engine owns start/end/error events for each public operation. Store and
//! core code only emit `tracing::debug!` details underneath those boundaries.
//!
//! # Usage
//!
//! ```rust
//! use dispatchx_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
