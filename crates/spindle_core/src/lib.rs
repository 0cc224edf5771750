//! SPINDLE Core Types
//!
//! Identifiers, status codes, and error types shared by the planner and the
//! runtime. This crate performs no I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod status;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use id::{ExecutionId, NodeId, PipelineId, RunId};
pub use status::{Status, StatusCode};
