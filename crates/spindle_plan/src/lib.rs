//! SPINDLE Planner Types
//!
//! The read-only pipeline definition the orchestration loop works from,
//! and the tasks it hands to schedulers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pipeline;
pub mod task;

pub use pipeline::{DeploymentConfig, ExecutorSpec, Pipeline, PipelineNode};
pub use task::{CancelNodeTask, ExecNodeTask, NodeUid, Task, TaskKind};
