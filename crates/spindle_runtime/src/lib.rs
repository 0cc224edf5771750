//! SPINDLE Runtime
//!
//! Pluggable task execution for the orchestration loop. A scheduler
//! implementation is registered per executor family (keyed by the executor
//! spec's type URL); the registry builds one scheduler per task, and the
//! runner drives its blocking `schedule` call while keeping `cancel`
//! available to the control thread.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod output;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod store;

pub use cancel::CancellationToken;
pub use output::{Artifact, ExecutorOutput};
pub use registry::{RegistryError, SchedulerFactory, TaskSchedulerRegistry};
pub use runner::{CancelHandle, ScheduledTask, SchedulerConfig};
pub use scheduler::{SchedulerContext, TaskScheduler, TaskSchedulerResult};
pub use store::{ExecutionRecord, InMemoryMetadataStore, MetadataHandle, MetadataStore};
