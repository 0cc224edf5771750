//! Task scheduler abstraction.
//!
//! A scheduler drives one task of one executor family to completion. The
//! orchestration loop calls [`TaskScheduler::schedule`] on a worker thread
//! and may call [`TaskScheduler::cancel`] from its own thread at any time,
//! including before `schedule` starts and after it returns.

use crate::output::ExecutorOutput;
use crate::store::MetadataHandle;
use spindle_core::Status;
use spindle_plan::{Pipeline, Task};
use std::sync::Arc;

/// Outcome of [`TaskScheduler::schedule`]
///
/// `status` reflects scheduler-level issues such as cancellation or a
/// failure to start the executor. The executor output only matters when
/// `status` is OK; otherwise it is withheld from consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSchedulerResult {
    status: Status,
    executor_output: Option<ExecutorOutput>,
}

impl TaskSchedulerResult {
    /// Result without executor output
    #[must_use]
    pub fn new(status: Status) -> Self {
        Self {
            status,
            executor_output: None,
        }
    }

    /// Result carrying executor output
    #[must_use]
    pub fn with_executor_output(status: Status, executor_output: ExecutorOutput) -> Self {
        Self {
            status,
            executor_output: Some(executor_output),
        }
    }

    /// OK result with executor output
    #[must_use]
    pub fn ok(executor_output: ExecutorOutput) -> Self {
        Self::with_executor_output(Status::ok(), executor_output)
    }

    /// Cancelled result
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(Status::cancelled(message))
    }

    /// Scheduler-level status
    #[must_use]
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Executor output, present only when the scheduler status is OK
    #[must_use]
    pub fn executor_output(&self) -> Option<&ExecutorOutput> {
        if self.status.is_ok() {
            self.executor_output.as_ref()
        } else {
            None
        }
    }

    /// Decompose into the raw status and stored output
    #[must_use]
    pub fn into_parts(self) -> (Status, Option<ExecutorOutput>) {
        (self.status, self.executor_output)
    }
}

/// Inputs every scheduler is constructed from
#[derive(Debug, Clone)]
pub struct SchedulerContext {
    /// Execution-history store
    pub store: MetadataHandle,
    /// Pipeline definition
    pub pipeline: Arc<Pipeline>,
    /// Task to execute
    pub task: Task,
}

impl SchedulerContext {
    /// Bundle the construction inputs
    #[must_use]
    pub fn new(store: MetadataHandle, pipeline: Arc<Pipeline>, task: Task) -> Self {
        Self {
            store,
            pipeline,
            task,
        }
    }
}

/// Scheduler for a single task
///
/// Construction must not start work. Both methods take `&self` so that one
/// `Arc<dyn TaskScheduler>` can be shared by the thread blocked in
/// `schedule` and the thread issuing `cancel`.
pub trait TaskScheduler: Send + Sync {
    /// Run the task and block until it completes, fails, or is cancelled
    ///
    /// Once cancellation is observed the implementation stops in-flight
    /// work, releases what it acquired and returns a non-OK status. If
    /// `cancel` was called before `schedule`, it returns immediately
    /// without starting work. Failures are reported through the returned
    /// status, never by panicking.
    fn schedule(&self) -> TaskSchedulerResult;

    /// Request cancellation
    ///
    /// Must return immediately and be idempotent.
    fn cancel(&self);
}
