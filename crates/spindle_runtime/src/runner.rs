//! Drives a scheduler on a dedicated worker thread.
//!
//! The orchestration loop keeps the [`ScheduledTask`] (or a
//! [`CancelHandle`] cloned from it) and awaits the result. A configured
//! deadline turns into a `cancel`, and every cancel starts a bounded grace
//! period: a scheduler that does not return within it is detached and
//! reported as failed, so the loop never waits on it indefinitely.

use crate::scheduler::{TaskScheduler, TaskSchedulerResult};
use serde::{Deserialize, Serialize};
use spindle_core::{CoreError, CoreResult, Status};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, info, warn};

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Cancel the task after this many milliseconds
    pub deadline_ms: Option<u64>,
    /// How long a cancelled scheduler may take to return
    pub cancel_grace_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            deadline_ms: None,
            cancel_grace_ms: 30_000,
        }
    }
}

impl SchedulerConfig {
    /// Parse from JSON
    ///
    /// # Errors
    ///
    /// Returns error if the document is malformed
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the deadline
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(duration_ms(deadline));
        self
    }

    /// Set the grace period
    #[must_use]
    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace_ms = duration_ms(grace);
        self
    }

    /// Deadline, if any
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Grace period after cancellation
    #[must_use]
    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

struct CancelState {
    scheduler: Arc<dyn TaskScheduler>,
    requested: AtomicBool,
    notify: Notify,
}

/// Cloneable handle that cancels a running task
#[derive(Clone)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    /// Request cancellation; returns immediately and is idempotent
    pub fn cancel(&self) {
        if !self.state.requested.swap(true, Ordering::SeqCst) {
            self.state.scheduler.cancel();
            self.state.notify.notify_one();
        }
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.requested.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CancelCause {
    Deadline,
    Requested,
}

/// A scheduler running on its own worker thread
pub struct ScheduledTask {
    name: String,
    cancel: CancelHandle,
    result: oneshot::Receiver<TaskSchedulerResult>,
    config: SchedulerConfig,
}

impl ScheduledTask {
    /// Start `schedule` on a new worker thread
    ///
    /// # Errors
    ///
    /// Returns error if the worker thread cannot be spawned
    pub fn spawn(
        name: impl Into<String>,
        scheduler: Arc<dyn TaskScheduler>,
        config: SchedulerConfig,
    ) -> CoreResult<Self> {
        let name = name.into();
        let (tx, rx) = oneshot::channel();
        let worker = Arc::clone(&scheduler);

        std::thread::Builder::new()
            .name(format!("spindle-sched-{}", name))
            .spawn(move || {
                // The receiver is gone once the runner gave up on this task.
                let _ = tx.send(worker.schedule());
            })
            .map_err(|e| CoreError::Internal {
                message: format!("failed to spawn scheduler worker for {}: {}", name, e),
            })?;
        debug!(task = %name, "scheduler worker started");

        Ok(Self {
            name,
            cancel: CancelHandle {
                state: Arc::new(CancelState {
                    scheduler,
                    requested: AtomicBool::new(false),
                    notify: Notify::new(),
                }),
            },
            result: rx,
            config,
        })
    }

    /// Handle for cancelling from another task or thread
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the scheduler's result
    ///
    /// An OK result is reported as CANCELLED if cancellation was requested
    /// before it was observed. If the scheduler does not return within the
    /// grace period after a cancel, the worker is detached and the result is
    /// DEADLINE_EXCEEDED (deadline-triggered) or ABORTED.
    pub async fn wait(self) -> TaskSchedulerResult {
        let Self {
            name,
            cancel,
            mut result,
            config,
        } = self;

        let deadline = async {
            match config.deadline() {
                Some(deadline) => tokio::time::sleep(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        let cause = tokio::select! {
            received = &mut result => return finish(&name, received, &cancel),
            () = deadline => {
                info!(task = %name, deadline_ms = ?config.deadline_ms, "deadline elapsed, cancelling");
                cancel.cancel();
                CancelCause::Deadline
            }
            () = cancel.state.notify.notified() => {
                info!(task = %name, "cancellation requested");
                CancelCause::Requested
            }
        };

        match tokio::time::timeout(config.cancel_grace(), &mut result).await {
            Ok(received) => finish(&name, received, &cancel),
            Err(_) => {
                warn!(
                    task = %name,
                    grace_ms = config.cancel_grace_ms,
                    "scheduler did not return within the cancellation grace period; detaching"
                );
                let message = format!(
                    "scheduler for {} did not return within {}ms of cancellation",
                    name, config.cancel_grace_ms
                );
                TaskSchedulerResult::new(match cause {
                    CancelCause::Deadline => Status::deadline_exceeded(message),
                    CancelCause::Requested => Status::aborted(message),
                })
            }
        }
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("cancel", &self.cancel)
            .field("config", &self.config)
            .finish()
    }
}

fn finish(
    name: &str,
    received: Result<TaskSchedulerResult, oneshot::error::RecvError>,
    cancel: &CancelHandle,
) -> TaskSchedulerResult {
    match received {
        Ok(result) if result.status().is_ok() && cancel.is_cancelled() => {
            debug!(task = %name, "discarding OK result produced after cancellation");
            TaskSchedulerResult::cancelled(format!("{} was cancelled", name))
        }
        Ok(result) => result,
        Err(_) => {
            warn!(task = %name, "scheduler worker exited without a result");
            TaskSchedulerResult::new(Status::internal(format!(
                "scheduler for {} panicked before returning",
                name
            )))
        }
    }
}
