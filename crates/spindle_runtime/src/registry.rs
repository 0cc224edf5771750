//! Scheduler registry keyed by executor spec type URL.
//!
//! Each executor family registers one factory at start-up. For every task
//! the orchestration loop asks the registry for a scheduler; the registry
//! resolves the node's executor spec from the pipeline's deployment config
//! and invokes the matching factory.

use crate::scheduler::{SchedulerContext, TaskScheduler};
use crate::store::MetadataHandle;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use spindle_core::NodeId;
use spindle_plan::{Pipeline, Task, TaskKind};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Builds a scheduler for one task
pub type SchedulerFactory = Arc<dyn Fn(SchedulerContext) -> Arc<dyn TaskScheduler> + Send + Sync>;

/// Error from registry operations
///
/// All variants except [`RegistryError::UnsupportedTaskKind`] indicate a
/// wiring problem and are not worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A factory already exists for the type URL
    #[error("A task scheduler already exists for the executor spec type url: {type_url}")]
    DuplicateRegistration {
        /// Type URL
        type_url: String,
    },
    /// Only exec-node tasks can be scheduled
    #[error("Can create a task scheduler only for an exec_node task, got {kind}")]
    UnsupportedTaskKind {
        /// Kind of the rejected task
        kind: TaskKind,
    },
    /// The pipeline has no executor spec for the node
    #[error("Executor spec for node id `{node_id}` not found in pipeline")]
    MissingExecutorSpec {
        /// Node ID
        node_id: NodeId,
    },
    /// No factory is registered for the type URL
    #[error("No task scheduler registered for the executor spec type url: {type_url}")]
    UnregisteredExecutorSpec {
        /// Type URL
        type_url: String,
    },
}

impl RegistryError {
    /// Whether the error points at configuration rather than caller misuse
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::UnsupportedTaskKind { .. })
    }
}

static GLOBAL: Lazy<TaskSchedulerRegistry> = Lazy::new(TaskSchedulerRegistry::new);

/// Registry mapping executor spec type URLs to scheduler factories
///
/// The lock is held only while the map is read or written; factories run
/// after it is released.
#[derive(Default)]
pub struct TaskSchedulerRegistry {
    factories: RwLock<IndexMap<String, SchedulerFactory>>,
}

impl TaskSchedulerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(IndexMap::new()),
        }
    }

    /// Process-wide registry used by executor-family integrations
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Register a factory for a type URL
    ///
    /// # Errors
    ///
    /// Returns error if a factory is already registered for the type URL;
    /// the existing registration is kept.
    pub fn register<F>(&self, type_url: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(SchedulerContext) -> Arc<dyn TaskScheduler> + Send + Sync + 'static,
    {
        self.register_factory(type_url, Arc::new(factory))
    }

    /// Register an already shared factory
    ///
    /// # Errors
    ///
    /// Returns error if a factory is already registered for the type URL
    pub fn register_factory(
        &self,
        type_url: impl Into<String>,
        factory: SchedulerFactory,
    ) -> Result<(), RegistryError> {
        let type_url = type_url.into();
        let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
        if factories.contains_key(&type_url) {
            return Err(RegistryError::DuplicateRegistration { type_url });
        }
        debug!(type_url = %type_url, "registered task scheduler");
        factories.insert(type_url, factory);
        Ok(())
    }

    /// Remove every registration
    ///
    /// Meant for test setup and teardown.
    pub fn clear(&self) {
        let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
        debug!(count = factories.len(), "clearing task scheduler registry");
        factories.clear();
    }

    /// Create a scheduler for a task
    ///
    /// The returned scheduler has not started any work.
    ///
    /// # Errors
    ///
    /// - `UnsupportedTaskKind` if `task` is not an exec-node task
    /// - `MissingExecutorSpec` if the pipeline has no deployment config or no
    ///   executor spec for the task's node
    /// - `UnregisteredExecutorSpec` if nothing is registered for the spec's
    ///   type URL
    pub fn create_task_scheduler(
        &self,
        store: MetadataHandle,
        pipeline: Arc<Pipeline>,
        task: Task,
    ) -> Result<Arc<dyn TaskScheduler>, RegistryError> {
        let exec_task = task
            .as_exec_node()
            .ok_or(RegistryError::UnsupportedTaskKind { kind: task.kind() })?;
        let node_id = &exec_task.node_uid.node_id;

        let spec = pipeline.executor_spec(node_id).ok_or_else(|| {
            debug!(
                node_id = %node_id,
                has_deployment_config = pipeline.deployment_config.is_some(),
                "executor spec not found"
            );
            RegistryError::MissingExecutorSpec {
                node_id: node_id.clone(),
            }
        })?;

        let factory = self.factory(&spec.type_url).ok_or_else(|| {
            RegistryError::UnregisteredExecutorSpec {
                type_url: spec.type_url.clone(),
            }
        })?;

        debug!(node_id = %node_id, type_url = %spec.type_url, "creating task scheduler");
        Ok(factory(SchedulerContext::new(store, pipeline, task)))
    }

    /// Factory registered for a type URL
    #[must_use]
    pub fn factory(&self, type_url: &str) -> Option<SchedulerFactory> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(type_url)
            .cloned()
    }

    /// Whether a factory is registered for a type URL
    #[must_use]
    pub fn contains(&self, type_url: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(type_url)
    }

    /// Registered type URLs in registration order
    #[must_use]
    pub fn type_urls(&self) -> Vec<String> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of registrations
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TaskSchedulerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSchedulerRegistry")
            .field("type_urls", &self.type_urls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TaskSchedulerResult;
    use crate::store::InMemoryMetadataStore;
    use proptest::prelude::*;
    use spindle_core::{ExecutionId, PipelineId, RunId, Status, StatusCode};
    use spindle_plan::{CancelNodeTask, ExecNodeTask, ExecutorSpec, NodeUid, PipelineNode};
    use std::sync::Barrier;
    use std::thread;

    const FOO: &str = "type.googleapis.com/Foo";
    const BAR: &str = "type.googleapis.com/Bar";

    /// Reports which factory built it through its status message.
    struct RecordingScheduler {
        built_by: &'static str,
    }

    impl TaskScheduler for RecordingScheduler {
        fn schedule(&self) -> TaskSchedulerResult {
            TaskSchedulerResult::new(Status::new(StatusCode::Ok, Some(self.built_by.to_string())))
        }

        fn cancel(&self) {}
    }

    fn recording(
        built_by: &'static str,
    ) -> impl Fn(SchedulerContext) -> Arc<dyn TaskScheduler> + Send + Sync + 'static {
        move |_context| Arc::new(RecordingScheduler { built_by }) as Arc<dyn TaskScheduler>
    }

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(
            Pipeline::new(PipelineId::new("p"))
                .with_node(PipelineNode::new(NodeId::new("n1")))
                .with_node(PipelineNode::new(NodeId::new("n2")))
                .with_executor_spec(NodeId::new("n1"), ExecutorSpec::new(FOO)),
        )
    }

    fn exec_task(node: &str) -> Task {
        ExecNodeTask::new(
            NodeUid::new(PipelineId::new("p"), NodeId::new(node)),
            RunId::new(),
            ExecutionId::new(1),
        )
        .into()
    }

    fn built_by(scheduler: &Arc<dyn TaskScheduler>) -> String {
        scheduler.schedule().status().message.clone().unwrap_or_default()
    }

    #[test]
    fn test_register_duplicate_keeps_first() {
        let registry = TaskSchedulerRegistry::new();
        registry.register(FOO, recording("first")).unwrap();

        let err = registry.register(FOO, recording("second")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateRegistration {
                type_url: FOO.to_string()
            }
        );
        assert!(err.is_configuration_error());

        let scheduler = registry
            .create_task_scheduler(InMemoryMetadataStore::handle(), pipeline(), exec_task("n1"))
            .unwrap();
        assert_eq!(built_by(&scheduler), "first");
    }

    #[test]
    fn test_create_passes_inputs_through() {
        let registry = TaskSchedulerRegistry::new();
        let seen: Arc<std::sync::Mutex<Option<SchedulerContext>>> = Arc::default();
        {
            let seen = Arc::clone(&seen);
            registry
                .register(FOO, move |context: SchedulerContext| {
                    *seen.lock().unwrap() = Some(context);
                    Arc::new(RecordingScheduler { built_by: "foo" }) as Arc<dyn TaskScheduler>
                })
                .unwrap();
        }

        let store = InMemoryMetadataStore::handle();
        let pipeline = pipeline();
        let task = exec_task("n1");
        registry
            .create_task_scheduler(store.clone(), Arc::clone(&pipeline), task.clone())
            .unwrap();

        let context = seen.lock().unwrap().take().unwrap();
        assert!(context.store.ptr_eq(&store));
        assert!(Arc::ptr_eq(&context.pipeline, &pipeline));
        assert_eq!(context.task, task);
    }

    #[test]
    fn test_create_dispatches_on_type_url() {
        let registry = TaskSchedulerRegistry::new();
        registry.register(FOO, recording("foo")).unwrap();
        registry.register(BAR, recording("bar")).unwrap();

        let pipeline = Arc::new(
            Pipeline::clone(&pipeline()).with_executor_spec(NodeId::new("n2"), ExecutorSpec::new(BAR)),
        );
        let store = InMemoryMetadataStore::handle();

        let n1 = registry
            .create_task_scheduler(store.clone(), Arc::clone(&pipeline), exec_task("n1"))
            .unwrap();
        let n2 = registry
            .create_task_scheduler(store, pipeline, exec_task("n2"))
            .unwrap();
        assert_eq!(built_by(&n1), "foo");
        assert_eq!(built_by(&n2), "bar");
    }

    #[test]
    fn test_create_rejects_cancel_task() {
        let registry = TaskSchedulerRegistry::new();
        registry.register(FOO, recording("foo")).unwrap();

        let task: Task = CancelNodeTask {
            node_uid: NodeUid::new(PipelineId::new("p"), NodeId::new("n1")),
        }
        .into();
        let err = registry
            .create_task_scheduler(InMemoryMetadataStore::handle(), pipeline(), task)
            .err()
            .unwrap();
        assert_eq!(
            err,
            RegistryError::UnsupportedTaskKind {
                kind: TaskKind::CancelNode
            }
        );
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_cancel_task_rejected_before_spec_lookup() {
        let cancel_task = || -> Task {
            CancelNodeTask {
                node_uid: NodeUid::new(PipelineId::new("p"), NodeId::new("n1")),
            }
            .into()
        };
        let unsupported = RegistryError::UnsupportedTaskKind {
            kind: TaskKind::CancelNode,
        };

        let empty = TaskSchedulerRegistry::new();
        let err = empty
            .create_task_scheduler(InMemoryMetadataStore::handle(), pipeline(), cancel_task())
            .err()
            .unwrap();
        assert_eq!(err, unsupported);

        let bare = Arc::new(
            Pipeline::new(PipelineId::new("p")).with_node(PipelineNode::new(NodeId::new("n1"))),
        );
        let err = empty
            .create_task_scheduler(InMemoryMetadataStore::handle(), bare, cancel_task())
            .err()
            .unwrap();
        assert_eq!(err, unsupported);
    }

    #[test]
    fn test_create_missing_executor_spec_for_node() {
        let registry = TaskSchedulerRegistry::new();
        registry.register(FOO, recording("foo")).unwrap();

        let err = registry
            .create_task_scheduler(InMemoryMetadataStore::handle(), pipeline(), exec_task("n2"))
            .err()
            .unwrap();
        assert_eq!(
            err,
            RegistryError::MissingExecutorSpec {
                node_id: NodeId::new("n2")
            }
        );
    }

    #[test]
    fn test_create_missing_deployment_config() {
        let registry = TaskSchedulerRegistry::new();
        registry.register(FOO, recording("foo")).unwrap();

        let bare = Arc::new(
            Pipeline::new(PipelineId::new("p")).with_node(PipelineNode::new(NodeId::new("n1"))),
        );
        let err = registry
            .create_task_scheduler(InMemoryMetadataStore::handle(), bare, exec_task("n1"))
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::MissingExecutorSpec { .. }));
    }

    #[test]
    fn test_clear_removes_registrations() {
        let registry = TaskSchedulerRegistry::new();
        registry.register(FOO, recording("foo")).unwrap();
        assert!(registry.contains(FOO));

        registry.clear();
        assert!(registry.is_empty());

        let err = registry
            .create_task_scheduler(InMemoryMetadataStore::handle(), pipeline(), exec_task("n1"))
            .err()
            .unwrap();
        assert_eq!(
            err,
            RegistryError::UnregisteredExecutorSpec {
                type_url: FOO.to_string()
            }
        );

        // Re-registering after a clear is allowed.
        registry.register(FOO, recording("again")).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_duplicate_registration() {
        const THREADS: usize = 16;
        let registry = Arc::new(TaskSchedulerRegistry::new());
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.register(FOO, recording("racer")).is_ok()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_register_and_lookup() {
        let registry = Arc::new(TaskSchedulerRegistry::new());
        let pipeline = pipeline();

        let lookups: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let pipeline = Arc::clone(&pipeline);
                thread::spawn(move || {
                    for _ in 0..200 {
                        match registry.create_task_scheduler(
                            InMemoryMetadataStore::handle(),
                            Arc::clone(&pipeline),
                            exec_task("n1"),
                        ) {
                            Ok(scheduler) => assert_eq!(built_by(&scheduler), "foo"),
                            Err(err) => assert!(matches!(
                                err,
                                RegistryError::UnregisteredExecutorSpec { .. }
                            )),
                        }
                    }
                })
            })
            .collect();

        registry.register(FOO, recording("foo")).unwrap();
        for handle in lookups {
            handle.join().unwrap();
        }
        assert!(registry.contains(FOO));
    }

    #[test]
    fn test_type_urls_in_registration_order() {
        let registry = TaskSchedulerRegistry::new();
        registry.register(BAR, recording("bar")).unwrap();
        registry.register(FOO, recording("foo")).unwrap();
        assert_eq!(registry.type_urls(), vec![BAR.to_string(), FOO.to_string()]);
    }

    proptest! {
        #[test]
        fn prop_every_registered_type_url_resolves(
            urls in proptest::collection::btree_set("[a-z]{1,8}(\\.[a-z]{1,8}){0,2}", 1..12)
        ) {
            let registry = TaskSchedulerRegistry::new();
            for url in &urls {
                prop_assert!(registry.register(url.clone(), recording("p")).is_ok());
            }
            prop_assert_eq!(registry.len(), urls.len());
            for url in &urls {
                prop_assert!(registry.contains(url));
                let is_duplicate = matches!(
                    registry.register(url.clone(), recording("again")),
                    Err(RegistryError::DuplicateRegistration { .. })
                );
                prop_assert!(is_duplicate);
            }
        }
    }
}
