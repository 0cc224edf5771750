//! Execution-history store handle.
//!
//! The store is the system of record for executions. Schedulers receive a
//! [`MetadataHandle`] at construction and use it as they need; the registry
//! only passes it through.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use spindle_core::{CoreError, CoreResult, ExecutionId, RunId, Status};
use spindle_plan::NodeUid;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Recorded execution of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Node that executed
    pub node_uid: NodeUid,
    /// Pipeline run
    pub run_id: RunId,
    /// Latest known status
    pub status: Status,
    /// When the record was created
    pub recorded_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// New record stamped with the current time
    #[must_use]
    pub fn new(node_uid: NodeUid, run_id: RunId, status: Status) -> Self {
        Self {
            node_uid,
            run_id,
            status,
            recorded_at: Utc::now(),
        }
    }
}

/// Execution-history store
///
/// Shared across concurrently running schedulers; implementations provide
/// their own synchronization.
pub trait MetadataStore: Send + Sync {
    /// Record a new execution and return its ID
    ///
    /// # Errors
    ///
    /// Returns error if the store rejects the write
    fn record_execution(&self, record: ExecutionRecord) -> CoreResult<ExecutionId>;

    /// Update the status of an existing execution
    ///
    /// # Errors
    ///
    /// Returns error if the execution is unknown
    fn update_execution(&self, id: ExecutionId, status: Status) -> CoreResult<()>;

    /// Fetch an execution
    fn execution(&self, id: ExecutionId) -> Option<ExecutionRecord>;
}

/// Cloneable handle to a shared store
#[derive(Clone)]
pub struct MetadataHandle {
    store: Arc<dyn MetadataStore>,
}

impl MetadataHandle {
    /// Wrap a store
    #[must_use]
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Whether two handles refer to the same store
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}

impl std::ops::Deref for MetadataHandle {
    type Target = dyn MetadataStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

impl std::fmt::Debug for MetadataHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataHandle")
            .field("store", &Arc::as_ptr(&self.store))
            .finish()
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    executions: RwLock<IndexMap<ExecutionId, ExecutionRecord>>,
    next_id: AtomicU64,
}

impl InMemoryMetadataStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store wrapped in a handle
    #[must_use]
    pub fn handle() -> MetadataHandle {
        MetadataHandle::new(Arc::new(Self::new()))
    }

    /// Number of recorded executions
    #[must_use]
    pub fn len(&self) -> usize {
        self.executions.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn record_execution(&self, record: ExecutionRecord) -> CoreResult<ExecutionId> {
        let id = ExecutionId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut executions = self.executions.write().map_err(|_| CoreError::Internal {
            message: "execution store lock poisoned".to_string(),
        })?;
        executions.insert(id, record);
        Ok(id)
    }

    fn update_execution(&self, id: ExecutionId, status: Status) -> CoreResult<()> {
        let mut executions = self.executions.write().map_err(|_| CoreError::Internal {
            message: "execution store lock poisoned".to_string(),
        })?;
        let record = executions.get_mut(&id).ok_or_else(|| CoreError::NotFound {
            kind: "Execution".to_string(),
            id: id.to_string(),
        })?;
        record.status = status;
        Ok(())
    }

    fn execution(&self, id: ExecutionId) -> Option<ExecutionRecord> {
        self.executions.read().ok()?.get(&id).cloned()
    }
}
