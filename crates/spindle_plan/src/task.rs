//! Tasks handed from the orchestration loop to schedulers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use spindle_core::{ExecutionId, NodeId, PipelineId, RunId};
use std::path::PathBuf;

/// Fully qualified reference to a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeUid {
    /// Owning pipeline
    pub pipeline_id: PipelineId,
    /// Node within the pipeline
    pub node_id: NodeId,
}

impl NodeUid {
    /// Create a node UID
    #[must_use]
    pub fn new(pipeline_id: PipelineId, node_id: NodeId) -> Self {
        Self {
            pipeline_id,
            node_id,
        }
    }
}

impl std::fmt::Display for NodeUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pipeline_id, self.node_id)
    }
}

/// Task variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Execute a node
    ExecNode,
    /// Cancel a node's active execution
    CancelNode,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExecNode => write!(f, "exec_node"),
            Self::CancelNode => write!(f, "cancel_node"),
        }
    }
}

/// Request to execute a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecNodeTask {
    /// Node to execute
    pub node_uid: NodeUid,
    /// Pipeline run the execution belongs to
    pub run_id: RunId,
    /// Execution registered in the history store
    pub execution_id: ExecutionId,
    /// Resolved execution properties
    #[serde(default)]
    pub exec_properties: IndexMap<String, serde_json::Value>,
    /// Where the executor writes its output document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_output_uri: Option<String>,
    /// Scratch directory that survives executor restarts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stateful_working_dir: Option<PathBuf>,
}

impl ExecNodeTask {
    /// Create an exec task with no properties or paths
    #[must_use]
    pub fn new(node_uid: NodeUid, run_id: RunId, execution_id: ExecutionId) -> Self {
        Self {
            node_uid,
            run_id,
            execution_id,
            exec_properties: IndexMap::new(),
            executor_output_uri: None,
            stateful_working_dir: None,
        }
    }

    /// Add an execution property
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.exec_properties.insert(key.into(), value);
        self
    }
}

/// Request to cancel a node's active execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelNodeTask {
    /// Node to cancel
    pub node_uid: NodeUid,
}

/// Unit of work produced by the orchestration loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// Execute a node
    ExecNode(ExecNodeTask),
    /// Cancel a node
    CancelNode(CancelNodeTask),
}

impl Task {
    /// Variant tag
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        match self {
            Self::ExecNode(_) => TaskKind::ExecNode,
            Self::CancelNode(_) => TaskKind::CancelNode,
        }
    }

    /// Node this task targets
    #[must_use]
    pub const fn node_uid(&self) -> &NodeUid {
        match self {
            Self::ExecNode(task) => &task.node_uid,
            Self::CancelNode(task) => &task.node_uid,
        }
    }

    /// The exec variant, if this is one
    #[must_use]
    pub const fn as_exec_node(&self) -> Option<&ExecNodeTask> {
        match self {
            Self::ExecNode(task) => Some(task),
            Self::CancelNode(_) => None,
        }
    }
}

impl From<ExecNodeTask> for Task {
    fn from(task: ExecNodeTask) -> Self {
        Self::ExecNode(task)
    }
}

impl From<CancelNodeTask> for Task {
    fn from(task: CancelNodeTask) -> Self {
        Self::CancelNode(task)
    }
}
