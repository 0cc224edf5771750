//! Pipeline definition and deployment configuration.
//!
//! The pipeline is produced outside of SPINDLE and is read-only here. The
//! only part the runtime interprets is the deployment configuration, which
//! maps node IDs to executor specs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use spindle_core::{CoreError, CoreResult, NodeId, PipelineId};
use std::path::Path;

/// Executor specification for a node
///
/// `type_url` names the executor family and is used verbatim as the
/// scheduler registry key. `value` is the family-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorSpec {
    /// Executor family identifier, e.g. a fully-qualified type name
    pub type_url: String,
    /// Family-specific configuration
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ExecutorSpec {
    /// Create a spec with an empty payload
    #[must_use]
    pub fn new(type_url: impl Into<String>) -> Self {
        Self {
            type_url: type_url.into(),
            value: serde_json::Value::Null,
        }
    }

    /// Attach a payload
    #[must_use]
    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = value;
        self
    }
}

/// Deployment configuration packed into a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeploymentConfig {
    /// Per-node executor and driver specs
    Intermediate {
        /// Executor spec by node
        #[serde(default)]
        executor_specs: IndexMap<NodeId, ExecutorSpec>,
        /// Custom driver spec by node
        #[serde(default)]
        custom_driver_specs: IndexMap<NodeId, ExecutorSpec>,
    },
    /// A deployment config layout this runtime does not interpret
    Opaque {
        /// Type of the packed config
        type_url: String,
    },
}

impl DeploymentConfig {
    /// Empty intermediate config
    #[must_use]
    pub fn intermediate() -> Self {
        Self::Intermediate {
            executor_specs: IndexMap::new(),
            custom_driver_specs: IndexMap::new(),
        }
    }

    /// Executor spec for a node, if this layout carries one
    #[must_use]
    pub fn executor_spec(&self, node_id: &NodeId) -> Option<&ExecutorSpec> {
        match self {
            Self::Intermediate { executor_specs, .. } => executor_specs.get(node_id),
            Self::Opaque { .. } => None,
        }
    }

    /// Custom driver spec for a node, if this layout carries one
    #[must_use]
    pub fn custom_driver_spec(&self, node_id: &NodeId) -> Option<&ExecutorSpec> {
        match self {
            Self::Intermediate {
                custom_driver_specs,
                ..
            } => custom_driver_specs.get(node_id),
            Self::Opaque { .. } => None,
        }
    }
}

/// A node in the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineNode {
    /// Node ID
    pub id: NodeId,
    /// Executor label, informational
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_label: Option<String>,
    /// Upstream nodes
    #[serde(default)]
    pub upstream: Vec<NodeId>,
}

impl PipelineNode {
    /// Create a node with no upstream dependencies
    #[must_use]
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            executor_label: None,
            upstream: Vec::new(),
        }
    }

    /// Add an upstream dependency
    #[must_use]
    pub fn with_upstream(mut self, node: NodeId) -> Self {
        self.upstream.push(node);
        self
    }
}

/// Pipeline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline ID
    pub id: PipelineId,
    /// Nodes by ID
    #[serde(default)]
    pub nodes: IndexMap<NodeId, PipelineNode>,
    /// Deployment configuration, if packed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_config: Option<DeploymentConfig>,
}

impl Pipeline {
    /// Create an empty pipeline without deployment configuration
    #[must_use]
    pub fn new(id: PipelineId) -> Self {
        Self {
            id,
            nodes: IndexMap::new(),
            deployment_config: None,
        }
    }

    /// Add a node
    #[must_use]
    pub fn with_node(mut self, node: PipelineNode) -> Self {
        self.nodes.insert(node.id.clone(), node);
        self
    }

    /// Set the deployment configuration
    #[must_use]
    pub fn with_deployment_config(mut self, config: DeploymentConfig) -> Self {
        self.deployment_config = Some(config);
        self
    }

    /// Configure an executor spec for a node
    ///
    /// Creates an intermediate deployment config if none is present and
    /// replaces an opaque one.
    #[must_use]
    pub fn with_executor_spec(mut self, node_id: NodeId, spec: ExecutorSpec) -> Self {
        let config = self
            .deployment_config
            .take()
            .filter(|c| matches!(c, DeploymentConfig::Intermediate { .. }))
            .unwrap_or_else(DeploymentConfig::intermediate);
        if let DeploymentConfig::Intermediate {
            mut executor_specs,
            custom_driver_specs,
        } = config
        {
            executor_specs.insert(node_id, spec);
            self.deployment_config = Some(DeploymentConfig::Intermediate {
                executor_specs,
                custom_driver_specs,
            });
        }
        self
    }

    /// Executor spec for the given node
    ///
    /// Returns `None` when the pipeline has no deployment config, when the
    /// config is of a layout that carries no executor specs, or when the
    /// node has no entry.
    #[must_use]
    pub fn executor_spec(&self, node_id: &NodeId) -> Option<&ExecutorSpec> {
        self.deployment_config
            .as_ref()
            .and_then(|config| config.executor_spec(node_id))
    }

    /// Get a node by ID
    #[must_use]
    pub fn node(&self, node_id: &NodeId) -> Option<&PipelineNode> {
        self.nodes.get(node_id)
    }

    /// Parse a pipeline from JSON
    ///
    /// # Errors
    ///
    /// Returns error if the document is malformed
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a pipeline from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is malformed
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CoreError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&contents)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
