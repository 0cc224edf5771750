//! Executor output payload.
//!
//! Produced by an executor invocation and carried back to the orchestration
//! loop inside a [`crate::TaskSchedulerResult`]. The runtime does not
//! interpret it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use spindle_core::Status;

/// An output artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Location of the artifact payload
    pub uri: String,
    /// Artifact type name
    pub type_name: String,
    /// Custom properties
    #[serde(default)]
    pub properties: IndexMap<String, serde_json::Value>,
}

impl Artifact {
    /// Create an artifact without properties
    #[must_use]
    pub fn new(uri: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            type_name: type_name.into(),
            properties: IndexMap::new(),
        }
    }
}

/// Result document written by an executor
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutorOutput {
    /// Output artifacts by output key
    #[serde(default)]
    pub output_artifacts: IndexMap<String, Vec<Artifact>>,
    /// Properties to record on the execution
    #[serde(default)]
    pub execution_properties: IndexMap<String, serde_json::Value>,
    /// Executor-level outcome
    #[serde(default)]
    pub execution_result: Status,
}

impl ExecutorOutput {
    /// Empty output with an executor-level status
    #[must_use]
    pub fn with_result(execution_result: Status) -> Self {
        Self {
            execution_result,
            ..Self::default()
        }
    }

    /// Add an artifact under an output key
    #[must_use]
    pub fn with_artifact(mut self, key: impl Into<String>, artifact: Artifact) -> Self {
        self.output_artifacts
            .entry(key.into())
            .or_default()
            .push(artifact);
        self
    }

    /// Parse from the JSON document an executor wrote
    ///
    /// # Errors
    ///
    /// Returns error if the document is malformed
    pub fn from_json(json: &str) -> spindle_core::CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
