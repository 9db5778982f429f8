// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Archive format
//!
//! The archive is a YAML document understood by the orchestrator. All maps
//! are `BTreeMap`s and nothing time-dependent is recorded, so the same inputs
//! always serialize to the same bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::digest::digest_value;
use crate::errors::MlpipeError;
use crate::pipeline::Executor;

/// Archive format identifier
pub const SCHEMA_VERSION: &str = "mlpipe.archive/v1";

/// On-disk archive: format tag, digest, and the workflow itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveFile {
    pub schema_version: String,
    /// BLAKE3 digest of the canonical JSON encoding of `workflow`
    pub digest: String,
    pub workflow: WorkflowDescriptor,
}

impl ArchiveFile {
    /// Wrap a workflow, computing its digest
    pub fn seal(workflow: WorkflowDescriptor) -> Result<Self, MlpipeError> {
        Ok(Self {
            schema_version: SCHEMA_VERSION.to_string(),
            digest: digest_value(&workflow)?,
            workflow,
        })
    }

    pub fn to_yaml(&self) -> Result<String, MlpipeError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }
}

/// Compiled workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDescriptor {
    /// Version of mlpipe that produced the archive
    pub compiler_version: String,
    pub pipeline_info: PipelineInfo,
    /// Resolved parameter values; runs may override them
    pub parameters: BTreeMap<String, String>,
    /// Executor bindings keyed by component id
    pub components: BTreeMap<String, ComponentSpec>,
    pub dag: DagSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInfo {
    /// Deployed pipeline name
    pub name: String,
    /// Name of the definition it was compiled from
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Executor with every placeholder substituted
    pub executor: Executor,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagSpec {
    /// Tasks in execution order
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    /// Key into `components`
    pub component: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, TaskInput>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

/// Where a task input comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskInput {
    TaskOutput { task: String, output: String },
    External { uri: String },
}

/// Component id for a stage
pub fn component_id(stage: &str) -> String {
    format!("comp-{}", stage)
}

/// A compiled archive on disk
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArchive {
    path: PathBuf,
    file: ArchiveFile,
}

impl CompiledArchive {
    pub(crate) fn new(path: PathBuf, file: ArchiveFile) -> Self {
        Self { path, file }
    }

    /// Read an archive back, checking format and digest
    pub fn load(path: &Path) -> Result<Self, MlpipeError> {
        let content = std::fs::read_to_string(path).map_err(|e| MlpipeError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let malformed = |reason: String| MlpipeError::MalformedArchive {
            path: path.to_path_buf(),
            reason,
        };

        let file: ArchiveFile =
            serde_yaml::from_str(&content).map_err(|e| malformed(e.to_string()))?;

        if file.schema_version != SCHEMA_VERSION {
            return Err(malformed(format!(
                "unsupported schema version '{}' (expected '{}')",
                file.schema_version, SCHEMA_VERSION
            )));
        }

        let actual = digest_value(&file.workflow)?;
        if actual != file.digest {
            return Err(malformed("digest mismatch; the archive was modified".to_string()));
        }

        Ok(Self::new(path.to_path_buf(), file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn digest(&self) -> &str {
        &self.file.digest
    }

    pub fn workflow(&self) -> &WorkflowDescriptor {
        &self.file.workflow
    }

    /// Deployed pipeline name
    pub fn pipeline_name(&self) -> &str {
        &self.file.workflow.pipeline_info.name
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.file.workflow.parameters
    }
}
