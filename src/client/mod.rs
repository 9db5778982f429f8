// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Orchestrator submission
//!
//! [`OrchestratorClient`] is the only seam between mlpipe and the hosted
//! orchestrator. Runs are created here and only read back afterwards; their
//! lifecycle belongs to the orchestrator.

mod http;
mod memory;

pub use http::{ClientOptions, HttpOrchestratorClient};
pub use memory::{FailureMode, InMemoryOrchestrator};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::compiler::CompiledArchive;
use crate::errors::MlpipeError;

/// Run state as reported by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunState {
    /// Whether the orchestrator will not change this state again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Request to start a run of a compiled archive
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub archive: CompiledArchive,
    pub run_name: String,
    /// Overrides for the archive's parameter values
    pub parameters: BTreeMap<String, String>,
}

impl SubmitRequest {
    pub fn new(archive: CompiledArchive, run_name: impl Into<String>) -> Self {
        Self {
            archive,
            run_name: run_name.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Local checks done before any network call
    pub fn validate(&self) -> Result<(), MlpipeError> {
        if self.run_name.trim().is_empty() {
            return Err(MlpipeError::invalid_config("run name must not be empty"));
        }

        let declared = self.archive.parameters();
        if let Some(unknown) = self.parameters.keys().find(|k| !declared.contains_key(*k)) {
            return Err(MlpipeError::InvalidPipeline {
                reason: format!(
                    "run parameter '{}' is not declared by pipeline '{}'",
                    unknown,
                    self.archive.pipeline_name()
                ),
                help: Some(format!(
                    "Declared parameters: {}",
                    declared.keys().cloned().collect::<Vec<_>>().join(", ")
                )),
            });
        }

        Ok(())
    }

    /// Archive parameters with the run overrides applied
    pub fn effective_parameters(&self) -> BTreeMap<String, String> {
        let mut merged = self.archive.parameters().clone();
        merged.extend(self.parameters.clone());
        merged
    }
}

/// What the orchestrator hands back on submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    /// Orchestrator-assigned identifier
    pub run_id: String,
    pub run_name: String,
    pub state: RunState,
}

/// A run as observed on the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub pipeline_name: String,
    pub state: RunState,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Client for the orchestrator's run API
#[async_trait]
pub trait OrchestratorClient: Send + Sync {
    /// Start a new run; returns the orchestrator-assigned id
    ///
    /// Errors come back unchanged and are never retried here.
    async fn submit(&self, request: &SubmitRequest) -> Result<RunHandle, MlpipeError>;

    /// Read a run back
    async fn get_run(&self, run_id: &str) -> Result<Run, MlpipeError>;

    /// Endpoint description for messages
    fn endpoint(&self) -> &str;
}
