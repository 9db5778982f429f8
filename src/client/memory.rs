// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! In-process orchestrator for tests and dry runs

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{OrchestratorClient, Run, RunHandle, RunState, SubmitRequest};
use crate::errors::MlpipeError;

/// Failure to inject into every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureMode {
    Unreachable,
    Unauthorized,
    /// Reject with the given message, as a 400 would
    Reject(String),
}

/// Orchestrator that keeps runs in memory
pub struct InMemoryOrchestrator {
    endpoint: String,
    runs: Mutex<BTreeMap<String, Run>>,
    failure: Option<FailureMode>,
}

impl InMemoryOrchestrator {
    pub fn new() -> Self {
        Self {
            endpoint: "memory://orchestrator".to_string(),
            runs: Mutex::new(BTreeMap::new()),
            failure: None,
        }
    }

    /// Fail every call with `mode`
    pub fn failing(mode: FailureMode) -> Self {
        Self {
            failure: Some(mode),
            ..Self::new()
        }
    }

    /// All runs created so far
    pub async fn runs(&self) -> Vec<Run> {
        self.runs.lock().await.values().cloned().collect()
    }

    /// Move a run to `state`, as the orchestrator would while executing it
    pub async fn set_state(&self, run_id: &str, state: RunState) -> Result<(), MlpipeError> {
        let mut runs = self.runs.lock().await;
        let run = runs.get_mut(run_id).ok_or_else(|| not_found(run_id))?;
        run.state = state;
        Ok(())
    }

    fn check_failure(&self) -> Result<(), MlpipeError> {
        match &self.failure {
            None => Ok(()),
            Some(FailureMode::Unreachable) => Err(MlpipeError::Unreachable {
                endpoint: self.endpoint.clone(),
                reason: "connection refused".to_string(),
                help: None,
            }),
            Some(FailureMode::Unauthorized) => Err(MlpipeError::Unauthorized {
                endpoint: self.endpoint.clone(),
                status: 401,
            }),
            Some(FailureMode::Reject(message)) => Err(MlpipeError::Rejected {
                status: 400,
                message: message.clone(),
            }),
        }
    }
}

impl Default for InMemoryOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(run_id: &str) -> MlpipeError {
    MlpipeError::RemoteFailure {
        status: Some(404),
        message: format!("run '{}' not found", run_id),
    }
}

#[async_trait]
impl OrchestratorClient for InMemoryOrchestrator {
    async fn submit(&self, request: &SubmitRequest) -> Result<RunHandle, MlpipeError> {
        request.validate()?;
        self.check_failure()?;

        let run_id = Uuid::new_v4().to_string();
        let run = Run {
            run_id: run_id.clone(),
            run_name: request.run_name.clone(),
            pipeline_name: request.archive.pipeline_name().to_string(),
            state: RunState::Pending,
            parameters: request.effective_parameters(),
            created_at: Some(Utc::now()),
        };

        self.runs.lock().await.insert(run_id.clone(), run);
        tracing::debug!(run_id = %run_id, run = %request.run_name, "recorded in-memory run");

        Ok(RunHandle {
            run_id,
            run_name: request.run_name.clone(),
            state: RunState::Pending,
        })
    }

    async fn get_run(&self, run_id: &str) -> Result<Run, MlpipeError> {
        self.check_failure()?;
        self.runs
            .lock()
            .await
            .get(run_id)
            .cloned()
            .ok_or_else(|| not_found(run_id))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileContext, Compiler, CompiledArchive, YamlCompiler};
    use crate::config::{Environment, PipelineConfig};
    use crate::pipeline::{ComponentKind, Parameter, PipelineBuilder, Stage};
    use tempfile::TempDir;

    fn archive(dir: &TempDir) -> CompiledArchive {
        let pipeline = PipelineBuilder::new("tiny")
            .parameter("train_steps", Parameter::with_default("100"))
            .stage(Stage::component("ingest", ComponentKind::ExampleGen).with_output("examples"))
            .unwrap()
            .build()
            .unwrap();

        let context = CompileContext::new(
            PipelineConfig {
                project_id: "p1".into(),
                region: "us-central1".into(),
                image: "gcr.io/p1/img:1".into(),
                pipeline_name: "news".into(),
            },
            Environment::default(),
        );

        YamlCompiler::new()
            .compile(&pipeline, &context, dir.path())
            .unwrap()
    }

    #[tokio::test]
    async fn test_submit_and_read_back() {
        let dir = TempDir::new().unwrap();
        let orchestrator = InMemoryOrchestrator::new();

        let request = SubmitRequest::new(archive(&dir), "run-1").with_parameters(
            BTreeMap::from([("train_steps".to_string(), "500".to_string())]),
        );
        let handle = orchestrator.submit(&request).await.unwrap();

        assert!(!handle.run_id.is_empty());
        assert_eq!(handle.state, RunState::Pending);

        let run = orchestrator.get_run(&handle.run_id).await.unwrap();
        assert_eq!(run.run_name, "run-1");
        assert_eq!(run.pipeline_name, "news");
        assert_eq!(run.parameters["train_steps"], "500");
        assert_eq!(run.parameters["project"], "p1");
    }

    #[tokio::test]
    async fn test_same_run_name_creates_new_runs() {
        let dir = TempDir::new().unwrap();
        let orchestrator = InMemoryOrchestrator::new();
        let request = SubmitRequest::new(archive(&dir), "run-1");

        let a = orchestrator.submit(&request).await.unwrap();
        let b = orchestrator.submit(&request).await.unwrap();

        assert_ne!(a.run_id, b.run_id);
        assert_eq!(orchestrator.runs().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_parameter_is_rejected_locally() {
        let dir = TempDir::new().unwrap();
        let orchestrator = InMemoryOrchestrator::failing(FailureMode::Unreachable);

        let request = SubmitRequest::new(archive(&dir), "run-1").with_parameters(BTreeMap::from(
            [("ghost".to_string(), "1".to_string())],
        ));
        let err = orchestrator.submit(&request).await.unwrap_err();

        // Local validation wins over the injected transport failure
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_failure_modes() {
        let dir = TempDir::new().unwrap();
        let request = SubmitRequest::new(archive(&dir), "run-1");

        let err = InMemoryOrchestrator::failing(FailureMode::Unauthorized)
            .submit(&request)
            .await
            .unwrap_err();
        assert!(err.is_transport());

        let err = InMemoryOrchestrator::failing(FailureMode::Reject("bad spec".into()))
            .submit(&request)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_set_state() {
        let dir = TempDir::new().unwrap();
        let orchestrator = InMemoryOrchestrator::new();
        let handle = orchestrator
            .submit(&SubmitRequest::new(archive(&dir), "run-1"))
            .await
            .unwrap();

        orchestrator
            .set_state(&handle.run_id, RunState::Succeeded)
            .await
            .unwrap();
        let run = orchestrator.get_run(&handle.run_id).await.unwrap();
        assert!(run.state.is_terminal());

        assert!(orchestrator.get_run("missing").await.is_err());
    }
}
