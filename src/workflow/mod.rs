// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Build/deploy workflow
//!
//! Drives image build, compilation and submission in order through the
//! [`WorkflowState`] machine. The first failing step stops the workflow;
//! earlier steps are not undone.

mod image;
mod state;
mod trigger;

pub use image::{DockerImageBuilder, ImageBuilder, PrebuiltImage};
pub use state::{BuildStep, InvalidTransition, WorkflowEvent, WorkflowState};
pub use trigger::{expand, Trigger, TriggerConfig, TAG_NAME_VAR};

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::client::{OrchestratorClient, RunHandle, SubmitRequest};
use crate::compiler::{CompileContext, CompiledArchive, Compiler};
use crate::config::{Environment, PipelineConfig};
use crate::errors::MlpipeError;
use crate::pipeline::Pipeline;

type Observer = Box<dyn Fn(&WorkflowState) + Send + Sync>;

/// Inputs shared by every step of one deploy
#[derive(Debug, Clone)]
pub struct DeployContext {
    pub config: PipelineConfig,
    pub env: Environment,
    /// Archive file or directory
    pub output: PathBuf,
    /// Run parameter overrides
    pub parameters: BTreeMap<String, String>,
}

/// Outcome of one deploy
#[derive(Debug)]
pub struct WorkflowReport {
    pub trigger: Trigger,
    pub state: WorkflowState,
    pub image: Option<String>,
    pub archive: Option<CompiledArchive>,
    pub run: Option<RunHandle>,
    /// Set when `state` is `Failed`
    pub error: Option<MlpipeError>,
}

impl WorkflowReport {
    fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            state: WorkflowState::Idle,
            image: None,
            archive: None,
            run: None,
            error: None,
        }
    }

    /// Whether the trigger was filtered out
    pub fn is_ignored(&self) -> bool {
        self.state == WorkflowState::Idle
    }

    /// The submitted run, `None` if the trigger was ignored
    pub fn into_result(self) -> Result<Option<RunHandle>, MlpipeError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.run),
        }
    }
}

/// Wires an image builder, a compiler and an orchestrator client together
pub struct DeployWorkflow {
    images: Box<dyn ImageBuilder>,
    compiler: Box<dyn Compiler>,
    client: Box<dyn OrchestratorClient>,
    trigger: TriggerConfig,
    observer: Option<Observer>,
}

impl DeployWorkflow {
    pub fn new(
        images: Box<dyn ImageBuilder>,
        compiler: Box<dyn Compiler>,
        client: Box<dyn OrchestratorClient>,
        trigger: TriggerConfig,
    ) -> Self {
        Self {
            images,
            compiler,
            client,
            trigger,
            observer: None,
        }
    }

    /// Call `observer` on every state change
    pub fn with_observer(
        mut self,
        observer: impl Fn(&WorkflowState) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Run the workflow for `trigger`
    ///
    /// Step failures are reported in the returned [`WorkflowReport`]; the
    /// outer error is only for problems before the workflow starts.
    pub async fn run(
        &self,
        trigger: &Trigger,
        pipeline: &Pipeline,
        context: &DeployContext,
    ) -> Result<WorkflowReport, MlpipeError> {
        let mut report = WorkflowReport::new(trigger.clone());

        if !self.trigger.matches(trigger)? {
            tracing::warn!(
                trigger = %trigger,
                filter = self.trigger.tag_filter.as_deref().unwrap_or_default(),
                "tag does not match trigger filter; ignoring"
            );
            self.advance(&mut report, WorkflowEvent::Ignored)?;
            return Ok(report);
        }

        tracing::info!(trigger = %trigger, name = %self.trigger.name, "deploy started");
        self.advance(&mut report, WorkflowEvent::Triggered)?;

        let tag_name = trigger.tag_name();
        let vars = self.trigger.variables(&tag_name, &context.config);

        // Image
        let built = match self.build_image(&vars, &context.config).await {
            Ok(image) => image,
            Err(e) => return self.fail(report, e),
        };
        report.image = Some(built.clone());
        self.advance(&mut report, WorkflowEvent::StepSucceeded)?;

        // Archive
        let config = PipelineConfig {
            image: built,
            ..context.config.clone()
        };
        let compile_context =
            CompileContext::new(config, context.env.clone()).with_version_tag(&tag_name);
        let archive = match self
            .compiler
            .compile(pipeline, &compile_context, &context.output)
        {
            Ok(archive) => archive,
            Err(e) => return self.fail(report, e),
        };
        report.archive = Some(archive.clone());
        self.advance(&mut report, WorkflowEvent::StepSucceeded)?;

        // Run
        let handle = match self.submit(archive, &vars, context).await {
            Ok(handle) => handle,
            Err(e) => return self.fail(report, e),
        };
        tracing::info!(run_id = %handle.run_id, run = %handle.run_name, "deploy finished");
        report.run = Some(handle);
        self.advance(&mut report, WorkflowEvent::StepSucceeded)?;

        Ok(report)
    }

    async fn build_image(
        &self,
        vars: &BTreeMap<String, String>,
        config: &PipelineConfig,
    ) -> Result<String, MlpipeError> {
        let reference = self.trigger.image_reference(vars, config)?;
        self.images.build(&reference).await
    }

    async fn submit(
        &self,
        archive: CompiledArchive,
        vars: &BTreeMap<String, String>,
        context: &DeployContext,
    ) -> Result<RunHandle, MlpipeError> {
        let run_name = self.trigger.run_name(vars)?;
        let request =
            SubmitRequest::new(archive, run_name).with_parameters(context.parameters.clone());
        self.client.submit(&request).await
    }

    fn advance(
        &self,
        report: &mut WorkflowReport,
        event: WorkflowEvent,
    ) -> Result<(), MlpipeError> {
        report.state = report
            .state
            .next(event)
            .map_err(|e| MlpipeError::invalid_config(e.to_string()))?;

        tracing::debug!(state = %report.state, "workflow state changed");
        if let Some(observer) = &self.observer {
            observer(&report.state);
        }
        Ok(())
    }

    fn fail(
        &self,
        mut report: WorkflowReport,
        error: MlpipeError,
    ) -> Result<WorkflowReport, MlpipeError> {
        let Some(step) = report.state.step() else {
            return Err(error);
        };

        tracing::warn!(step = %step, error = %error, "deploy step failed");
        self.advance(&mut report, WorkflowEvent::StepFailed(error.to_string()))?;
        report.error = Some(MlpipeError::step_failed(step, error));
        Ok(report)
    }
}
