// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Programmatic pipeline construction
//!
//! Stages are added one at a time and may only read outputs of stages that
//! were added before them, so a built pipeline is acyclic by construction.

use std::collections::BTreeMap;

use crate::config::is_valid_name;
use crate::errors::MlpipeError;
use crate::pipeline::{InputRef, Parameter, Pipeline, Stage};

/// Incremental pipeline builder
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    name: String,
    description: Option<String>,
    parameters: BTreeMap<String, Parameter>,
    stages: Vec<Stage>,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: BTreeMap::new(),
            stages: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a parameter
    pub fn parameter(mut self, name: impl Into<String>, parameter: Parameter) -> Self {
        self.parameters.insert(name.into(), parameter);
        self
    }

    /// Append a stage
    ///
    /// Rejects invalid or duplicate names and any input that is not a
    /// declared output of an already-added stage.
    pub fn stage(mut self, stage: Stage) -> Result<Self, MlpipeError> {
        if !is_valid_name(&stage.name) {
            return Err(MlpipeError::invalid_pipeline(format!(
                "stage name '{}' is not a valid name",
                stage.name
            )));
        }

        if self.stages.iter().any(|s| s.name == stage.name) {
            return Err(MlpipeError::DuplicateStage { stage: stage.name });
        }

        for input in stage.inputs.values() {
            if let InputRef::Stage {
                stage: from,
                output,
            } = input
            {
                let resolved = self
                    .stages
                    .iter()
                    .any(|s| &s.name == from && s.produces(output));

                if !resolved {
                    return Err(MlpipeError::UnknownInput {
                        stage: stage.name.clone(),
                        reference: input.to_string(),
                    });
                }
            }
        }

        self.stages.push(stage);
        Ok(self)
    }

    /// Finish the pipeline
    pub fn build(self) -> Result<Pipeline, MlpipeError> {
        if self.stages.is_empty() {
            return Err(MlpipeError::invalid_pipeline("pipeline has no stages defined"));
        }

        Ok(Pipeline {
            version: "1".to_string(),
            name: self.name,
            description: self.description,
            parameters: self.parameters,
            stages: self.stages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ComponentKind;

    #[test]
    fn test_build_chain() {
        let pipeline = PipelineBuilder::new("news")
            .stage(Stage::component("ingest", ComponentKind::ExampleGen).with_output("examples"))
            .unwrap()
            .stage(
                Stage::component("statistics", ComponentKind::StatisticsGen)
                    .with_input("examples", InputRef::from_stage("ingest", "examples"))
                    .with_output("statistics"),
            )
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(pipeline.stage_names(), vec!["ingest", "statistics"]);
    }

    #[test]
    fn test_forward_reference_rejected() {
        let err = PipelineBuilder::new("news")
            .stage(
                Stage::component("statistics", ComponentKind::StatisticsGen)
                    .with_input("examples", InputRef::from_stage("ingest", "examples")),
            )
            .unwrap_err();

        assert!(
            matches!(err, MlpipeError::UnknownInput { ref stage, .. } if stage == "statistics")
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = PipelineBuilder::new("news")
            .stage(Stage::component("ingest", ComponentKind::ExampleGen))
            .unwrap()
            .stage(Stage::component("ingest", ComponentKind::ExampleGen))
            .unwrap_err();

        assert!(matches!(err, MlpipeError::DuplicateStage { .. }));
    }

    #[test]
    fn test_empty_build_fails() {
        assert!(PipelineBuilder::new("news").build().unwrap_err().is_validation());
    }
}
