// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Pipeline validation
//!
//! Collects every problem in a pipeline definition instead of stopping at the
//! first one, so `mlpipe validate` can report them all at once.

use std::collections::{BTreeSet, HashSet};

use crate::config::is_valid_name;
use crate::errors::MlpipeError;
use crate::pipeline::params::placeholders;
use crate::pipeline::{Executor, InputRef, Pipeline, Stage};

/// Parameters every pipeline gets without declaring them
pub const BUILTIN_PARAMETERS: [&str; 4] = ["project", "region", "image", "pipeline_name"];

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline configuration
    pub fn validate(pipeline: &Pipeline) -> ValidationResult {
        let mut result = ValidationResult::new();

        if pipeline.stages.is_empty() {
            result.add_error(MlpipeError::invalid_pipeline("pipeline has no stages defined"));
        }

        Self::validate_parameters(pipeline, &mut result);

        let mut declared: HashSet<&str> = HashSet::new();
        for stage in &pipeline.stages {
            if !declared.insert(stage.name.as_str()) {
                result.add_error(MlpipeError::DuplicateStage {
                    stage: stage.name.clone(),
                });
                continue;
            }
            Self::validate_stage(stage, pipeline, &declared, &mut result);
        }

        Self::validate_placeholders(pipeline, &mut result);

        result
    }

    fn validate_parameters(pipeline: &Pipeline, result: &mut ValidationResult) {
        for (name, param) in &pipeline.parameters {
            if BUILTIN_PARAMETERS.contains(&name.as_str()) {
                result.add_error(MlpipeError::InvalidPipeline {
                    reason: format!("parameter '{}' shadows a built-in parameter", name),
                    help: Some(format!("Built-ins: {}", BUILTIN_PARAMETERS.join(", "))),
                });
            }
            if param.env.is_none() && param.default.is_none() {
                result.add_error(MlpipeError::invalid_pipeline(format!(
                    "parameter '{}' has neither an `env` source nor a `default`",
                    name
                )));
            }
        }
    }

    /// Validate a single stage; `declared` holds this stage and every earlier one
    fn validate_stage(
        stage: &Stage,
        pipeline: &Pipeline,
        declared: &HashSet<&str>,
        result: &mut ValidationResult,
    ) {
        if !is_valid_name(&stage.name) {
            result.add_error(MlpipeError::InvalidPipeline {
                reason: format!("stage name '{}' is not a valid name", stage.name),
                help: Some(
                    "Use lowercase letters, digits, '-' or '_', starting with a letter".into(),
                ),
            });
        }

        let mut outputs = HashSet::new();
        for output in &stage.outputs {
            if !outputs.insert(output) {
                result.add_error(MlpipeError::invalid_pipeline(format!(
                    "stage '{}' declares output '{}' twice",
                    stage.name, output
                )));
            }
        }

        for input in stage.inputs.values() {
            match input {
                InputRef::Stage {
                    stage: from,
                    output,
                } => {
                    let resolves = from != &stage.name
                        && declared.contains(from.as_str())
                        && pipeline
                            .get_stage(from)
                            .is_some_and(|producer| producer.produces(output));

                    if !resolves {
                        result.add_error(MlpipeError::UnknownInput {
                            stage: stage.name.clone(),
                            reference: input.to_string(),
                        });
                    }
                }
                InputRef::External { external } if external.trim().is_empty() => {
                    result.add_error(MlpipeError::invalid_pipeline(format!(
                        "stage '{}' has an empty external input",
                        stage.name
                    )));
                }
                InputRef::External { .. } => {}
            }
        }

        match &stage.executor {
            Executor::Container {
                image,
                command,
                args,
            } => {
                if image.trim().is_empty() {
                    result.add_error(MlpipeError::invalid_pipeline(format!(
                        "stage '{}': container image is empty",
                        stage.name
                    )));
                }
                if command.is_empty() && args.is_empty() {
                    result.add_warning(format!(
                        "Stage '{}': container has no command or args; \
                         the image entrypoint will run",
                        stage.name
                    ));
                }
            }
            Executor::Training { replica_count, .. } if *replica_count == 0 => {
                result.add_error(MlpipeError::invalid_pipeline(format!(
                    "stage '{}': training replica_count must be at least 1",
                    stage.name
                )));
            }
            _ => {}
        }

        if stage.outputs.is_empty() {
            result.add_warning(format!("Stage '{}' declares no outputs", stage.name));
        }
    }

    fn validate_placeholders(pipeline: &Pipeline, result: &mut ValidationResult) {
        let mut used = BTreeSet::new();

        for stage in &pipeline.stages {
            let templated = stage
                .executor
                .templated_strings()
                .into_iter()
                .chain(stage.properties.values().map(String::as_str))
                .chain(stage.inputs.values().filter_map(|input| match input {
                    InputRef::External { external } => Some(external.as_str()),
                    InputRef::Stage { .. } => None,
                }));

            for text in templated {
                for name in placeholders(text) {
                    used.insert(name);
                    let known = BUILTIN_PARAMETERS.contains(&name)
                        || pipeline.parameters.contains_key(name);
                    if !known {
                        result.add_error(MlpipeError::InvalidPipeline {
                            reason: format!(
                                "stage '{}' references unknown parameter '{}'",
                                stage.name, name
                            ),
                            help: Some("Declare it under `parameters`".into()),
                        });
                    }
                }
            }
        }

        for name in pipeline.parameters.keys() {
            if !used.contains(name.as_str()) {
                result.add_warning(format!("Parameter '{}' is declared but never used", name));
            }
        }
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<MlpipeError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: MlpipeError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// First error, if any
    pub fn into_result(self) -> Result<Vec<String>, MlpipeError> {
        match self.errors.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(self.warnings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ComponentKind, Parameter};
    use std::collections::BTreeMap;

    fn pipeline(stages: Vec<Stage>) -> Pipeline {
        Pipeline {
            version: "1".into(),
            name: "test".into(),
            description: None,
            parameters: BTreeMap::new(),
            stages,
        }
    }

    #[test]
    fn test_validate_empty_pipeline() {
        let result = PipelineValidator::validate(&pipeline(vec![]));
        assert!(!result.is_valid());
        assert!(result.errors[0].to_string().contains("no stages"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let result = PipelineValidator::validate(&pipeline(vec![
            Stage::component("dup", ComponentKind::ExampleGen).with_output("examples"),
            Stage::component("dup", ComponentKind::StatisticsGen).with_output("statistics"),
        ]));

        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, MlpipeError::DuplicateStage { .. })));
    }

    #[test]
    fn test_validate_undeclared_input_names_stage() {
        let result = PipelineValidator::validate(&pipeline(vec![
            Stage::component("ingest", ComponentKind::ExampleGen).with_output("examples"),
            Stage::component("train", ComponentKind::Trainer)
                .with_input("examples", InputRef::from_stage("ghost", "examples"))
                .with_output("model"),
        ]));

        let err = result.into_result().unwrap_err();
        assert!(err.is_validation());
        assert!(
            matches!(err, MlpipeError::UnknownInput { ref stage, .. } if stage == "train")
        );
    }

    #[test]
    fn test_validate_self_reference() {
        let result = PipelineValidator::validate(&pipeline(vec![Stage::component(
            "loop",
            ComponentKind::Transform,
        )
        .with_input("x", InputRef::from_stage("loop", "out"))
        .with_output("out")]));

        assert!(!result.is_valid());
    }

    #[test]
    fn test_validate_unknown_placeholder() {
        let result = PipelineValidator::validate(&pipeline(vec![Stage::component(
            "ingest",
            ComponentKind::ExampleGen,
        )
        .with_input("data", InputRef::external("{{data_root}}/news.csv"))
        .with_output("examples")]));

        assert!(!result.is_valid());
        assert!(result.errors[0].to_string().contains("data_root"));
    }

    #[test]
    fn test_validate_parameters() {
        let mut p = pipeline(vec![Stage::component("ingest", ComponentKind::ExampleGen)
            .with_input("data", InputRef::external("{{project}}"))
            .with_output("examples")]);
        p.parameters
            .insert("region".into(), Parameter::with_default("eu"));
        p.parameters.insert("orphan".into(), Parameter::default());

        let result = PipelineValidator::validate(&p);
        assert_eq!(result.errors.len(), 2);
        assert!(result.warnings.iter().any(|w| w.contains("orphan")));
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let result = PipelineValidator::validate(&pipeline(vec![Stage::new(
            "run",
            Executor::container(vec![], vec![]),
        )]));

        assert!(result.is_valid());
        assert!(result.has_warnings());
    }
}
