// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Pipeline definition structures
//!
//! Defines the schema for pipeline.yaml files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::MlpipeError;

/// Pipeline definition from pipeline.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Definition format version
    #[serde(default = "default_version")]
    pub version: String,

    /// Template name; the deployed name comes from `PIPELINE_NAME`
    pub name: String,

    /// Pipeline description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Named parameters substituted at compile time
    #[serde(default)]
    pub parameters: BTreeMap<String, Parameter>,

    /// Stages in declaration order
    pub stages: Vec<Stage>,
}

fn default_version() -> String {
    "1".to_string()
}

impl Pipeline {
    /// Load pipeline from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, MlpipeError> {
        let content = std::fs::read_to_string(path).map_err(|e| MlpipeError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_yaml(&content)
    }

    /// Parse pipeline from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, MlpipeError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Serialize pipeline to YAML
    pub fn to_yaml(&self) -> Result<String, MlpipeError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a stage by name
    pub fn get_stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Position of a stage in declaration order
    pub fn stage_index(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name == name)
    }

    /// Get all stage names
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }
}

/// A named pipeline parameter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Environment variable the value is read from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,

    /// Value used when the variable is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    /// Parameter sourced from an environment variable, with no fallback
    pub fn from_env(var: impl Into<String>) -> Self {
        Self {
            env: Some(var.into()),
            ..Self::default()
        }
    }

    /// Parameter with a fixed default
    pub fn with_default(value: impl Into<String>) -> Self {
        Self {
            default: Some(value.into()),
            ..Self::default()
        }
    }

    /// Add a fallback value
    pub fn or_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A single pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name (must be unique within pipeline)
    pub name: String,

    /// Stage description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// External service that runs this stage
    pub executor: Executor,

    /// Named inputs
    #[serde(default)]
    pub inputs: BTreeMap<String, InputRef>,

    /// Names of the artifacts this stage produces
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Free-form settings handed to the executor (thresholds, step counts, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Stage {
    /// Create a stage with no inputs or outputs
    pub fn new(name: impl Into<String>, executor: Executor) -> Self {
        Self {
            name: name.into(),
            description: None,
            executor,
            inputs: BTreeMap::new(),
            outputs: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Stage bound to a built-in component
    pub fn component(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self::new(name, Executor::Component { component: kind })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, input: InputRef) -> Self {
        self.inputs.insert(name.into(), input);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Short label for the executor kind
    pub fn executor_name(&self) -> &str {
        match &self.executor {
            Executor::Component { component } => component.as_str(),
            Executor::Container { .. } => "container",
            Executor::Training { .. } => "training",
        }
    }

    /// Names of the stages this stage reads from, in input-name order
    pub fn upstream_stages(&self) -> Vec<&str> {
        let mut upstream: Vec<&str> = Vec::new();
        for input in self.inputs.values() {
            if let Some((stage, _)) = input.references_stage() {
                if !upstream.contains(&stage) {
                    upstream.push(stage);
                }
            }
        }
        upstream
    }

    /// Whether this stage declares an output with the given name
    pub fn produces(&self, output: &str) -> bool {
        self.outputs.iter().any(|o| o == output)
    }
}

/// Binding of a stage to the external service that runs it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Executor {
    /// Pre-built component provided by the orchestrator
    Component {
        component: ComponentKind,
    },

    /// Arbitrary container run by the orchestrator
    Container {
        #[serde(default = "default_image")]
        image: String,

        #[serde(default)]
        command: Vec<String>,

        #[serde(default)]
        args: Vec<String>,
    },

    /// Job on the managed training service
    Training {
        #[serde(default = "default_image")]
        image: String,

        #[serde(default = "default_machine_type")]
        machine_type: String,

        #[serde(default = "default_replica_count")]
        replica_count: u32,

        #[serde(default)]
        args: Vec<String>,
    },
}

fn default_image() -> String {
    "{{image}}".to_string()
}

fn default_machine_type() -> String {
    "n1-standard-4".to_string()
}

fn default_replica_count() -> u32 {
    1
}

impl Executor {
    /// Container stage running the pipeline image
    pub fn container(command: Vec<String>, args: Vec<String>) -> Self {
        Self::Container {
            image: default_image(),
            command,
            args,
        }
    }

    /// Training job on the pipeline image with default machine shape
    pub fn training(args: Vec<String>) -> Self {
        Self::Training {
            image: default_image(),
            machine_type: default_machine_type(),
            replica_count: default_replica_count(),
            args,
        }
    }

    /// Every string that may carry `{{placeholder}}` references
    pub fn templated_strings(&self) -> Vec<&str> {
        match self {
            Self::Component { .. } => vec![],
            Self::Container {
                image,
                command,
                args,
            } => std::iter::once(image.as_str())
                .chain(command.iter().map(String::as_str))
                .chain(args.iter().map(String::as_str))
                .collect(),
            Self::Training {
                image,
                machine_type,
                args,
                ..
            } => [image.as_str(), machine_type.as_str()]
                .into_iter()
                .chain(args.iter().map(String::as_str))
                .collect(),
        }
    }
}

/// Built-in components available on the orchestrator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Ingest CSV data into examples
    ExampleGen,
    /// Compute dataset statistics
    StatisticsGen,
    /// Infer a schema from statistics
    SchemaGen,
    /// Check examples against the schema
    ExampleValidator,
    /// Feature engineering
    Transform,
    /// Model training
    Trainer,
    /// Model evaluation and blessing
    Evaluator,
    /// Push a blessed model to serving
    Pusher,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExampleGen => "example_gen",
            Self::StatisticsGen => "statistics_gen",
            Self::SchemaGen => "schema_gen",
            Self::ExampleValidator => "example_validator",
            Self::Transform => "transform",
            Self::Trainer => "trainer",
            Self::Evaluator => "evaluator",
            Self::Pusher => "pusher",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input specification for a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputRef {
    /// Named output of an earlier stage
    Stage {
        stage: String,
        output: String,
    },

    /// Data outside the pipeline (object storage URI, may contain placeholders)
    External {
        external: String,
    },
}

impl InputRef {
    /// Reference to `output` of `stage`
    pub fn from_stage(stage: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            output: output.into(),
        }
    }

    /// Reference to external data
    pub fn external(uri: impl Into<String>) -> Self {
        Self::External {
            external: uri.into(),
        }
    }

    /// Check if this input references another stage
    pub fn references_stage(&self) -> Option<(&str, &str)> {
        match self {
            Self::Stage { stage, output } => Some((stage, output)),
            Self::External { .. } => None,
        }
    }
}

impl std::fmt::Display for InputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stage { stage, output } => write!(f, "{}.{}", stage, output),
            Self::External { external } => f.write_str(external),
        }
    }
}
