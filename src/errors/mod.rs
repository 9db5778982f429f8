// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Error types
//!
//! Every failure is classified into one of a few kinds so callers (and the
//! deploy workflow) can tell configuration problems from malformed graphs and
//! from network trouble without matching on individual variants.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::workflow::BuildStep;

/// Result type for mlpipe operations
pub type MlpipeResult<T> = Result<T, MlpipeError>;

/// Coarse classification of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid parameter/environment value, detected before any network call
    Configuration,
    /// Malformed graph or archive, detected locally or rejected by the orchestrator
    Validation,
    /// Network or authorization failure talking to a remote service
    Transport,
    /// Local filesystem failure
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Validation => write!(f, "validation"),
            Self::Transport => write!(f, "transport"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// Main error type for mlpipe
#[derive(Error, Debug, Diagnostic)]
pub enum MlpipeError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Required environment variable '{var}' is not set")]
    #[diagnostic(
        code(mlpipe::missing_env),
        help("Export {var} before running, e.g. `export {var}=...`")
    )]
    MissingEnv { var: String },

    #[error("Parameter '{name}' has no value")]
    #[diagnostic(code(mlpipe::missing_parameter))]
    MissingParameter {
        name: String,
        #[help]
        help: Option<String>,
    },

    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(mlpipe::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("No dataset files matched pattern: {pattern}")]
    #[diagnostic(
        code(mlpipe::no_dataset_files),
        help("Check that files matching '{pattern}' exist")
    )]
    NoDatasetFiles { pattern: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Validation Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid pipeline: {reason}")]
    #[diagnostic(code(mlpipe::invalid_pipeline))]
    InvalidPipeline {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Stage '{stage}' references undeclared input '{reference}'")]
    #[diagnostic(
        code(mlpipe::unknown_input),
        help("Inputs may only reference outputs of stages declared earlier in the pipeline")
    )]
    UnknownInput { stage: String, reference: String },

    #[error("Stage '{stage}' is declared more than once")]
    #[diagnostic(code(mlpipe::duplicate_stage))]
    DuplicateStage { stage: String },

    #[error("Stage '{stage}' not found in pipeline")]
    #[diagnostic(code(mlpipe::stage_not_found))]
    StageNotFound { stage: String },

    #[error("Malformed archive '{path}': {reason}")]
    #[diagnostic(
        code(mlpipe::malformed_archive),
        help("Recompile the pipeline with 'mlpipe compile'")
    )]
    MalformedArchive { path: PathBuf, reason: String },

    #[error("Orchestrator rejected the request (status {status}): {message}")]
    #[diagnostic(code(mlpipe::rejected))]
    Rejected { status: u16, message: String },

    #[error("Invalid dataset file '{path}': {reason}")]
    #[diagnostic(code(mlpipe::invalid_dataset))]
    InvalidDataset { path: PathBuf, reason: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(mlpipe::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(mlpipe::json_error))]
    Json { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Transport Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Could not reach '{endpoint}': {reason}")]
    #[diagnostic(code(mlpipe::unreachable))]
    Unreachable {
        endpoint: String,
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Credentials rejected by '{endpoint}' (status {status})")]
    #[diagnostic(
        code(mlpipe::unauthorized),
        help("Check the token passed with --token or MLPIPE_TOKEN")
    )]
    Unauthorized { endpoint: String, status: u16 },

    #[error("Remote call failed: {message}")]
    #[diagnostic(code(mlpipe::remote_failure))]
    RemoteFailure { status: Option<u16>, message: String },

    #[error("Tool '{tool}' failed: {error}")]
    #[diagnostic(code(mlpipe::tool_failed))]
    ToolFailed {
        tool: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Workflow
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Workflow failed while {step}")]
    #[diagnostic(code(mlpipe::workflow_failed))]
    StepFailed {
        step: BuildStep,
        #[source]
        source: Box<MlpipeError>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(mlpipe::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(mlpipe::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(mlpipe::io_error))]
    Io { message: String },
}

impl From<std::io::Error> for MlpipeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for MlpipeError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for MlpipeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl MlpipeError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingEnv { .. }
            | Self::MissingParameter { .. }
            | Self::InvalidConfig { .. }
            | Self::NoDatasetFiles { .. } => ErrorKind::Configuration,

            Self::InvalidPipeline { .. }
            | Self::UnknownInput { .. }
            | Self::DuplicateStage { .. }
            | Self::StageNotFound { .. }
            | Self::MalformedArchive { .. }
            | Self::Rejected { .. }
            | Self::InvalidDataset { .. }
            | Self::Yaml { .. }
            | Self::Json { .. } => ErrorKind::Validation,

            Self::Unreachable { .. }
            | Self::Unauthorized { .. }
            | Self::RemoteFailure { .. }
            | Self::ToolFailed { .. } => ErrorKind::Transport,

            Self::StepFailed { source, .. } => source.kind(),

            Self::FileReadError { .. } | Self::FileWriteError { .. } | Self::Io { .. } => {
                ErrorKind::Io
            }
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Error for a pipeline-level problem with no extra hint
    pub fn invalid_pipeline(reason: impl Into<String>) -> Self {
        Self::InvalidPipeline {
            reason: reason.into(),
            help: None,
        }
    }

    /// Error for an invalid configuration value with no extra hint
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
            help: None,
        }
    }

    /// Wrap a step failure, keeping the underlying kind
    pub fn step_failed(step: BuildStep, source: MlpipeError) -> Self {
        Self::StepFailed {
            step,
            source: Box::new(source),
        }
    }

    /// Translate a reqwest failure into a transport error for `endpoint`
    pub fn from_http(endpoint: &str, e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            let help = if e.is_timeout() {
                Some("The request timed out; raise --timeout or check the endpoint".to_string())
            } else {
                Some("Check that the endpoint URL is correct and the service is up".to_string())
            };
            Self::Unreachable {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
                help,
            }
        } else {
            Self::RemoteFailure {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            }
        }
    }

    /// Recovery hint for this error, if one applies
    pub fn suggestion(&self) -> Option<RecoverySuggestion> {
        match self {
            Self::MissingEnv { var } => Some(RecoverySuggestion::set_env(var)),
            Self::UnknownInput { stage, reference } => {
                Some(RecoverySuggestion::fix_unknown_input(stage, reference))
            }
            Self::Unreachable { endpoint, .. } => {
                Some(RecoverySuggestion::check_endpoint(endpoint))
            }
            Self::MalformedArchive { .. } => Some(RecoverySuggestion::recompile()),
            Self::StepFailed { source, .. } => source.suggestion(),
            _ => None,
        }
    }
}
