// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for mlpipe.

pub mod compile;
pub mod deploy;
pub mod graph;
pub mod init;
pub mod stage_data;
pub mod status;
pub mod submit;
pub mod validate;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::{ClientOptions, HttpOrchestratorClient};
use crate::errors::MlpipeError;
use crate::pipeline::Pipeline;

/// Default pipeline definition file
pub const DEFAULT_PIPELINE_FILE: &str = "pipeline.yaml";

/// ML pipeline compiler and deployer
///
/// Define pipelines as stage graphs, compile them to archives and submit runs.
#[derive(Parser, Debug)]
#[clap(
    name = "mlpipe",
    version,
    about = "Define, compile and submit ML pipelines to a managed orchestrator",
    long_about = None,
    after_help = "Examples:\n\
        mlpipe init                         Create pipeline.yaml from the standard template\n\
        mlpipe compile -o build/            Compile pipeline.yaml into build/<PIPELINE_NAME>.yaml\n\
        mlpipe submit news.yaml -r run-1    Start a run of a compiled archive\n\
        mlpipe deploy --tag v1.0.0          Build, compile and submit for a release tag\n\n\
        Required environment: PROJECT_ID, REGION, IMAGE_URI, PIPELINE_NAME\n\
        See 'mlpipe <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a pipeline definition from the standard template
    Init {
        /// Overwrite an existing pipeline file
        #[clap(short, long)]
        force: bool,

        /// File to write
        #[clap(short, long, default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,
    },

    /// Compile a pipeline definition into an archive
    Compile {
        /// Pipeline definition
        #[clap(short, long, default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,

        /// Archive file, or directory to write `<PIPELINE_NAME>.yaml` into
        #[clap(short, long, default_value = ".")]
        output: PathBuf,

        /// Version label recorded in the archive and its file name
        #[clap(short, long)]
        tag: Option<String>,
    },

    /// Submit a compiled archive as a new run
    Submit {
        /// Archive produced by `mlpipe compile`
        archive: PathBuf,

        /// Run display name
        #[clap(short, long)]
        run_name: String,

        /// Parameter override (repeatable)
        #[clap(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        #[clap(flatten)]
        client: ClientArgs,
    },

    /// Show the state of a submitted run
    Status {
        /// Run id printed by `mlpipe submit`
        run_id: String,

        #[clap(flatten)]
        client: ClientArgs,
    },

    /// Validate a pipeline definition
    Validate {
        /// Pipeline file to validate
        #[clap(default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,
    },

    /// Show pipeline as a graph
    Graph {
        /// Pipeline file
        #[clap(default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Build the image, compile and submit in one go
    Deploy {
        /// Pipeline definition
        #[clap(short, long, default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,

        /// Trigger configuration (tag filter, image and run name templates)
        #[clap(long, value_name = "FILE")]
        trigger: Option<PathBuf>,

        /// Tag that triggered the deploy; omit for a manual deploy
        #[clap(long)]
        tag: Option<String>,

        /// Label used in place of a tag for manual deploys
        #[clap(long, conflicts_with = "tag")]
        label: Option<String>,

        /// Archive file or directory
        #[clap(short, long, default_value = ".")]
        output: PathBuf,

        /// Use the image reference as is instead of building it
        #[clap(long)]
        image_prebuilt: bool,

        /// Docker build context
        #[clap(long, default_value = ".")]
        context: PathBuf,

        /// Dockerfile, relative to the build context
        #[clap(long)]
        dockerfile: Option<PathBuf>,

        /// Parameter override (repeatable)
        #[clap(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        #[clap(flatten)]
        client: ClientArgs,
    },

    /// Upload local CSV files to the dataset bucket
    StageData {
        /// Files or glob patterns
        #[clap(required = true)]
        patterns: Vec<String>,

        /// Destination: a path, file://, http:// or https:// URI
        #[clap(short, long)]
        destination: String,

        /// Bearer token for HTTP destinations
        #[clap(long, env = "MLPIPE_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Request timeout in seconds
        #[clap(long, default_value = "60")]
        timeout: u64,
    },
}

/// Orchestrator connection arguments
#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Orchestrator base URL
    #[clap(long, env = "MLPIPE_ENDPOINT")]
    pub endpoint: String,

    /// Bearer token
    #[clap(long, env = "MLPIPE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[clap(long, env = "MLPIPE_TIMEOUT", default_value = "30")]
    pub timeout: u64,
}

impl ClientArgs {
    pub fn connect(&self) -> Result<HttpOrchestratorClient, MlpipeError> {
        HttpOrchestratorClient::new(
            &self.endpoint,
            ClientOptions {
                timeout: Duration::from_secs(self.timeout),
                token: self.token.clone(),
            },
        )
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

/// Parse `KEY=VALUE`
fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;

    if key.trim().is_empty() {
        return Err(format!("missing key in '{}'", s));
    }

    Ok((key.trim().to_string(), value.to_string()))
}

pub(crate) fn params_map(params: Vec<(String, String)>) -> BTreeMap<String, String> {
    params.into_iter().collect()
}

/// Load a pipeline file, with a hint when it does not exist
pub(crate) fn load_pipeline(path: &Path) -> miette::Result<Pipeline> {
    if !path.exists() {
        return Err(miette::miette!(
            "Pipeline file not found: {}\n\n\
             Run 'mlpipe init' to create one from the standard template.",
            path.display()
        ));
    }

    Pipeline::from_file(path).map_err(fail)
}

/// Print the recovery suggestion for `error`, then hand it to miette
pub(crate) fn fail(error: MlpipeError) -> miette::Report {
    if let Some(suggestion) = error.suggestion() {
        eprintln!();
        eprintln!("{}", suggestion.to_string().yellow());
    }
    error.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("train_steps=500").unwrap(),
            ("train_steps".to_string(), "500".to_string())
        );
        assert_eq!(
            parse_param("uri=gs://b/x?a=b").unwrap(),
            ("uri".to_string(), "gs://b/x?a=b".to_string())
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
