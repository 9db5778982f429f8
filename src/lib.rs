// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! # mlpipe - ML pipeline compiler and deployer
//!
//! `mlpipe` defines training pipelines as stage graphs, compiles them into
//! versioned archives and submits runs to a managed orchestrator.
//!
//! ## Features
//!
//! - **Acyclic by construction** - stages may only consume outputs of earlier stages
//! - **Deterministic archives** - identical inputs compile to identical bytes
//! - **Explicit configuration** - environment is read once and passed around
//! - **Deploy workflow** - image build, compile and submit as a state machine
//!
//! ## Quick Start
//!
//! ```bash
//! # Write pipeline.yaml from the standard template
//! mlpipe init
//!
//! # Compile it into <PIPELINE_NAME>.yaml
//! mlpipe compile -o build/
//!
//! # Start a run
//! mlpipe submit build/news.yaml --run-name run-1 --endpoint https://orchestrator
//! ```

pub mod cli;
pub mod client;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod staging;
pub mod utils;
pub mod workflow;

// Re-export commonly used types
pub use client::{OrchestratorClient, RunHandle, SubmitRequest};
pub use compiler::{CompileContext, CompiledArchive, Compiler, YamlCompiler};
pub use config::{Environment, PipelineConfig};
pub use errors::{ErrorKind, MlpipeError, MlpipeResult};
pub use pipeline::{Pipeline, Stage};
pub use workflow::{DeployWorkflow, Trigger, WorkflowState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
