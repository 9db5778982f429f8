// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Compile command - turn a pipeline definition into an archive

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{fail, load_pipeline};
use crate::compiler::{CompileContext, Compiler, YamlCompiler};
use crate::config::{Environment, PipelineConfig};

/// Run the compile command
pub async fn run(
    pipeline_path: PathBuf,
    output: PathBuf,
    tag: Option<String>,
    env: &Environment,
    verbose: bool,
) -> Result<()> {
    let config = PipelineConfig::from_env(env).map_err(fail)?;
    let pipeline = load_pipeline(&pipeline_path)?;

    let mut context = CompileContext::new(config, env.clone());
    if let Some(tag) = tag {
        context = context.with_version_tag(tag);
    }

    let archive = YamlCompiler::new()
        .compile(&pipeline, &context, &output)
        .map_err(fail)?;

    eprintln!(
        "  {} Compiled {} ({} stages)",
        "✓".green(),
        archive.pipeline_name().bold(),
        pipeline.stages.len()
    );

    if verbose {
        eprintln!("    digest: {}", archive.digest().dimmed());
        for (name, value) in archive.parameters() {
            eprintln!("    {} = {}", name.cyan(), value);
        }
    }

    println!("{}", archive.path().display());
    Ok(())
}
