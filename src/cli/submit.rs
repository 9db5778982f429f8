// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Submit command - start a run of a compiled archive

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{fail, params_map, ClientArgs};
use crate::client::{OrchestratorClient, SubmitRequest};
use crate::compiler::CompiledArchive;
use crate::utils::create_spinner;

/// Run the submit command
pub async fn run(
    archive_path: PathBuf,
    run_name: String,
    params: Vec<(String, String)>,
    client: ClientArgs,
    verbose: bool,
) -> Result<()> {
    let archive = CompiledArchive::load(&archive_path).map_err(fail)?;
    let request = SubmitRequest::new(archive, run_name).with_parameters(params_map(params));
    request.validate().map_err(fail)?;

    let client = client.connect().map_err(fail)?;

    let spinner = create_spinner(&format!("Submitting to {}...", client.endpoint()));
    let result = client.submit(&request).await;
    spinner.finish_and_clear();

    let handle = result.map_err(fail)?;

    eprintln!(
        "  {} Submitted {} as {}",
        "✓".green(),
        request.archive.pipeline_name().bold(),
        handle.run_name.cyan()
    );
    if verbose {
        eprintln!("    state: {}", handle.state);
    }

    println!("{}", handle.run_id);
    Ok(())
}
