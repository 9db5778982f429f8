// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Stage-data command - upload dataset files

use colored::Colorize;
use miette::Result;
use std::time::Duration;

use super::fail;
use crate::staging::{open_store, DatasetStager};
use crate::utils::create_spinner;

/// Run the stage-data command
pub async fn run(
    patterns: Vec<String>,
    destination: String,
    token: Option<String>,
    timeout: u64,
    verbose: bool,
) -> Result<()> {
    let store = open_store(&destination, token, Duration::from_secs(timeout)).map_err(fail)?;
    let stager = DatasetStager::new(store);

    let cwd = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;

    let spinner = create_spinner(&format!("Staging to {}...", stager.destination()));
    let result = stager.stage(&patterns, &cwd).await;
    spinner.finish_and_clear();

    let staged = result.map_err(fail)?;
    let total: u64 = staged.iter().map(|o| o.bytes).sum();

    for object in &staged {
        eprintln!("  {} {}", "✓".green(), object.uri);
        if verbose {
            eprintln!("    {} bytes, digest {}", object.bytes, object.digest.dimmed());
        }
    }

    eprintln!();
    eprintln!(
        "{}",
        format!("Staged {} file(s), {} bytes", staged.len(), total)
            .green()
            .bold()
    );
    Ok(())
}
