// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Status command - read a run back from the orchestrator

use colored::Colorize;
use miette::Result;

use super::{fail, ClientArgs};
use crate::client::{OrchestratorClient, RunState};

/// Run the status command
pub async fn run(run_id: String, client: ClientArgs, verbose: bool) -> Result<()> {
    let client = client.connect().map_err(fail)?;
    let run = client.get_run(&run_id).await.map_err(fail)?;

    let state = match run.state {
        RunState::Succeeded => run.state.to_string().green(),
        RunState::Failed | RunState::Cancelled => run.state.to_string().red(),
        RunState::Pending | RunState::Running => run.state.to_string().yellow(),
    };

    println!("{} {}", run.run_name.bold(), state);
    println!("  id:       {}", run.run_id);
    println!("  pipeline: {}", run.pipeline_name);
    if let Some(created) = run.created_at {
        println!("  created:  {}", created.to_rfc3339());
    }

    if verbose && !run.parameters.is_empty() {
        println!("  parameters:");
        for (name, value) in &run.parameters {
            println!("    {} = {}", name.cyan(), value);
        }
    }

    Ok(())
}
