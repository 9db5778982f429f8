// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Graph command - visualize pipeline as a graph

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{fail, load_pipeline, GraphFormat};
use crate::pipeline::DagBuilder;

/// Run the graph command
pub async fn run(pipeline_path: PathBuf, format: GraphFormat, verbose: bool) -> Result<()> {
    let pipeline = load_pipeline(&pipeline_path)?;
    let dag = DagBuilder::build(&pipeline).map_err(fail)?;

    let output = match format {
        GraphFormat::Text => dag.to_text(&pipeline),
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    };

    print!("{}", output);

    if verbose && format == GraphFormat::Text {
        println!();
        println!("{}:", "Tiers".bold());
        for (i, tier) in dag.tiers().iter().enumerate() {
            println!("  {}: {}", i, tier.join(", "));
        }
    }

    Ok(())
}
