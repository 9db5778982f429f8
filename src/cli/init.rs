// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Init command - write the standard pipeline definition

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};

use super::fail;
use crate::pipeline::standard_pipeline;

const TRIGGER_FILE: &str = "trigger.yaml";

const TRIGGER_TEMPLATE: &str = r#"# mlpipe deploy trigger
name: release

# Only tags matching this pattern start a deploy
tag_filter: '^v\d+\.\d+\.\d+$'

# $TAG_NAME, $PROJECT_ID, $REGION, $PIPELINE_NAME and _USER variables are available
image: "gcr.io/${PROJECT_ID}/trainer:${TAG_NAME}"
run_name: "${PIPELINE_NAME}-${TAG_NAME}"

substitutions: {}
"#;

/// Run the init command
pub async fn run(pipeline_path: PathBuf, force: bool, verbose: bool) -> Result<()> {
    println!("{}", "Initializing mlpipe project...".bold());
    println!();

    if pipeline_path.exists() && !force {
        return Err(miette::miette!(
            "{} already exists. Use --force to overwrite.",
            pipeline_path.display()
        ));
    }

    let pipeline = standard_pipeline().map_err(fail)?;
    let content = format!(
        "# mlpipe pipeline definition\n\
         # Placeholders: {{{{project}}}}, {{{{region}}}}, {{{{image}}}}, {{{{pipeline_name}}}}\n\
         # and every declared parameter\n\n{}",
        pipeline.to_yaml().map_err(fail)?
    );

    write_file(&pipeline_path, &content)?;
    println!("  {} Created {}", "✓".green(), pipeline_path.display());

    let trigger_path = pipeline_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(TRIGGER_FILE);
    if !trigger_path.exists() {
        write_file(&trigger_path, TRIGGER_TEMPLATE)?;
        println!("  {} Created {}", "✓".green(), trigger_path.display());
    }

    println!();
    println!("{}", "Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Export {} and {}",
        "PROJECT_ID REGION IMAGE_URI PIPELINE_NAME".cyan(),
        "DATA_ROOT".cyan()
    );
    println!("  2. Edit {} to fit your model", pipeline_path.display().to_string().cyan());
    println!("  3. Run {} to build an archive", "mlpipe compile".cyan());
    println!();

    if verbose {
        println!("{}", "Generated pipeline:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .map_err(|e| miette::miette!("Failed to write {}: {}", path.display(), e))
}
