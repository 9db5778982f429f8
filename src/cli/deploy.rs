// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Deploy command - build image, compile and submit

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{fail, load_pipeline, params_map, ClientArgs};
use crate::compiler::YamlCompiler;
use crate::config::{Environment, PipelineConfig};
use crate::utils::create_spinner;
use crate::workflow::{
    DeployContext, DeployWorkflow, DockerImageBuilder, ImageBuilder, PrebuiltImage, Trigger,
    TriggerConfig, WorkflowState,
};

/// Options for the deploy command
#[derive(Debug)]
pub struct DeployOptions {
    pub pipeline: PathBuf,
    pub trigger: Option<PathBuf>,
    pub tag: Option<String>,
    pub label: Option<String>,
    pub output: PathBuf,
    pub image_prebuilt: bool,
    pub context: PathBuf,
    pub dockerfile: Option<PathBuf>,
    pub params: Vec<(String, String)>,
    pub client: ClientArgs,
}

/// Run the deploy command
pub async fn run(options: DeployOptions, env: &Environment, verbose: bool) -> Result<()> {
    let config = PipelineConfig::from_env(env).map_err(fail)?;
    let pipeline = load_pipeline(&options.pipeline)?;

    let trigger_config = match &options.trigger {
        Some(path) => TriggerConfig::from_file(path).map_err(fail)?,
        None => TriggerConfig::new("manual"),
    };

    let trigger = match options.tag {
        Some(tag) => Trigger::TagCreated { tag },
        None => Trigger::Manual {
            label: options.label,
        },
    };

    let images: Box<dyn ImageBuilder> = if options.image_prebuilt {
        Box::new(PrebuiltImage)
    } else {
        let mut builder = DockerImageBuilder::new(&options.context).map_err(fail)?;
        if let Some(dockerfile) = options.dockerfile {
            builder = builder.with_dockerfile(dockerfile);
        }
        Box::new(builder)
    };

    let client = options.client.connect().map_err(fail)?;

    let spinner = create_spinner("Starting deploy...");
    let progress = spinner.clone();
    let workflow = DeployWorkflow::new(
        images,
        Box::new(YamlCompiler::new()),
        Box::new(client),
        trigger_config,
    )
    .with_observer(move |state: &WorkflowState| {
        if let Some(step) = state.step() {
            progress.set_message(format!("{}...", step));
        }
    });

    let context = DeployContext {
        config,
        env: env.clone(),
        output: options.output,
        parameters: params_map(options.params),
    };

    let result = workflow.run(&trigger, &pipeline, &context).await;
    spinner.finish_and_clear();
    let report = result.map_err(fail)?;

    if report.is_ignored() {
        eprintln!(
            "  {} {} does not match the trigger filter; nothing deployed",
            "○".dimmed(),
            trigger
        );
        return Ok(());
    }

    if let Some(image) = &report.image {
        eprintln!("  {} Image {}", "✓".green(), image.cyan());
    }
    if let Some(archive) = &report.archive {
        eprintln!("  {} Archive {}", "✓".green(), archive.path().display());
        if verbose {
            eprintln!("    digest: {}", archive.digest().dimmed());
        }
    }
    if let WorkflowState::Failed { step, reason } = &report.state {
        eprintln!("  {} Failed while {}: {}", "✗".red(), step, reason.dimmed());
    }

    if let Some(run) = report.into_result().map_err(fail)? {
        eprintln!("  {} Submitted run {}", "✓".green(), run.run_name.cyan());
        println!("{}", run.run_id);
    }

    Ok(())
}
