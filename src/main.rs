// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! mlpipe - ML pipeline compiler and deployer

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mlpipe::cli::deploy::DeployOptions;
use mlpipe::cli::{Cli, Commands};
use mlpipe::config::Environment;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "mlpipe=debug" } else { "mlpipe=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let env = Environment::capture();

    match cli.command {
        Commands::Init { force, pipeline } => {
            mlpipe::cli::init::run(pipeline, force, cli.verbose).await
        }
        Commands::Compile {
            pipeline,
            output,
            tag,
        } => mlpipe::cli::compile::run(pipeline, output, tag, &env, cli.verbose).await,
        Commands::Submit {
            archive,
            run_name,
            params,
            client,
        } => mlpipe::cli::submit::run(archive, run_name, params, client, cli.verbose).await,
        Commands::Status { run_id, client } => {
            mlpipe::cli::status::run(run_id, client, cli.verbose).await
        }
        Commands::Validate { pipeline } => {
            mlpipe::cli::validate::run(pipeline, cli.verbose).await
        }
        Commands::Graph { pipeline, format } => {
            mlpipe::cli::graph::run(pipeline, format, cli.verbose).await
        }
        Commands::Deploy {
            pipeline,
            trigger,
            tag,
            label,
            output,
            image_prebuilt,
            context,
            dockerfile,
            params,
            client,
        } => {
            let options = DeployOptions {
                pipeline,
                trigger,
                tag,
                label,
                output,
                image_prebuilt,
                context,
                dockerfile,
                params,
                client,
            };
            mlpipe::cli::deploy::run(options, &env, cli.verbose).await
        }
        Commands::StageData {
            patterns,
            destination,
            token,
            timeout,
        } => {
            mlpipe::cli::stage_data::run(patterns, destination, token, timeout, cli.verbose).await
        }
    }
}
