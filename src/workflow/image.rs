// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Container image builders

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

use crate::errors::MlpipeError;

/// Produces the container image a deploy runs with
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Build and publish `reference`, returning the reference to use
    async fn build(&self, reference: &str) -> Result<String, MlpipeError>;

    /// Builder name for messages
    fn name(&self) -> &str;
}

/// Builds with `docker build` and publishes with `docker push`
pub struct DockerImageBuilder {
    docker_bin: PathBuf,
    context_dir: PathBuf,
    dockerfile: Option<PathBuf>,
    push: bool,
}

impl DockerImageBuilder {
    /// Locate `docker` on `PATH`
    pub fn new(context_dir: impl Into<PathBuf>) -> Result<Self, MlpipeError> {
        let docker_bin = which::which("docker").map_err(|_| MlpipeError::ToolFailed {
            tool: "docker".to_string(),
            error: "not found in PATH".to_string(),
            help: Some("Install Docker, or pass --image-prebuilt to skip the build".to_string()),
        })?;

        Ok(Self::with_binary(docker_bin, context_dir))
    }

    /// Use a specific docker-compatible binary
    pub fn with_binary(docker_bin: impl Into<PathBuf>, context_dir: impl Into<PathBuf>) -> Self {
        Self {
            docker_bin: docker_bin.into(),
            context_dir: context_dir.into(),
            dockerfile: None,
            push: true,
        }
    }

    pub fn with_dockerfile(mut self, dockerfile: impl Into<PathBuf>) -> Self {
        self.dockerfile = Some(dockerfile.into());
        self
    }

    /// Skip `docker push`
    pub fn local_only(mut self) -> Self {
        self.push = false;
        self
    }

    /// Run docker from the current directory; relative paths in `args` resolve there
    async fn run(&self, args: &[&str]) -> Result<(), MlpipeError> {
        let output = Command::new(&self.docker_bin)
            .args(args)
            .output()
            .await
            .map_err(|e| MlpipeError::ToolFailed {
                tool: "docker".to_string(),
                error: e.to_string(),
                help: None,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(MlpipeError::ToolFailed {
                tool: "docker".to_string(),
                error: format!(
                    "`docker {}` exited with {}: {}",
                    args.first().copied().unwrap_or_default(),
                    output.status.code().unwrap_or(-1),
                    stderr
                ),
                help: None,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ImageBuilder for DockerImageBuilder {
    async fn build(&self, reference: &str) -> Result<String, MlpipeError> {
        let context = self.context_dir.to_string_lossy().to_string();
        let dockerfile = self
            .dockerfile
            .as_ref()
            .map(|p| p.to_string_lossy().to_string());

        let mut args = vec!["build", "-t", reference];
        if let Some(file) = &dockerfile {
            args.push("-f");
            args.push(file);
        }
        args.push(&context);

        tracing::info!(image = %reference, context = %context, "building image");
        self.run(&args).await?;

        if self.push {
            tracing::info!(image = %reference, "pushing image");
            self.run(&["push", reference]).await?;
        }

        Ok(reference.to_string())
    }

    fn name(&self) -> &str {
        "docker"
    }
}

/// Uses an image that already exists
#[derive(Debug, Clone, Default)]
pub struct PrebuiltImage;

#[async_trait]
impl ImageBuilder for PrebuiltImage {
    async fn build(&self, reference: &str) -> Result<String, MlpipeError> {
        tracing::debug!(image = %reference, "using prebuilt image");
        Ok(reference.to_string())
    }

    fn name(&self) -> &str {
        "prebuilt"
    }
}
