// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest exporting a missing environment variable
    pub fn set_env(var: &str) -> Self {
        let example = match var {
            "PROJECT_ID" => "my-gcp-project",
            "REGION" => "us-central1",
            "IMAGE_URI" => "gcr.io/my-gcp-project/trainer:latest",
            "PIPELINE_NAME" => "news",
            _ => "...",
        };

        Self {
            action: format!("Set {}", var),
            steps: vec![
                format!("{} is read once at start-up and is required", var),
                "Export it in the shell or CI job that runs mlpipe".into(),
            ],
            commands: vec![format!("export {}={}", var, example)],
        }
    }

    /// Suggest fixing an input that points at an undeclared stage or output
    pub fn fix_unknown_input(stage: &str, reference: &str) -> Self {
        Self {
            action: format!("Fix the inputs of stage '{}'", stage),
            steps: vec![
                format!("'{}' is not an output of any earlier stage", reference),
                "Declare the producing stage before its consumers".into(),
                "Check the output name against the producer's `outputs` list".into(),
            ],
            commands: vec![
                "# Show the stages and their dependencies:".into(),
                "mlpipe graph --format text".into(),
            ],
        }
    }

    /// Suggest checking the orchestrator endpoint
    pub fn check_endpoint(endpoint: &str) -> Self {
        Self {
            action: "Check the orchestrator endpoint".into(),
            steps: vec![
                format!("No response from {}", endpoint),
                "Verify the URL passed with --endpoint or MLPIPE_ENDPOINT".into(),
            ],
            commands: vec![format!("curl -sS {}/api/v1/runs", endpoint)],
        }
    }

    /// Suggest recompiling a damaged or outdated archive
    pub fn recompile() -> Self {
        Self {
            action: "Recompile the pipeline archive".into(),
            steps: vec![
                "The archive was edited by hand or produced by another version".into(),
            ],
            commands: vec!["mlpipe compile --pipeline pipeline.yaml --output .".into()],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_env_display() {
        let text = RecoverySuggestion::set_env("REGION").to_string();
        assert!(text.starts_with("→ Set REGION"));
        assert!(text.contains("export REGION=us-central1"));
    }
}
