// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Process configuration
//!
//! The environment is read exactly once into an [`Environment`] snapshot.
//! Everything downstream receives that snapshot (or the validated
//! [`PipelineConfig`] built from it) explicitly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;

use crate::errors::MlpipeError;

/// Environment variable holding the cloud project identifier
pub const PROJECT_ID_VAR: &str = "PROJECT_ID";
/// Environment variable holding the compute region
pub const REGION_VAR: &str = "REGION";
/// Environment variable holding the trainer image reference
pub const IMAGE_URI_VAR: &str = "IMAGE_URI";
/// Environment variable holding the deployed pipeline name
pub const PIPELINE_NAME_VAR: &str = "PIPELINE_NAME";

/// Immutable snapshot of environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Capture the current process environment
    pub fn capture() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    /// Keep only the pairs whose name and value are valid UTF-8
    pub fn from_os_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        Self {
            vars: pairs
                .into_iter()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Build an environment from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a variable; blank values count as unset
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Look up a required variable
    pub fn require(&self, name: &str) -> Result<&str, MlpipeError> {
        self.get(name).ok_or_else(|| MlpipeError::MissingEnv {
            var: name.to_string(),
        })
    }

    /// Return a copy with `name` set to `value`
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

/// Required settings every compilation needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Cloud project identifier
    pub project_id: String,
    /// Compute region
    pub region: String,
    /// Container image used by custom stages
    pub image: String,
    /// Name the pipeline is deployed under; also names the archive
    pub pipeline_name: String,
}

impl PipelineConfig {
    /// Read and validate the required settings
    ///
    /// Fails on the first missing variable, in a fixed order, so error output
    /// is stable.
    pub fn from_env(env: &Environment) -> Result<Self, MlpipeError> {
        let config = Self {
            project_id: env.require(PROJECT_ID_VAR)?.to_string(),
            region: env.require(REGION_VAR)?.to_string(),
            image: env.require(IMAGE_URI_VAR)?.to_string(),
            pipeline_name: env.require(PIPELINE_NAME_VAR)?.to_string(),
        };
        config.validate()?;

        tracing::debug!(
            project = %config.project_id,
            region = %config.region,
            pipeline = %config.pipeline_name,
            "loaded pipeline configuration"
        );

        Ok(config)
    }

    /// Check value shapes that would otherwise only fail remotely
    pub fn validate(&self) -> Result<(), MlpipeError> {
        if !is_valid_name(&self.pipeline_name) {
            return Err(MlpipeError::InvalidConfig {
                reason: format!("pipeline name '{}' is not a valid name", self.pipeline_name),
                help: Some(
                    "Use lowercase letters, digits, '-' or '_', starting with a letter".into(),
                ),
            });
        }

        if self.region.contains(char::is_whitespace) {
            return Err(MlpipeError::invalid_config(format!(
                "region '{}' contains whitespace",
                self.region
            )));
        }

        Ok(())
    }

    /// Built-in parameter bindings that every pipeline can reference
    pub fn builtin_parameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("project".to_string(), self.project_id.clone()),
            ("region".to_string(), self.region.clone()),
            ("image".to_string(), self.image.clone()),
            ("pipeline_name".to_string(), self.pipeline_name.clone()),
        ])
    }
}

/// Names accepted for pipelines, stages, and outputs
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_env() -> Environment {
        Environment::from_pairs([
            (PROJECT_ID_VAR, "p1"),
            (REGION_VAR, "us-central1"),
            (IMAGE_URI_VAR, "gcr.io/p1/trainer:latest"),
            (PIPELINE_NAME_VAR, "news"),
        ])
    }

    #[test]
    fn test_from_env() {
        let config = PipelineConfig::from_env(&full_env()).unwrap();
        assert_eq!(config.project_id, "p1");
        assert_eq!(config.pipeline_name, "news");
        assert_eq!(config.builtin_parameters()["region"], "us-central1");
    }

    #[test]
    fn test_missing_variable_is_configuration_error() {
        let env = Environment::from_pairs([(PROJECT_ID_VAR, "p1")]);
        let err = PipelineConfig::from_env(&env).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, MlpipeError::MissingEnv { ref var } if var == REGION_VAR));
    }

    #[test]
    fn test_blank_variable_counts_as_missing() {
        let env = full_env().with(IMAGE_URI_VAR, "   ");
        let err = PipelineConfig::from_env(&env).unwrap_err();
        assert!(matches!(err, MlpipeError::MissingEnv { ref var } if var == IMAGE_URI_VAR));
    }

    #[test]
    fn test_invalid_pipeline_name() {
        let env = full_env().with(PIPELINE_NAME_VAR, "News Pipeline");
        let err = PipelineConfig::from_env(&env).unwrap_err();
        assert!(matches!(err, MlpipeError::InvalidConfig { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_variables_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let env = Environment::from_os_pairs([
            (OsString::from(PROJECT_ID_VAR), OsString::from("p1")),
            (OsString::from("BINARY"), OsString::from_vec(b"f\xffo".to_vec())),
            (OsString::from_vec(b"K\xff".to_vec()), OsString::from("v")),
        ]);
        assert_eq!(env.get(PROJECT_ID_VAR), Some("p1"));
        assert_eq!(env.get("BINARY"), None);
        assert_eq!(env, Environment::from_pairs([(PROJECT_ID_VAR, "p1")]));
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("news"));
        assert!(is_valid_name("schema_gen-2"));
        assert!(!is_valid_name("2news"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("News"));
    }
}
