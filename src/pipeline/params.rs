// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Parameter binding and `{{placeholder}}` substitution

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::config::{Environment, PipelineConfig};
use crate::errors::MlpipeError;
use crate::pipeline::Pipeline;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
    })
}

/// Names referenced by `{{name}}` placeholders in `template`
pub fn placeholders(template: &str) -> Vec<&str> {
    placeholder_regex()
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Parameter values resolved for one compilation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterBindings {
    values: BTreeMap<String, String>,
}

impl ParameterBindings {
    /// Resolve built-in and declared parameters
    ///
    /// Built-ins come from `config`. Declared parameters take the value of
    /// their environment variable when set, else their default. A declared
    /// parameter with neither is a configuration error.
    pub fn resolve(
        pipeline: &Pipeline,
        config: &PipelineConfig,
        env: &Environment,
    ) -> Result<Self, MlpipeError> {
        let mut values = config.builtin_parameters();

        for (name, param) in &pipeline.parameters {
            let from_env = param.env.as_deref().and_then(|var| env.get(var));

            let value = match (from_env, &param.default) {
                (Some(v), _) => v.to_string(),
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    let help = match &param.env {
                        Some(var) => Some(format!("Set the {} environment variable", var)),
                        None => Some("Give the parameter an `env` source or a `default`".into()),
                    };
                    return Err(MlpipeError::MissingParameter {
                        name: name.clone(),
                        help,
                    });
                }
            };

            tracing::debug!(parameter = %name, "bound parameter");
            values.insert(name.clone(), value);
        }

        Ok(Self { values })
    }

    /// Bindings from explicit values
    pub fn from_values(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn into_values(self) -> BTreeMap<String, String> {
        self.values
    }

    /// Replace every `{{name}}` in `template`
    pub fn substitute(&self, template: &str) -> Result<String, MlpipeError> {
        if let Some(missing) = placeholders(template)
            .into_iter()
            .find(|name| !self.values.contains_key(*name))
        {
            return Err(MlpipeError::InvalidPipeline {
                reason: format!("unknown parameter '{{{{{}}}}}' in '{}'", missing, template),
                help: Some("Declare it under `parameters`".into()),
            });
        }

        Ok(placeholder_regex()
            .replace_all(template, |caps: &regex::Captures<'_>| {
                self.values[&caps[1]].clone()
            })
            .into_owned())
    }
}
