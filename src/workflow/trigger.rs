// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Deploy triggers and template substitution

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use crate::config::{PipelineConfig, PIPELINE_NAME_VAR, PROJECT_ID_VAR, REGION_VAR};
use crate::errors::MlpipeError;

/// Substitution variable holding the tag (or manual label)
pub const TAG_NAME_VAR: &str = "TAG_NAME";

/// What started a deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Started by hand, optionally with a label standing in for the tag
    Manual { label: Option<String> },
    /// A source tag was created
    TagCreated { tag: String },
}

impl Trigger {
    pub fn manual() -> Self {
        Self::Manual { label: None }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self::TagCreated { tag: tag.into() }
    }

    /// Value of `TAG_NAME` for this trigger
    ///
    /// Unlabelled manual triggers get `manual-<UTC timestamp>`.
    pub fn tag_name(&self) -> String {
        match self {
            Self::TagCreated { tag } => tag.clone(),
            Self::Manual { label: Some(label) } => label.clone(),
            Self::Manual { label: None } => {
                format!("manual-{}", chrono::Utc::now().format("%Y%m%d%H%M%S"))
            }
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual { label: Some(label) } => write!(f, "manual ({})", label),
            Self::Manual { label: None } => write!(f, "manual"),
            Self::TagCreated { tag } => write!(f, "tag {}", tag),
        }
    }
}

fn default_run_name() -> String {
    "${PIPELINE_NAME}-${TAG_NAME}".to_string()
}

/// Trigger configuration, usually loaded from `trigger.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub name: String,

    /// Regex a tag must match to start a deploy; unset accepts every tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_filter: Option<String>,

    /// Image reference template; unset uses `IMAGE_URI` as is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default = "default_run_name")]
    pub run_name: String,

    /// User variables, each named `_UPPER_CASE`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub substitutions: BTreeMap<String, String>,
}

impl TriggerConfig {
    /// Accept every trigger with default templates
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag_filter: None,
            image: None,
            run_name: default_run_name(),
            substitutions: BTreeMap::new(),
        }
    }

    pub fn with_tag_filter(mut self, filter: impl Into<String>) -> Self {
        self.tag_filter = Some(filter.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn from_file(path: &Path) -> Result<Self, MlpipeError> {
        let content = std::fs::read_to_string(path).map_err(|e| MlpipeError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, MlpipeError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MlpipeError> {
        if self.name.trim().is_empty() {
            return Err(MlpipeError::invalid_config("trigger name must not be empty"));
        }

        self.filter()?;

        for key in self.substitutions.keys() {
            if !is_user_variable(key) {
                return Err(MlpipeError::InvalidConfig {
                    reason: format!("substitution '{}' is not a user variable", key),
                    help: Some(
                        "User substitutions start with '_' followed by A-Z, 0-9 or '_'".into(),
                    ),
                });
            }
        }

        Ok(())
    }

    fn filter(&self) -> Result<Option<Regex>, MlpipeError> {
        self.tag_filter
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| MlpipeError::InvalidConfig {
                    reason: format!("invalid tag filter '{}': {}", pattern, e),
                    help: None,
                })
            })
            .transpose()
    }

    /// Whether `trigger` should start a deploy
    pub fn matches(&self, trigger: &Trigger) -> Result<bool, MlpipeError> {
        match trigger {
            Trigger::Manual { .. } => Ok(true),
            Trigger::TagCreated { tag } => Ok(self.filter()?.map_or(true, |re| re.is_match(tag))),
        }
    }

    /// Variables available to templates
    pub fn variables(&self, tag_name: &str, config: &PipelineConfig) -> BTreeMap<String, String> {
        let mut vars = self.substitutions.clone();
        vars.insert(TAG_NAME_VAR.to_string(), tag_name.to_string());
        vars.insert(PROJECT_ID_VAR.to_string(), config.project_id.clone());
        vars.insert(REGION_VAR.to_string(), config.region.clone());
        vars.insert(PIPELINE_NAME_VAR.to_string(), config.pipeline_name.clone());
        vars
    }

    /// Image reference for this deploy
    pub fn image_reference(
        &self,
        vars: &BTreeMap<String, String>,
        config: &PipelineConfig,
    ) -> Result<String, MlpipeError> {
        match &self.image {
            Some(template) => expand(template, vars),
            None => Ok(config.image.clone()),
        }
    }

    pub fn run_name(&self, vars: &BTreeMap<String, String>) -> Result<String, MlpipeError> {
        expand(&self.run_name, vars)
    }
}

fn is_user_variable(key: &str) -> bool {
    let mut chars = key.chars();
    chars.next() == Some('_')
        && key.len() > 1
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn variable_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\$|\$\{([A-Z_][A-Z0-9_]*)\}|\$([A-Z_][A-Z0-9_]*)").expect("valid regex")
    })
}

/// Expand `$VAR` and `${VAR}` in `template`; `$$` is a literal `$`
///
/// Unknown variables are a configuration error.
pub fn expand(template: &str, vars: &BTreeMap<String, String>) -> Result<String, MlpipeError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in variable_regex().captures_iter(template) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        out.push_str(&template[last..whole.start]);
        out.push_str(&lookup(&caps, vars)?);
        last = whole.end;
    }
    out.push_str(&template[last..]);

    Ok(out)
}

fn lookup(caps: &Captures<'_>, vars: &BTreeMap<String, String>) -> Result<String, MlpipeError> {
    let Some(name) = caps.get(1).or_else(|| caps.get(2)) else {
        return Ok("$".to_string());
    };

    vars.get(name.as_str())
        .cloned()
        .ok_or_else(|| MlpipeError::InvalidConfig {
            reason: format!("unknown substitution variable '{}'", name.as_str()),
            help: Some(format!(
                "Available: {}",
                vars.keys().cloned().collect::<Vec<_>>().join(", ")
            )),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig {
            project_id: "p1".into(),
            region: "us-central1".into(),
            image: "gcr.io/p1/trainer:latest".into(),
            pipeline_name: "news".into(),
        }
    }

    #[test]
    fn test_expand_forms() {
        let vars = BTreeMap::from([
            ("TAG_NAME".to_string(), "v1.0.0".to_string()),
            ("PROJECT_ID".to_string(), "p1".to_string()),
        ]);

        assert_eq!(
            expand("gcr.io/$PROJECT_ID/trainer:${TAG_NAME}", &vars).unwrap(),
            "gcr.io/p1/trainer:v1.0.0"
        );
        assert_eq!(expand("cost: $$5", &vars).unwrap(), "cost: $5");
        assert_eq!(expand("no vars", &vars).unwrap(), "no vars");

        let err = expand("${MISSING}", &vars).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_tag_filter() {
        let trigger = TriggerConfig::new("release").with_tag_filter(r"^v\d+\.\d+\.\d+$");

        assert!(trigger.matches(&Trigger::tag("v1.2.3")).unwrap());
        assert!(!trigger.matches(&Trigger::tag("nightly")).unwrap());
        assert!(trigger.matches(&Trigger::manual()).unwrap());

        assert!(TriggerConfig::new("any").matches(&Trigger::tag("x")).unwrap());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
name: release
tag_filter: "^v"
image: "gcr.io/${PROJECT_ID}/trainer:${TAG_NAME}"
substitutions:
  _SUFFIX: canary
run_name: "${PIPELINE_NAME}-${TAG_NAME}-${_SUFFIX}"
"#;
        let trigger = TriggerConfig::from_yaml(yaml).unwrap();
        let vars = trigger.variables("v2", &config());

        assert_eq!(
            trigger.image_reference(&vars, &config()).unwrap(),
            "gcr.io/p1/trainer:v2"
        );
        assert_eq!(trigger.run_name(&vars).unwrap(), "news-v2-canary");
    }

    #[test]
    fn test_defaults() {
        let trigger = TriggerConfig::from_yaml("name: manual").unwrap();
        let vars = trigger.variables("v3", &config());

        assert_eq!(
            trigger.image_reference(&vars, &config()).unwrap(),
            "gcr.io/p1/trainer:latest"
        );
        assert_eq!(trigger.run_name(&vars).unwrap(), "news-v3");
    }

    #[test]
    fn test_validation() {
        assert!(TriggerConfig::from_yaml("name: x\ntag_filter: \"[\"").is_err());
        assert!(TriggerConfig::from_yaml("name: x\nsubstitutions:\n  lower: a").is_err());
        assert!(TriggerConfig::from_yaml("name: \"\"").is_err());
    }

    #[test]
    fn test_tag_name() {
        assert_eq!(Trigger::tag("v1").tag_name(), "v1");
        assert_eq!(
            Trigger::Manual {
                label: Some("hotfix".into())
            }
            .tag_name(),
            "hotfix"
        );
        assert!(Trigger::manual().tag_name().starts_with("manual-"));
    }
}
