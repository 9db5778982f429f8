// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Pipeline compiler
//!
//! Turns a validated [`Pipeline`] plus resolved parameters into a versioned
//! archive file the orchestrator can run.

mod descriptor;
mod digest;

pub use descriptor::{
    component_id, ArchiveFile, CompiledArchive, ComponentSpec, DagSpec, PipelineInfo, TaskInput,
    TaskSpec, WorkflowDescriptor, SCHEMA_VERSION,
};
pub use digest::{digest_bytes, digest_file, digest_value, ContentHasher};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{Environment, PipelineConfig};
use crate::errors::MlpipeError;
use crate::pipeline::{
    DagBuilder, Executor, InputRef, ParameterBindings, Pipeline, PipelineValidator,
};

/// Everything besides the pipeline that a compilation depends on
#[derive(Debug, Clone)]
pub struct CompileContext {
    pub config: PipelineConfig,
    pub env: Environment,
    /// Version label, usually the release tag
    pub version_tag: Option<String>,
}

impl CompileContext {
    pub fn new(config: PipelineConfig, env: Environment) -> Self {
        Self {
            config,
            env,
            version_tag: None,
        }
    }

    pub fn with_version_tag(mut self, tag: impl Into<String>) -> Self {
        self.version_tag = Some(tag.into());
        self
    }

    /// Archive file name: `<pipeline_name>[-<tag>].yaml`
    pub fn archive_file_name(&self) -> String {
        match &self.version_tag {
            Some(tag) => format!("{}-{}.yaml", self.config.pipeline_name, sanitize_tag(tag)),
            None => format!("{}.yaml", self.config.pipeline_name),
        }
    }

    /// Where the archive goes
    ///
    /// `output` names the archive file itself only when it carries a `.yaml`
    /// or `.yml` extension and is not an existing directory. Anything else,
    /// including a path ending in a separator, is a directory that receives
    /// [`archive_file_name`](Self::archive_file_name).
    pub fn archive_path(&self, output: &Path) -> PathBuf {
        if names_directory(output) {
            output.join(self.archive_file_name())
        } else {
            output.to_path_buf()
        }
    }
}

fn names_directory(output: &Path) -> bool {
    if output.is_dir() {
        return true;
    }
    let trailing_separator = output
        .to_str()
        .and_then(|s| s.chars().last())
        .is_some_and(std::path::is_separator);
    let yaml_extension = output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    trailing_separator || !yaml_extension
}

/// Keep tags usable inside file names
fn sanitize_tag(tag: &str) -> String {
    tag.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Turns pipelines into archives
pub trait Compiler: Send + Sync {
    /// Compile `pipeline` and write the archive to (or into) `output`
    ///
    /// Nothing is written unless compilation succeeds.
    fn compile(
        &self,
        pipeline: &Pipeline,
        context: &CompileContext,
        output: &Path,
    ) -> Result<CompiledArchive, MlpipeError>;
}

/// Compiler producing the YAML archive format
#[derive(Debug, Clone, Default)]
pub struct YamlCompiler;

impl YamlCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Build the archive contents without touching the filesystem
    pub fn render(
        &self,
        pipeline: &Pipeline,
        context: &CompileContext,
    ) -> Result<ArchiveFile, MlpipeError> {
        PipelineValidator::validate(pipeline).into_result()?;
        let dag = DagBuilder::build(pipeline)?;

        let bindings = ParameterBindings::resolve(pipeline, &context.config, &context.env)?;

        let mut components = BTreeMap::new();
        let mut tasks = Vec::with_capacity(pipeline.stages.len());

        for stage in &pipeline.stages {
            let component = component_id(&stage.name);

            components.insert(
                component.clone(),
                ComponentSpec {
                    executor: substitute_executor(&stage.executor, &bindings)?,
                    inputs: stage.inputs.keys().cloned().collect(),
                    outputs: stage.outputs.clone(),
                },
            );

            let mut inputs = BTreeMap::new();
            for (name, input) in &stage.inputs {
                let resolved = match input {
                    InputRef::Stage { stage, output } => TaskInput::TaskOutput {
                        task: stage.clone(),
                        output: output.clone(),
                    },
                    InputRef::External { external } => TaskInput::External {
                        uri: bindings.substitute(external)?,
                    },
                };
                inputs.insert(name.clone(), resolved);
            }

            let properties = stage
                .properties
                .iter()
                .map(|(k, v)| Ok((k.clone(), bindings.substitute(v)?)))
                .collect::<Result<BTreeMap<_, _>, MlpipeError>>()?;

            tracing::debug!(
                stage = %stage.name,
                executor = stage.executor_name(),
                "compiled stage"
            );

            tasks.push(TaskSpec {
                name: stage.name.clone(),
                component,
                dependencies: dag.dependencies(&stage.name).unwrap_or_default(),
                inputs,
                properties,
            });
        }

        let workflow = WorkflowDescriptor {
            compiler_version: crate::VERSION.to_string(),
            pipeline_info: PipelineInfo {
                name: context.config.pipeline_name.clone(),
                template: pipeline.name.clone(),
                version: context.version_tag.clone(),
                description: pipeline.description.clone(),
            },
            parameters: bindings.into_values(),
            components,
            dag: DagSpec { tasks },
        };

        ArchiveFile::seal(workflow)
    }
}

impl Compiler for YamlCompiler {
    fn compile(
        &self,
        pipeline: &Pipeline,
        context: &CompileContext,
        output: &Path,
    ) -> Result<CompiledArchive, MlpipeError> {
        let file = self.render(pipeline, context)?;
        let yaml = file.to_yaml()?;

        let path = context.archive_path(output);
        write_atomic(&path, yaml.as_bytes())?;

        tracing::info!(
            archive = %path.display(),
            digest = %file.digest,
            stages = pipeline.stages.len(),
            "compiled pipeline"
        );

        Ok(CompiledArchive::new(path, file))
    }
}

fn substitute_executor(
    executor: &Executor,
    bindings: &ParameterBindings,
) -> Result<Executor, MlpipeError> {
    Ok(match executor {
        Executor::Component { component } => Executor::Component {
            component: *component,
        },
        Executor::Container {
            image,
            command,
            args,
        } => Executor::Container {
            image: bindings.substitute(image)?,
            command: substitute_all(command, bindings)?,
            args: substitute_all(args, bindings)?,
        },
        Executor::Training {
            image,
            machine_type,
            replica_count,
            args,
        } => Executor::Training {
            image: bindings.substitute(image)?,
            machine_type: bindings.substitute(machine_type)?,
            replica_count: *replica_count,
            args: substitute_all(args, bindings)?,
        },
    })
}

fn substitute_all(
    items: &[String],
    bindings: &ParameterBindings,
) -> Result<Vec<String>, MlpipeError> {
    items.iter().map(|s| bindings.substitute(s)).collect()
}

/// Write `bytes` to a sibling temp file, then rename it over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MlpipeError> {
    let write_err = |e: std::io::Error| MlpipeError::FileWriteError {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| MlpipeError::FileWriteError {
            path: path.to_path_buf(),
            error: "output path has no file name".to_string(),
        })?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    if let Err(e) = std::fs::write(&tmp, bytes).and_then(|_| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(write_err(e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ComponentKind, Parameter, PipelineBuilder, Stage};
    use tempfile::TempDir;

    fn context() -> CompileContext {
        CompileContext::new(
            PipelineConfig {
                project_id: "p1".into(),
                region: "us-central1".into(),
                image: "gcr.io/p1/trainer:v1".into(),
                pipeline_name: "news".into(),
            },
            Environment::from_pairs([("DATA_ROOT", "gs://p1-data/news")]),
        )
    }

    fn small_pipeline() -> Pipeline {
        PipelineBuilder::new("small")
            .parameter("data_root", Parameter::from_env("DATA_ROOT"))
            .stage(
                Stage::component("ingest", ComponentKind::ExampleGen)
                    .with_input("data", InputRef::external("{{data_root}}/news.csv"))
                    .with_output("examples"),
            )
            .unwrap()
            .stage(
                Stage::new("train", Executor::training(vec!["--project={{project}}".into()]))
                    .with_input("examples", InputRef::from_stage("ingest", "examples"))
                    .with_output("model"),
            )
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_render_substitutes_parameters() {
        let file = YamlCompiler::new().render(&small_pipeline(), &context()).unwrap();
        let workflow = &file.workflow;

        assert_eq!(workflow.pipeline_info.name, "news");
        assert_eq!(workflow.pipeline_info.template, "small");
        assert_eq!(workflow.parameters["data_root"], "gs://p1-data/news");

        let train = &workflow.components["comp-train"];
        match &train.executor {
            Executor::Training { image, args, .. } => {
                assert_eq!(image, "gcr.io/p1/trainer:v1");
                assert_eq!(args, &vec!["--project=p1".to_string()]);
            }
            _ => panic!("Expected training executor"),
        }

        assert_eq!(
            workflow.dag.tasks[0].inputs["data"],
            TaskInput::External {
                uri: "gs://p1-data/news/news.csv".into()
            }
        );
        assert_eq!(workflow.dag.tasks[1].dependencies, vec!["ingest"]);
    }

    #[test]
    fn test_archive_names() {
        let ctx = context();
        assert_eq!(ctx.archive_file_name(), "news.yaml");
        assert_eq!(
            ctx.with_version_tag("v1.2.0").archive_file_name(),
            "news-v1.2.0.yaml"
        );
        assert_eq!(sanitize_tag("release/1"), "release_1");
    }

    #[test]
    fn test_archive_path_treats_missing_directories_as_directories() {
        let dir = TempDir::new().unwrap();
        let ctx = context();

        assert_eq!(
            ctx.archive_path(&dir.path().join("build/")),
            dir.path().join("build").join("news.yaml")
        );
        assert_eq!(
            ctx.archive_path(&dir.path().join("build")),
            dir.path().join("build").join("news.yaml")
        );
        assert_eq!(
            ctx.archive_path(&dir.path().join("out.yml")),
            dir.path().join("out.yml")
        );

        let archive = YamlCompiler::new()
            .compile(&small_pipeline(), &ctx, &dir.path().join("dist/nightly/"))
            .unwrap();
        assert_eq!(archive.path(), dir.path().join("dist/nightly/news.yaml"));
        assert!(archive.path().is_file());
    }

    #[test]
    fn test_compile_into_directory_and_load() {
        let dir = TempDir::new().unwrap();
        let archive = YamlCompiler::new()
            .compile(&small_pipeline(), &context(), dir.path())
            .unwrap();

        assert_eq!(archive.path(), dir.path().join("news.yaml"));

        let loaded = CompiledArchive::load(archive.path()).unwrap();
        assert_eq!(loaded, archive);
        assert_eq!(loaded.pipeline_name(), "news");
    }

    #[test]
    fn test_compile_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.yaml");
        let second = dir.path().join("second.yaml");

        YamlCompiler::new()
            .compile(&small_pipeline(), &context(), &first)
            .unwrap();
        YamlCompiler::new()
            .compile(&small_pipeline(), &context(), &second)
            .unwrap();

        assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
    }

    #[test]
    fn test_missing_parameter_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context();
        ctx.env = Environment::default();

        let err = YamlCompiler::new()
            .compile(&small_pipeline(), &ctx, dir.path())
            .unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_tampered_archive_is_rejected() {
        let dir = TempDir::new().unwrap();
        let archive = YamlCompiler::new()
            .compile(&small_pipeline(), &context(), dir.path())
            .unwrap();

        let content = std::fs::read_to_string(archive.path()).unwrap();
        std::fs::write(
            archive.path(),
            content.replace("gs://p1-data/news", "gs://elsewhere"),
        )
        .unwrap();

        let err = CompiledArchive::load(archive.path()).unwrap_err();
        assert!(matches!(err, MlpipeError::MalformedArchive { .. }));
    }
}
