// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};

use mlpipe::{CompileContext, CompiledArchive, Compiler, Environment, Pipeline, YamlCompiler};

/// Six stages, each consuming the previous stage's output
pub const NEWS_PIPELINE: &str = r#"
name: news-training
description: Headline classifier
parameters:
  data_root:
    env: DATA_ROOT
    default: gs://p1-data/news
  train_steps:
    default: "1000"
stages:
  - name: ingest
    executor: { type: component, component: example_gen }
    inputs:
      data: { external: "{{data_root}}/train.csv" }
    outputs: [examples]
  - name: statistics
    executor: { type: component, component: statistics_gen }
    inputs:
      examples: { stage: ingest, output: examples }
    outputs: [statistics]
  - name: schema
    executor: { type: component, component: schema_gen }
    inputs:
      statistics: { stage: statistics, output: statistics }
    outputs: [schema]
  - name: transform
    executor: { type: component, component: transform }
    inputs:
      schema: { stage: schema, output: schema }
    outputs: [transformed]
  - name: train
    executor:
      type: training
      args: ["--train-steps={{train_steps}}", "--project={{project}}"]
    inputs:
      examples: { stage: transform, output: transformed }
    outputs: [model]
  - name: push
    executor: { type: component, component: pusher }
    inputs:
      model: { stage: train, output: model }
    outputs: [pushed]
"#;

pub const REQUIRED_ENV: [(&str, &str); 4] = [
    ("PROJECT_ID", "p1"),
    ("REGION", "us-central1"),
    ("IMAGE_URI", "gcr.io/p1/trainer:v1"),
    ("PIPELINE_NAME", "news"),
];

pub fn write_pipeline(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("pipeline.yaml");
    std::fs::write(&path, content).unwrap();
    path
}

/// `mlpipe` run inside `dir` with the required variables set
pub fn mlpipe(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mlpipe").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("MLPIPE_ENDPOINT")
        .env_remove("MLPIPE_TOKEN")
        .env_remove("DATA_ROOT")
        .envs(REQUIRED_ENV);
    cmd
}

pub fn environment() -> Environment {
    Environment::from_pairs(REQUIRED_ENV)
}

/// Compile the news pipeline into `dir` through the library
pub fn compile_news(dir: &Path) -> CompiledArchive {
    let pipeline = Pipeline::from_yaml(NEWS_PIPELINE).unwrap();
    let env = environment();
    let config = mlpipe::PipelineConfig::from_env(&env).unwrap();

    YamlCompiler::new()
        .compile(&pipeline, &CompileContext::new(config, env), dir)
        .unwrap()
}
