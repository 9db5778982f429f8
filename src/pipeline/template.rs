// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! The standard ingest → train → push pipeline

use crate::errors::MlpipeError;
use crate::pipeline::{
    ComponentKind, Executor, InputRef, Parameter, Pipeline, PipelineBuilder, Stage,
};

/// Build the standard training pipeline
///
/// `ingest → statistics → schema → validate → transform → train → evaluate → push`
pub fn standard_pipeline() -> Result<Pipeline, MlpipeError> {
    PipelineBuilder::new("standard-training")
        .description(
            "Ingest CSV data, validate it, train on the managed service and push a blessed model",
        )
        .parameter(
            "data_root",
            Parameter::from_env("DATA_ROOT")
                .describe("Object storage prefix holding the CSV dataset"),
        )
        .parameter(
            "serving_root",
            Parameter::from_env("SERVING_ROOT")
                .or_default("serving")
                .describe("Where blessed models are pushed"),
        )
        .parameter(
            "train_steps",
            Parameter::from_env("TRAIN_STEPS").or_default("5000"),
        )
        .parameter(
            "eval_steps",
            Parameter::from_env("EVAL_STEPS").or_default("1000"),
        )
        .parameter(
            "accuracy_threshold",
            Parameter::from_env("ACCURACY_THRESHOLD")
                .or_default("0.6")
                .describe("Minimum accuracy for a model to be blessed"),
        )
        .stage(
            Stage::component("ingest", ComponentKind::ExampleGen)
                .with_input("data", InputRef::external("{{data_root}}"))
                .with_output("examples"),
        )?
        .stage(
            Stage::component("statistics", ComponentKind::StatisticsGen)
                .with_input("examples", InputRef::from_stage("ingest", "examples"))
                .with_output("statistics"),
        )?
        .stage(
            Stage::component("schema", ComponentKind::SchemaGen)
                .with_input("statistics", InputRef::from_stage("statistics", "statistics"))
                .with_output("schema"),
        )?
        .stage(
            Stage::component("validate", ComponentKind::ExampleValidator)
                .with_input("statistics", InputRef::from_stage("statistics", "statistics"))
                .with_input("schema", InputRef::from_stage("schema", "schema"))
                .with_output("anomalies"),
        )?
        .stage(
            Stage::component("transform", ComponentKind::Transform)
                .with_input("examples", InputRef::from_stage("ingest", "examples"))
                .with_input("schema", InputRef::from_stage("schema", "schema"))
                .with_output("transformed_examples")
                .with_output("transform_graph"),
        )?
        .stage(
            Stage::new(
                "train",
                Executor::training(vec![
                    "--train-steps={{train_steps}}".into(),
                    "--eval-steps={{eval_steps}}".into(),
                ]),
            )
            .with_input("examples", InputRef::from_stage("transform", "transformed_examples"))
            .with_input("transform_graph", InputRef::from_stage("transform", "transform_graph"))
            .with_input("schema", InputRef::from_stage("schema", "schema"))
            .with_output("model"),
        )?
        .stage(
            Stage::component("evaluate", ComponentKind::Evaluator)
                .with_input("examples", InputRef::from_stage("ingest", "examples"))
                .with_input("model", InputRef::from_stage("train", "model"))
                .with_output("evaluation")
                .with_output("blessing")
                .with_property("accuracy_threshold", "{{accuracy_threshold}}"),
        )?
        .stage(
            Stage::component("push", ComponentKind::Pusher)
                .with_input("model", InputRef::from_stage("train", "model"))
                .with_input("blessing", InputRef::from_stage("evaluate", "blessing"))
                .with_output("pushed_model")
                .with_property("destination", "{{serving_root}}/{{pipeline_name}}"),
        )?
        .build()
}
