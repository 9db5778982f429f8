// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

mod common;

use common::{mlpipe, write_pipeline, NEWS_PIPELINE};
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    mlpipe(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compile"))
        .stdout(predicate::str::contains("submit"))
        .stdout(predicate::str::contains("deploy"));
}

#[test]
fn test_compile_writes_named_archive() {
    let dir = TempDir::new().unwrap();
    write_pipeline(dir.path(), NEWS_PIPELINE);

    mlpipe(dir.path())
        .args(["compile", "--output", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("news.yaml"));

    let archive = std::fs::read_to_string(dir.path().join("news.yaml")).unwrap();
    assert!(archive.contains("schema_version: mlpipe.archive/v1"));
    assert!(archive.contains("--project=p1"));
    assert!(archive.contains("gs://p1-data/news/train.csv"));
}

#[test]
fn test_compile_twice_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    write_pipeline(dir.path(), NEWS_PIPELINE);

    mlpipe(dir.path())
        .args(["compile", "-o", "first.yaml"])
        .assert()
        .success();
    mlpipe(dir.path())
        .args(["compile", "-o", "second.yaml"])
        .assert()
        .success();

    assert_eq!(
        std::fs::read(dir.path().join("first.yaml")).unwrap(),
        std::fs::read(dir.path().join("second.yaml")).unwrap()
    );
}

#[test]
fn test_compile_with_tag_and_directory_flag() {
    let dir = TempDir::new().unwrap();
    let work = dir.path().join("work");
    std::fs::create_dir(&work).unwrap();
    write_pipeline(&work, NEWS_PIPELINE);
    std::fs::create_dir(work.join("build")).unwrap();

    mlpipe(dir.path())
        .args(["-C", "work", "compile", "-o", "build", "--tag", "v1.0.0"])
        .assert()
        .success();

    assert!(work.join("build/news-v1.0.0.yaml").exists());
}

#[test]
fn test_compile_creates_missing_output_directory() {
    let dir = TempDir::new().unwrap();
    write_pipeline(dir.path(), NEWS_PIPELINE);

    mlpipe(dir.path())
        .args(["compile", "-o", "build/"])
        .assert()
        .success();
    assert!(dir.path().join("build/news.yaml").is_file());

    mlpipe(dir.path())
        .args(["compile", "-o", "dist", "--tag", "v2.0.0"])
        .assert()
        .success();
    assert!(dir.path().join("dist/news-v2.0.0.yaml").is_file());
}

#[cfg(unix)]
#[test]
fn test_non_utf8_environment_is_tolerated() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = TempDir::new().unwrap();
    write_pipeline(dir.path(), NEWS_PIPELINE);

    mlpipe(dir.path())
        .env("MLPIPE_TEST_BYTES", OsStr::from_bytes(b"f\xffo"))
        .arg("validate")
        .assert()
        .success();
}

#[test]
fn test_missing_environment_fails_before_compiling() {
    let dir = TempDir::new().unwrap();
    write_pipeline(dir.path(), NEWS_PIPELINE);

    mlpipe(dir.path())
        .env_remove("PROJECT_ID")
        .args(["compile", "-o", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PROJECT_ID"));

    assert!(!dir.path().join("news.yaml").exists());
}

#[test]
fn test_undeclared_input_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let broken = NEWS_PIPELINE.replace(
        "model: { stage: train, output: model }",
        "model: { stage: ghost, output: model }",
    );
    write_pipeline(dir.path(), &broken);

    mlpipe(dir.path())
        .args(["compile", "-o", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("push"));

    assert!(!dir.path().join("news.yaml").exists());
}

#[test]
fn test_validate_reports_valid_pipeline() {
    let dir = TempDir::new().unwrap();
    write_pipeline(dir.path(), NEWS_PIPELINE);

    mlpipe(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline is valid"));
}

#[test]
fn test_validate_rejects_missing_file() {
    let dir = TempDir::new().unwrap();

    mlpipe(dir.path())
        .args(["validate", "missing.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mlpipe init"));
}

#[test]
fn test_graph_text_and_mermaid() {
    let dir = TempDir::new().unwrap();
    write_pipeline(dir.path(), NEWS_PIPELINE);

    mlpipe(dir.path())
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. ingest (example_gen)"))
        .stdout(predicate::str::contains("6. push (pusher) [depends: train]"));

    mlpipe(dir.path())
        .args(["graph", "--format", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("train --> push"));
}

#[test]
fn test_init_then_validate() {
    let dir = TempDir::new().unwrap();

    mlpipe(dir.path()).arg("init").assert().success();
    assert!(dir.path().join("pipeline.yaml").exists());
    assert!(dir.path().join("trigger.yaml").exists());

    mlpipe(dir.path()).arg("init").assert().failure();
    mlpipe(dir.path()).arg("validate").assert().success();
}

#[test]
fn test_submit_to_unreachable_endpoint() {
    let dir = TempDir::new().unwrap();
    let archive = common::compile_news(dir.path());

    mlpipe(dir.path())
        .arg("submit")
        .arg(archive.path())
        .args(["--run-name", "run-1", "--endpoint", "http://127.0.0.1:1"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_submit_rejects_unknown_parameter() {
    let dir = TempDir::new().unwrap();
    let archive = common::compile_news(dir.path());

    mlpipe(dir.path())
        .arg("submit")
        .arg(archive.path())
        .args(["--run-name", "run-1", "--endpoint", "http://127.0.0.1:1"])
        .args(["--param", "learning_rate=0.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("learning_rate"));
}

#[test]
fn test_stage_data_to_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("train.csv"), "title,label\nhello,1\n").unwrap();

    mlpipe(dir.path())
        .args(["stage-data", "*.csv", "--destination", "bucket"])
        .assert()
        .success();

    assert!(dir.path().join("bucket/train.csv").exists());
}

#[test]
fn test_stage_data_without_matches() {
    let dir = TempDir::new().unwrap();

    mlpipe(dir.path())
        .args(["stage-data", "*.csv", "--destination", "bucket"])
        .assert()
        .failure();
}
