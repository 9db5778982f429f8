// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Dataset staging
//!
//! Copies local CSV files to the bucket a pipeline reads its data from.

mod store;

pub use store::{open_store, FilesystemStore, HttpStore, ObjectStore};

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::compiler::digest_bytes;
use crate::errors::MlpipeError;

/// An uploaded dataset file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedObject {
    pub uri: String,
    pub bytes: u64,
    /// BLAKE3 digest of the contents
    pub digest: String,
}

/// Uploads dataset files to an [`ObjectStore`]
pub struct DatasetStager {
    store: Box<dyn ObjectStore>,
}

impl DatasetStager {
    pub fn new(store: Box<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn destination(&self) -> String {
        self.store.root()
    }

    /// Stage every file matching `patterns`, relative to `base_dir`
    ///
    /// All files are checked before anything is uploaded.
    pub async fn stage(
        &self,
        patterns: &[String],
        base_dir: &Path,
    ) -> Result<Vec<StagedObject>, MlpipeError> {
        let files = resolve_patterns(patterns, base_dir)?;

        let mut checked = Vec::with_capacity(files.len());
        for path in files {
            let content = std::fs::read(&path).map_err(|e| MlpipeError::FileReadError {
                path: path.clone(),
                error: e.to_string(),
            })?;
            check_csv(&path, &content)?;
            checked.push((object_key(&path, base_dir), content));
        }

        let mut staged = Vec::with_capacity(checked.len());
        for (key, content) in checked {
            let bytes = content.len() as u64;
            let digest = digest_bytes(&content);
            let uri = self.store.put(&key, content).await?;

            tracing::info!(uri = %uri, bytes, "staged dataset file");
            staged.push(StagedObject { uri, bytes, digest });
        }

        Ok(staged)
    }
}

/// Expand glob patterns; each pattern must match at least one file
fn resolve_patterns(patterns: &[String], base_dir: &Path) -> Result<Vec<PathBuf>, MlpipeError> {
    let mut files = BTreeSet::new();

    for pattern in patterns {
        let full_pattern = if Path::new(pattern).is_absolute() {
            pattern.clone()
        } else {
            base_dir.join(pattern).to_string_lossy().to_string()
        };

        let matches: Vec<_> = glob::glob(&full_pattern)
            .map_err(|e| MlpipeError::InvalidConfig {
                reason: format!("invalid pattern '{}': {}", pattern, e),
                help: None,
            })?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();

        if matches.is_empty() {
            return Err(MlpipeError::NoDatasetFiles {
                pattern: pattern.clone(),
            });
        }

        files.extend(matches);
    }

    Ok(files.into_iter().collect())
}

/// Key under the destination: path relative to `base_dir`, else file name
fn object_key(path: &Path, base_dir: &Path) -> String {
    let relative = path
        .strip_prefix(base_dir)
        .ok()
        .map(Path::to_path_buf)
        .or_else(|| path.file_name().map(PathBuf::from))
        .unwrap_or_else(|| path.to_path_buf());

    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Require a non-empty CSV file whose first row is a header
fn check_csv(path: &Path, content: &[u8]) -> Result<(), MlpipeError> {
    let invalid = |reason: &str| MlpipeError::InvalidDataset {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(invalid("only .csv files can be staged"));
    }

    let text = std::str::from_utf8(content).map_err(|_| invalid("file is not UTF-8 text"))?;
    let header = text
        .lines()
        .next()
        .map(|line| line.trim_start_matches('\u{feff}').trim())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| invalid("file is empty"))?;

    let columns: Vec<&str> = header.split(',').map(|c| c.trim().trim_matches('"')).collect();
    if columns.iter().any(|c| c.is_empty()) {
        return Err(invalid("header row has an empty column name"));
    }
    if columns.iter().all(|c| c.parse::<f64>().is_ok()) {
        return Err(invalid("first row looks like data, not a header"));
    }

    Ok(())
}
