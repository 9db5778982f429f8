// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Content digests
//!
//! Uses BLAKE3 for archive and dataset fingerprints.

use blake3::Hasher;
use serde::Serialize;
use std::path::Path;

use crate::errors::MlpipeError;

/// Incremental hasher over canonical JSON values
pub struct ContentHasher {
    hasher: Hasher,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            hasher: Hasher::new(),
        }
    }

    /// Hash the canonical JSON encoding of `value`
    ///
    /// Callers must only pass types whose maps are ordered (`BTreeMap`), or the
    /// digest will not be stable.
    pub fn update_json<T: Serialize>(&mut self, value: &T) -> Result<(), MlpipeError> {
        let bytes = serde_json::to_vec(value)?;
        self.hasher.update(&bytes);
        Ok(())
    }

    /// Hash arbitrary bytes
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finalize and get the hash
    pub fn finalize(self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Digest of a serializable value
pub fn digest_value<T: Serialize>(value: &T) -> Result<String, MlpipeError> {
    let mut hasher = ContentHasher::new();
    hasher.update_json(value)?;
    Ok(hasher.finalize())
}

/// Digest of raw bytes
pub fn digest_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Digest of a file's contents
pub fn digest_file(path: &Path) -> Result<String, MlpipeError> {
    let content = std::fs::read(path).map_err(|e| MlpipeError::FileReadError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    Ok(digest_bytes(&content))
}
