// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Object stores datasets are uploaded to

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::MlpipeError;

/// Destination for staged objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, returning the object's URI
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, MlpipeError>;

    /// Root URI, for messages
    fn root(&self) -> String;
}

/// Open the store for a destination URI
///
/// `file://` URIs and bare paths go to the filesystem, `http(s)://` URIs are
/// written with `PUT`.
pub fn open_store(
    destination: &str,
    token: Option<String>,
    timeout: Duration,
) -> Result<Box<dyn ObjectStore>, MlpipeError> {
    if destination.starts_with("http://") || destination.starts_with("https://") {
        return Ok(Box::new(HttpStore::new(destination, token, timeout)?));
    }

    if let Some(path) = destination.strip_prefix("file://") {
        return Ok(Box::new(FilesystemStore::new(path)));
    }

    if let Some((scheme, _)) = destination.split_once("://") {
        return Err(MlpipeError::InvalidConfig {
            reason: format!("unsupported destination scheme '{}'", scheme),
            help: Some("Use a local path, file://, http:// or https:// destination".into()),
        });
    }

    Ok(Box::new(FilesystemStore::new(destination)))
}

/// Store rooted at a local directory
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, MlpipeError> {
        let path = self.root.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MlpipeError::FileWriteError {
                    path: parent.to_path_buf(),
                    error: e.to_string(),
                })?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| MlpipeError::FileWriteError {
                path: path.clone(),
                error: e.to_string(),
            })?;

        Ok(path.display().to_string())
    }

    fn root(&self) -> String {
        self.root.display().to_string()
    }
}

/// Store reached over HTTP, one `PUT` per object
#[derive(Debug, Clone)]
pub struct HttpStore {
    base_url: String,
    client: Client,
    token: Option<String>,
}

impl HttpStore {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MlpipeError> {
        reqwest::Url::parse(base_url).map_err(|e| {
            MlpipeError::invalid_config(format!("invalid destination URL '{}': {}", base_url, e))
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MlpipeError::invalid_config(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token,
        })
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, MlpipeError> {
        let url = format!("{}/{}", self.base_url, key);

        let mut request = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MlpipeError::from_http(&self.base_url, e))?;

        let status = response.status();
        match status {
            s if s.is_success() => Ok(url),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(MlpipeError::Unauthorized {
                endpoint: self.base_url.clone(),
                status: status.as_u16(),
            }),
            _ => Err(MlpipeError::RemoteFailure {
                status: Some(status.as_u16()),
                message: format!(
                    "upload of '{}' failed: {}",
                    key,
                    response.text().await.unwrap_or_default()
                ),
            }),
        }
    }

    fn root(&self) -> String {
        self.base_url.clone()
    }
}
