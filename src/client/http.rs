// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! HTTP orchestrator client

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::{OrchestratorClient, Run, RunHandle, RunState, SubmitRequest};
use crate::compiler::WorkflowDescriptor;
use crate::errors::MlpipeError;

/// Connection settings
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Bearer token sent with every request
    pub token: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            token: None,
        }
    }
}

/// Orchestrator client speaking JSON over HTTP
#[derive(Debug, Clone)]
pub struct HttpOrchestratorClient {
    /// Base URL without trailing slash
    base_url: String,
    /// `{base_url}/api/v1/runs`
    runs_url: Url,
    client: Client,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateRunBody<'a> {
    display_name: &'a str,
    pipeline_digest: &'a str,
    pipeline_spec: &'a WorkflowDescriptor,
    runtime_parameters: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run_id: String,
    #[serde(default)]
    state: Option<RunState>,
}

impl HttpOrchestratorClient {
    /// Create a client for `endpoint`
    pub fn new(endpoint: &str, options: ClientOptions) -> Result<Self, MlpipeError> {
        let url = Url::parse(endpoint).map_err(|e| MlpipeError::InvalidConfig {
            reason: format!("invalid endpoint URL '{}': {}", endpoint, e),
            help: Some("Use a full URL such as https://orchestrator.example.com".into()),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(MlpipeError::invalid_config(format!(
                "endpoint '{}' must use http or https",
                endpoint
            )));
        }

        let mut runs_url = url;
        runs_url
            .path_segments_mut()
            .map_err(|_| {
                MlpipeError::invalid_config(format!("endpoint '{}' cannot carry a path", endpoint))
            })?
            .pop_if_empty()
            .extend(["api", "v1", "runs"]);

        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("mlpipe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MlpipeError::invalid_config(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            base_url: endpoint.trim_end_matches('/').to_string(),
            runs_url,
            client,
            token: options.token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a single run; `run_id` is escaped as one path segment
    fn run_url(&self, run_id: &str) -> Url {
        let mut url = self.runs_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(run_id);
        }
        url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, MlpipeError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| MlpipeError::from_http(&self.base_url, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(status_error(&self.base_url, status, body))
    }
}

/// Map a non-success status to the matching error kind
fn status_error(endpoint: &str, status: StatusCode, body: String) -> MlpipeError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MlpipeError::Unauthorized {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
            MlpipeError::Rejected {
                status: status.as_u16(),
                message: body,
            }
        }
        _ => MlpipeError::RemoteFailure {
            status: Some(status.as_u16()),
            message: body,
        },
    }
}

#[async_trait]
impl OrchestratorClient for HttpOrchestratorClient {
    async fn submit(&self, request: &SubmitRequest) -> Result<RunHandle, MlpipeError> {
        request.validate()?;

        let url = self.runs_url.clone();
        let body = CreateRunBody {
            display_name: &request.run_name,
            pipeline_digest: request.archive.digest(),
            pipeline_spec: request.archive.workflow(),
            runtime_parameters: request.effective_parameters(),
        };

        tracing::debug!(url = %url, run = %request.run_name, "submitting run");

        let response = self.send(self.client.post(url).json(&body)).await?;
        let created: CreateRunResponse = response.json().await.map_err(|e| {
            MlpipeError::RemoteFailure {
                status: None,
                message: format!("Failed to parse JSON response: {}", e),
            }
        })?;

        if created.run_id.trim().is_empty() {
            return Err(MlpipeError::RemoteFailure {
                status: None,
                message: "orchestrator returned an empty run id".to_string(),
            });
        }

        tracing::info!(run_id = %created.run_id, run = %request.run_name, "run submitted");

        Ok(RunHandle {
            run_id: created.run_id,
            run_name: request.run_name.clone(),
            state: created.state.unwrap_or(RunState::Pending),
        })
    }

    async fn get_run(&self, run_id: &str) -> Result<Run, MlpipeError> {
        let url = self.run_url(run_id);
        tracing::debug!(url = %url, "fetching run");
        let response = self.send(self.client.get(url)).await?;

        response.json().await.map_err(|e| MlpipeError::RemoteFailure {
            status: None,
            message: format!("Failed to parse JSON response: {}", e),
        })
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}
