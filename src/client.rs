//! API client abstraction for the remote document-processing service.
//!
//! This module defines the `ApiClient` trait to abstract the submit and
//! status-check calls, enabling testability with a mock implementation that
//! never touches the network.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DocbatchError, Result};
use crate::ledger::ExecutionStatus;

/// Outcome of submitting a file.
///
/// The remote service sometimes resolves a submission synchronously and
/// sometimes switches to asynchronous processing; the variant makes that
/// explicit instead of null-checking an optional endpoint field.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The call already resolved; `status` is terminal.
    Resolved {
        status: ExecutionStatus,
        status_code: Option<i64>,
        response: Value,
    },
    /// Processing continues remotely; poll `resume_handle` for the result.
    Pending {
        resume_handle: String,
        status_code: Option<i64>,
        response: Value,
    },
}

/// One status-check response.
#[derive(Debug, Clone)]
pub struct StatusResponse {
    pub status: ExecutionStatus,
    pub status_code: Option<i64>,
    /// Full response body; carries the result payload once terminal.
    pub body: Value,
}

/// Trait for talking to the remote API.
///
/// Both calls may fail with transport or validation errors; the lifecycle
/// driver catches those at its boundary and maps them to a terminal ERROR.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Submit one file for processing.
    async fn submit(&self, file_path: &Path) -> Result<SubmitOutcome>;

    /// Re-check a previously submitted file via its resume handle.
    async fn check_status(&self, resume_handle: &str) -> Result<StatusResponse>;
}

fn parse_status(body: &Value) -> ExecutionStatus {
    body.get("execution_status")
        .and_then(Value::as_str)
        .map(ExecutionStatus::from_remote)
        .unwrap_or(ExecutionStatus::Pending)
}

fn parse_status_code(body: &Value, http_status: u16) -> Option<i64> {
    body.get("status_code")
        .and_then(Value::as_i64)
        .or(Some(i64::from(http_status)))
}

// ============================================================================
// Production implementation using reqwest
// ============================================================================

/// Production client posting multipart uploads to the deployment endpoint.
#[derive(Clone)]
pub struct ReqwestApiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ReqwestApiClient {
    /// Build a client for one endpoint. `timeout` bounds every call; a hung
    /// submit or poll fails through here rather than stalling its worker.
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn read_json(response: reqwest::Response) -> Result<(u16, Value)> {
        let http_status = response.status();
        let text = response.text().await?;

        let body: Value = serde_json::from_str(&text).map_err(|_| {
            let preview: String = text.chars().take(200).collect();
            DocbatchError::Api(format!("non-JSON response (HTTP {http_status}): {preview}"))
        })?;

        if http_status.is_client_error() || http_status.is_server_error() {
            return Err(DocbatchError::Api(format!(
                "remote returned HTTP {}: {}",
                http_status,
                crate::metrics::error_message(&body)
            )));
        }

        Ok((http_status.as_u16(), body))
    }
}

#[async_trait]
impl ApiClient for ReqwestApiClient {
    #[tracing::instrument(skip(self), fields(file = %file_path.display()))]
    async fn submit(&self, file_path: &Path) -> Result<SubmitOutcome> {
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let bytes = tokio::fs::read(file_path).await?;

        tracing::debug!(url = %self.endpoint, bytes = bytes.len(), "submitting file");

        let form = reqwest::multipart::Form::new()
            .part("files", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let (http_status, body) = Self::read_json(response).await?;
        let status = parse_status(&body);
        let status_code = parse_status_code(&body, http_status);

        // The status-check endpoint is present only while processing is
        // asynchronous; its absence means the call already resolved.
        match body
            .get("status_check_api_endpoint")
            .and_then(Value::as_str)
            .filter(|endpoint| !endpoint.is_empty())
        {
            Some(handle) => Ok(SubmitOutcome::Pending {
                resume_handle: handle.to_string(),
                status_code,
                response: body.clone(),
            }),
            None => Ok(SubmitOutcome::Resolved {
                status,
                status_code,
                response: body,
            }),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn check_status(&self, resume_handle: &str) -> Result<StatusResponse> {
        let response = self
            .client
            .get(resume_handle)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let (http_status, body) = Self::read_json(response).await?;

        Ok(StatusResponse {
            status: parse_status(&body),
            status_code: parse_status_code(&body, http_status),
            body,
        })
    }
}

// ============================================================================
// Test/mock implementation
// ============================================================================

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

/// Mock API client for testing.
///
/// Responses are queued per file (for submits) and per resume handle (for
/// status checks) and replayed in FIFO order. Every call is recorded so tests
/// can assert, for instance, that a resumed file issued no submit call.
#[derive(Clone, Default)]
pub struct MockApiClient {
    submit_responses: Arc<Mutex<HashMap<String, Vec<Result<SubmitOutcome>>>>>,
    status_responses: Arc<Mutex<HashMap<String, Vec<Result<StatusResponse>>>>>,
    submit_calls: Arc<Mutex<Vec<PathBuf>>>,
    status_calls: Arc<Mutex<Vec<String>>>,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a submit of `file_path`.
    pub fn add_submit_response(&self, file_path: &str, response: Result<SubmitOutcome>) {
        self.submit_responses
            .lock()
            .entry(file_path.to_string())
            .or_default()
            .push(response);
    }

    /// Queue a response for a status check of `resume_handle`.
    pub fn add_status_response(&self, resume_handle: &str, response: Result<StatusResponse>) {
        self.status_responses
            .lock()
            .entry(resume_handle.to_string())
            .or_default()
            .push(response);
    }

    pub fn submit_calls(&self) -> Vec<PathBuf> {
        self.submit_calls.lock().clone()
    }

    pub fn submit_call_count(&self) -> usize {
        self.submit_calls.lock().len()
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.lock().len()
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn submit(&self, file_path: &Path) -> Result<SubmitOutcome> {
        self.submit_calls.lock().push(file_path.to_path_buf());

        let key = file_path.to_string_lossy().into_owned();
        let mut responses = self.submit_responses.lock();
        if let Some(queue) = responses.get_mut(&key) {
            if !queue.is_empty() {
                return queue.remove(0);
            }
        }

        Err(DocbatchError::Internal(format!(
            "no mock submit response configured for {key}"
        )))
    }

    async fn check_status(&self, resume_handle: &str) -> Result<StatusResponse> {
        self.status_calls.lock().push(resume_handle.to_string());

        let mut responses = self.status_responses.lock();
        if let Some(queue) = responses.get_mut(resume_handle) {
            if !queue.is_empty() {
                return queue.remove(0);
            }
        }

        Err(DocbatchError::Internal(format!(
            "no mock status response configured for {resume_handle}"
        )))
    }
}
