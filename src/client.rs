use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::{CloudError, Result};
use crate::types::*;
use crate::workflow::WorkflowGraph;

/// Public ComfyUI Cloud endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://cloud.comfy.org";

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-API-Key";

const JSON_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

fn normalize(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

/// Async client for the ComfyUI Cloud job API.
///
/// Covers the four calls needed to run one job: submit a workflow, poll its
/// status, look up the output filename in its history, and download the
/// artifact.
///
/// # Example
/// ```no_run
/// use comfy_cloud_video::{CloudClient, LtxVideoRequest};
/// use std::time::Duration;
///
/// # async fn example() -> comfy_cloud_video::Result<()> {
/// let client = CloudClient::new("my-api-key");
/// let (workflow, _seed) = LtxVideoRequest::new("a cat").build();
/// let prompt_id = client.submit(&workflow).await?;
/// client
///     .wait_for_completion(&prompt_id, Duration::from_secs(5), Duration::from_secs(600), |_| {})
///     .await?;
/// let filename = client.output_filename(&prompt_id).await?;
/// client.download(&filename, "output.mp4").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CloudClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl CloudClient {
    /// Create a client for the public cloud endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a different base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = normalize(endpoint.into());
        self
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Returns the configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{}", self.endpoint, path))
            .header(API_KEY_HEADER, &self.api_key)
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| CloudError::Network {
                context: format!("{} ({})", context, self.endpoint),
                source: e,
            })
    }

    async fn read_json<T: DeserializeOwned>(resp: Response, context: &str) -> Result<T> {
        resp.json().await.map_err(|e| CloudError::Network {
            context: format!("Failed to parse {} response", context),
            source: e,
        })
    }

    // ── Prompt ──────────────────────────────────────────────────────

    /// Submit a workflow for execution. Returns the `prompt_id`.
    pub async fn submit(&self, workflow: &WorkflowGraph) -> Result<String> {
        let body = serde_json::json!({
            "prompt": workflow,
            "extra_data": { "api_key_comfy_org": self.api_key },
        });

        tracing::debug!(nodes = workflow.len(), "POST /api/prompt");
        let request = self
            .http
            .post(format!("{}/api/prompt", self.endpoint))
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(JSON_TIMEOUT)
            .json(&body);
        let resp = self.send(request, "Failed to submit workflow").await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body_text = resp.text().await.unwrap_or_default();
            return Err(CloudError::RemoteRejection(format!(
                "HTTP {}: {}",
                status, body_text
            )));
        }

        let json: Value = Self::read_json(resp, "/api/prompt").await?;

        if let Some(errors) = json.get("node_errors") {
            let has_errors = match errors {
                Value::Object(obj) => !obj.is_empty(),
                Value::Array(arr) => !arr.is_empty(),
                Value::Null => false,
                _ => true,
            };
            if has_errors {
                return Err(CloudError::RemoteRejection(format!(
                    "node errors: {}",
                    serde_json::to_string(errors)?
                )));
            }
        }

        let prompt_id = json
            .get("prompt_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| CloudError::InvalidResponse("Response missing prompt_id".into()))?;
        tracing::info!(%prompt_id, "workflow submitted");
        Ok(prompt_id)
    }

    // ── Status ──────────────────────────────────────────────────────

    /// Fetch the current status of a job once.
    pub async fn job_status(&self, prompt_id: &str) -> Result<JobStatus> {
        self.fetch_status(prompt_id, JSON_TIMEOUT).await
    }

    async fn fetch_status(&self, prompt_id: &str, timeout: Duration) -> Result<JobStatus> {
        let path = format!("/api/job/{}/status", prompt_id);
        tracing::debug!("GET {}", path);
        let request = self.get(&path).timeout(timeout);
        let resp = self.send(request, "Failed to fetch job status").await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CloudError::Http { status, body });
        }

        Self::read_json(resp, "job status").await
    }

    /// Poll the job status every `poll_interval` until it succeeds, fails,
    /// or `max_wait` elapses.
    ///
    /// `on_update` is called once per poll with the status label and the
    /// elapsed time. Returns as soon as a `success` status is seen.
    pub async fn wait_for_completion<F>(
        &self,
        prompt_id: &str,
        poll_interval: Duration,
        max_wait: Duration,
        mut on_update: F,
    ) -> Result<JobStatus>
    where
        F: FnMut(StatusUpdate),
    {
        let start = Instant::now();
        loop {
            let elapsed = start.elapsed();
            if elapsed >= max_wait {
                return Err(CloudError::JobTimeout { waited: elapsed });
            }

            // A stalled request must not outlive the wait budget.
            let request_timeout = JSON_TIMEOUT.min(max_wait - elapsed);
            let status = match self.fetch_status(prompt_id, request_timeout).await {
                Err(CloudError::Network { source, .. })
                    if source.is_timeout() && request_timeout < JSON_TIMEOUT =>
                {
                    return Err(CloudError::JobTimeout {
                        waited: start.elapsed(),
                    });
                }
                other => other?,
            };
            on_update(StatusUpdate {
                status: status.status.clone(),
                elapsed: start.elapsed(),
            });

            match status.state() {
                JobState::Success => {
                    tracing::info!(%prompt_id, "job finished");
                    return Ok(status);
                }
                JobState::Failed => {
                    return Err(CloudError::JobFailed {
                        message: status
                            .error_message
                            .clone()
                            .filter(|m| !m.is_empty())
                            .unwrap_or_else(|| "unknown".to_string()),
                        status: status.status,
                    });
                }
                JobState::Pending => {}
            }

            let remaining = max_wait.saturating_sub(start.elapsed());
            tokio::time::sleep(poll_interval.min(remaining)).await;
        }
    }

    // ── History ─────────────────────────────────────────────────────

    /// Fetch the history entry for a finished job.
    pub async fn history(&self, prompt_id: &str) -> Result<JobHistory> {
        let path = format!("/api/history_v2/{}", prompt_id);
        tracing::debug!("GET {}", path);
        let request = self.get(&path).timeout(JSON_TIMEOUT);
        let resp = self.send(request, "Failed to fetch job history").await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CloudError::Http { status, body });
        }

        let mut entries: HashMap<String, JobHistory> = Self::read_json(resp, "history").await?;
        entries
            .remove(prompt_id)
            .ok_or_else(|| CloudError::NoOutputFound(prompt_id.to_string()))
    }

    /// Resolve the filename of the job's artifact.
    ///
    /// Output nodes are scanned in sorted node-id order and the first file
    /// with a filename wins.
    pub async fn output_filename(&self, prompt_id: &str) -> Result<String> {
        let history = self.history(prompt_id).await?;
        history
            .first_filename()
            .map(str::to_string)
            .ok_or_else(|| CloudError::NoOutputFound(prompt_id.to_string()))
    }

    // ── Download ────────────────────────────────────────────────────

    /// Download an output file and write it to `path`, replacing any
    /// existing file. Returns the number of bytes written.
    pub async fn download(&self, filename: &str, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        let url = reqwest::Url::parse_with_params(
            &format!("{}/api/view", self.endpoint),
            &[("filename", filename), ("type", "output")],
        )
        .map_err(|e| CloudError::InvalidResponse(format!("Bad download URL: {}", e)))?;

        tracing::debug!(%url, "downloading artifact");
        let request = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(DOWNLOAD_TIMEOUT);
        let resp = self
            .send(request, &format!("Failed to fetch {}", filename))
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CloudError::DownloadFailed { status, body });
        }

        let bytes = resp.bytes().await.map_err(|e| CloudError::Network {
            context: format!("Failed to read {}", filename),
            source: e,
        })?;

        tokio::fs::write(path, &bytes)
            .await
            .map_err(|source| CloudError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(bytes.len() as u64)
    }
}
