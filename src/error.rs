use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by ComfyUI Cloud operations.
#[derive(Error, Debug)]
pub enum CloudError {
    /// No API key was supplied through the environment.
    #[error("set the COMFY_UI_API_KEY environment variable")]
    MissingCredential,

    /// The prompt text was empty after joining the positional arguments.
    #[error("a prompt is required")]
    MissingPrompt,

    /// The service refused the submitted workflow, either with a non-success
    /// status or with per-node validation errors.
    #[error("Workflow rejected: {0}")]
    RemoteRejection(String),

    /// The job did not reach a terminal state within the wait budget.
    #[error("Timed out after {}s waiting for job", .waited.as_secs())]
    JobTimeout { waited: Duration },

    /// The service reported the job as `error` or `failed`.
    #[error("Job {status}: {message}")]
    JobFailed { status: String, message: String },

    /// The job history exposes no output filename.
    #[error("No output file found for job {0}")]
    NoOutputFound(String),

    /// The artifact endpoint returned a non-success status.
    #[error("Download failed: HTTP {status}: {body}")]
    DownloadFailed { status: StatusCode, body: String },

    /// Any other non-success HTTP status.
    #[error("ComfyUI Cloud returned HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    /// The response was missing expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the downloaded artifact failed.
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CloudError>;
