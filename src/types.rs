use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Status record returned by `/api/job/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Classification of a [`JobStatus`] label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Queued, running, or any other label the service uses before finishing.
    Pending,
    Success,
    Failed,
}

impl JobStatus {
    pub fn state(&self) -> JobState {
        match self.status.as_str() {
            "success" => JobState::Success,
            "error" | "failed" => JobState::Failed,
            _ => JobState::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state() != JobState::Pending
    }
}

/// One observation of the job, handed to the progress callback per poll.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: String,
    pub elapsed: Duration,
}

/// A file produced by an output node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputFile {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub subfolder: Option<String>,
    #[serde(default, rename = "type")]
    pub file_type: Option<String>,
}

/// Files reported by one output-producing node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeOutput {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<OutputFile>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// History entry for one job, as returned by `/api/history_v2/{id}`.
///
/// Outputs are keyed by node id in sorted order so lookups over them are
/// deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobHistory {
    #[serde(default)]
    pub outputs: BTreeMap<String, NodeOutput>,
}

impl JobHistory {
    /// First filename across all outputs, scanning node ids in sorted order.
    pub fn first_filename(&self) -> Option<&str> {
        self.outputs
            .values()
            .flat_map(|node| node.images.iter())
            .find_map(|file| file.filename.as_deref().filter(|f| !f.is_empty()))
    }
}

/// Machine-readable summary printed to stdout after a successful run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationResult {
    pub prompt_id: String,
    pub filename: String,
    pub output: String,
    pub bytes: u64,
}
