//! Download task status payloads.
//!
//! Tasks are owned by the upstream; this side only reads them.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// Lifecycle state of an upstream download job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl From<&str> for TaskStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => TaskStatus::Pending,
            "processing" => TaskStatus::Processing,
            "completed" => TaskStatus::Completed,
            "failed" => TaskStatus::Failed,
            other => TaskStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => f.write_str("pending"),
            TaskStatus::Processing => f.write_str("processing"),
            TaskStatus::Completed => f.write_str("completed"),
            TaskStatus::Failed => f.write_str("failed"),
            TaskStatus::Other(s) => f.write_str(s),
        }
    }
}

/// Raw response from the task-status endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct TaskStatusPayload {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    pub data: Option<TaskData>,
}

/// The endpoint returns either a list, a `{tasks: [...]}` wrapper, or one task.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TaskData {
    List(Vec<DownloadTask>),
    Wrapped { tasks: Vec<DownloadTask> },
    Single(DownloadTask),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadTask {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub progress: Option<TaskProgress>,
    #[serde(default)]
    pub download: Option<TaskDownload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskProgress {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskDownload {
    #[serde(default, rename = "downloadUrl")]
    pub download_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl DownloadTask {
    pub fn status(&self) -> TaskStatus {
        self.progress
            .as_ref()
            .and_then(|p| p.status.as_deref())
            .map(TaskStatus::from)
            .unwrap_or(TaskStatus::Pending)
    }

    /// Resolved file URL, if the job has produced one.
    pub fn download_url(&self) -> Option<&str> {
        self.download
            .as_ref()
            .and_then(|d| d.download_url.as_deref())
            .filter(|u| !u.trim().is_empty())
    }

    /// Reported progress, clamped to 0..=100.
    pub fn percentage(&self) -> Option<f64> {
        self.progress
            .as_ref()
            .and_then(|p| p.percentage)
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(0.0, 100.0))
    }

    pub fn filename(&self) -> Option<&str> {
        self.download.as_ref().and_then(|d| d.filename.as_deref())
    }
}

impl TaskStatusPayload {
    fn tasks(&self) -> &[DownloadTask] {
        match &self.data {
            Some(TaskData::List(tasks)) | Some(TaskData::Wrapped { tasks }) => tasks,
            Some(TaskData::Single(task)) => std::slice::from_ref(task),
            None => &[],
        }
    }

    /// Upstream explanation, if it sent a non-blank one.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }

    /// Find the task with the given id.
    ///
    /// An explicit `success: false` means no task. A lone task without an id is
    /// taken to be the requested one.
    pub fn find(&self, task_id: &str) -> Option<&DownloadTask> {
        if self.success == Some(false) {
            return None;
        }

        let tasks = self.tasks();
        tasks
            .iter()
            .find(|t| t.id.as_deref() == Some(task_id))
            .or_else(|| match tasks {
                [only] if only.id.is_none() => Some(only),
                _ => None,
            })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
