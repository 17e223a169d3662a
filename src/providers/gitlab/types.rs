use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution status shared by pipelines and jobs.
///
/// GitLab reports a wider vocabulary than the watch engine cares about, so the
/// pre-execution states collapse into `Pending` and `scheduled` into `Manual`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[serde(alias = "created", alias = "waiting_for_resource", alias = "preparing")]
    Pending,
    Running,
    Success,
    Failed,
    #[serde(alias = "canceling")]
    Canceled,
    Skipped,
    #[serde(alias = "scheduled")]
    Manual,
}

/// Display grouping used to pick a color for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Informational,
    Positive,
    Negative,
    Neutral,
}

impl Status {
    /// Whether more progress is expected. Every other status is terminal.
    pub fn is_active(self) -> bool {
        matches!(self, Status::Pending | Status::Running)
    }

    pub fn class(self) -> StatusClass {
        match self {
            Status::Pending | Status::Running => StatusClass::Informational,
            Status::Success => StatusClass::Positive,
            Status::Failed => StatusClass::Negative,
            Status::Canceled | Status::Skipped | Status::Manual => StatusClass::Neutral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Running => "running",
            Status::Success => "success",
            Status::Failed => "failed",
            Status::Canceled => "canceled",
            Status::Skipped => "skipped",
            Status::Manual => "manual",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A GitLab CI/CD pipeline as returned by the REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    /// Git reference the pipeline runs for (branch or tag)
    #[serde(rename = "ref")]
    pub ref_: String,
    pub sha: String,
    pub status: Status,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub web_url: String,
}

/// A single job of a pipeline.
///
/// Job names are not unique: every run of a pipeline produces a new job with
/// the same name, which is what the duration baselines are keyed on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub name: String,
    pub stage: String,
    pub status: Status,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Elapsed seconds, only meaningful once the job is terminal
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub path_with_namespace: String,
}
