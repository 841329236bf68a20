//! Request and response bodies exchanged with the orchestrator.

use serde::{Deserialize, Serialize};

use crate::{JobId, JobStatus, LoadGauge, Settings};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitRequest {
    pub operation: String,
    pub add_duration: Option<i64>,
    pub subtract_duration: Option<i64>,
    pub multiply_duration: Option<i64>,
    pub divide_duration: Option<i64>,
    pub inactive_server_time: u64,
}

impl SubmitRequest {
    pub fn new(operation: impl Into<String>, settings: &Settings) -> Self {
        let d = settings.durations;
        Self {
            operation: operation.into(),
            add_duration: d.add,
            subtract_duration: d.subtract,
            multiply_duration: d.multiply,
            divide_duration: d.divide,
            inactive_server_time: settings.inactivity_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitResponse {
    Created { id: JobId, operation: String },
    Error { error: String },
}

/// One entry of the bulk job listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteJob {
    pub id: JobId,
    pub operation: String,
    pub status: String,
    #[serde(default)]
    pub result: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RemoteJob {
    /// Status to show for a job loaded from the listing; anything that is not
    /// an explicit terminal signal is still pending.
    pub fn local_status(&self) -> JobStatus {
        terminal_status(&self.status, self.result, self.error.as_deref())
            .unwrap_or(JobStatus::Pending)
    }
}

/// Response of the single-job lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobLookup {
    pub status: String,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub result: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobLookup {
    pub fn terminal_status(&self) -> Option<JobStatus> {
        terminal_status(&self.status, self.result, self.error.as_deref())
    }
}

/// `completed` only counts once a result is attached; `error`/`failed` is an
/// explicit failure. Every other status (`created`, `work`, `pending`, ...)
/// yields `None`.
fn terminal_status(status: &str, result: Option<f64>, error: Option<&str>) -> Option<JobStatus> {
    match status {
        "completed" => result.map(JobStatus::Completed),
        "error" | "failed" => Some(JobStatus::Failed(
            error
                .filter(|e| !e.is_empty())
                .unwrap_or("job failed")
                .to_string(),
        )),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrchestratorStatus {
    pub running: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerStatus {
    pub url: String,
    pub running: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "maxGoroutines", alias = "maxConcurrency")]
    pub max_concurrency: Option<u32>,
    #[serde(default, rename = "currentGoroutines", alias = "currentConcurrency")]
    pub current_concurrency: Option<u32>,
}

impl WorkerStatus {
    pub fn load(&self) -> Option<LoadGauge> {
        if !self.running {
            return None;
        }
        match (self.current_concurrency, self.max_concurrency) {
            (None, None) => None,
            (current, max) => Some(LoadGauge {
                current: current.unwrap_or(0),
                max: max.unwrap_or(0),
            }),
        }
    }
}
