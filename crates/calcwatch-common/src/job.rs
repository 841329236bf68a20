use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier assigned by the cluster when a job is accepted.
///
/// The orchestrator hands out integers, but the client never does arithmetic
/// on them, so they are kept as opaque strings. Deserialization accepts either
/// a JSON string or a JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => JobId(s),
            Raw::Signed(n) => JobId(n.to_string()),
            Raw::Unsigned(n) => JobId(n.to_string()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum JobStatus {
    Pending,
    Completed(f64),
    Failed(String),
}

impl JobStatus {
    /// `Completed` and `Failed` are terminal: nothing moves a job out of them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed(_) => "completed",
            JobStatus::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: JobId,
    /// The literal expression as submitted.
    pub expression: String,
    pub status: JobStatus,
    #[serde(default)]
    pub submitted_at_ms: u64,
}

impl Job {
    pub fn pending(id: JobId, expression: impl Into<String>) -> Self {
        Self {
            id,
            expression: expression.into(),
            status: JobStatus::Pending,
            submitted_at_ms: chrono::Utc::now().timestamp_millis().max(0) as u64,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == JobStatus::Pending
    }

    pub fn result(&self) -> Option<f64> {
        match self.status {
            JobStatus::Completed(result) => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            JobStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}
