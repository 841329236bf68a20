use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServerKind {
    Orchestrator,
    Worker,
}

impl ServerKind {
    pub fn label(self) -> &'static str {
        match self {
            ServerKind::Orchestrator => "Orchestrator",
            ServerKind::Worker => "Worker",
        }
    }
}

/// Concurrency gauge reported by a running worker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadGauge {
    pub current: u32,
    pub max: u32,
}

/// One health observation of a cluster member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerRecord {
    pub kind: ServerKind,
    pub url: String,
    pub reachable: bool,
    pub detail: String,
    /// Only present for reachable workers.
    pub load: Option<LoadGauge>,
    pub observed_at: DateTime<Utc>,
}

impl ServerRecord {
    /// Placeholder for a member (or the whole worker pool) whose health
    /// endpoint could not be queried.
    pub fn unavailable(kind: ServerKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            reachable: false,
            detail: "unavailable".to_string(),
            load: None,
            observed_at: Utc::now(),
        }
    }

    /// Unreachable records linger on the health board until an eviction sweep.
    pub fn is_stale_candidate(&self) -> bool {
        !self.reachable
    }
}
