use serde::{Deserialize, Serialize};

pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 60;

/// Simulated per-operation cost in seconds, forwarded to the cluster with each
/// submission. `None` means the stored value was missing or not an integer;
/// it goes out on the wire as `null` and the cluster decides what that means.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationDurations {
    pub add: Option<i64>,
    pub subtract: Option<i64>,
    pub multiply: Option<i64>,
    pub divide: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub durations: OperationDurations,
    /// How long unreachable server records stay on the health board.
    pub inactivity_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            durations: OperationDurations::default(),
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
        }
    }
}
