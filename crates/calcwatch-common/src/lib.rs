pub mod job;
pub mod server;
pub mod settings;
pub mod wire;

pub use job::{Job, JobId, JobStatus};
pub use server::{LoadGauge, ServerKind, ServerRecord};
pub use settings::{OperationDurations, Settings, DEFAULT_INACTIVITY_TIMEOUT_SECS};
pub use wire::{
    JobLookup, OrchestratorStatus, RemoteJob, SubmitRequest, SubmitResponse, WorkerStatus,
};

pub mod telemetry;
