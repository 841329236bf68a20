//! Client-side engine for submitting arithmetic jobs to a remote
//! computation cluster and tracking them to completion.

pub mod cluster;
pub mod error;
pub mod events;
pub mod health;
pub mod reconcile;
pub mod registry;
pub mod schedule;
pub mod session;
pub mod settings;
pub mod submit;
pub mod validate;

#[cfg(test)]
mod fake;

pub use cluster::{ClientConfig, ClusterApi, HttpClusterClient};
pub use error::{ClusterError, Rejection, SubmitError, TransportError};
pub use events::{DisplayEvent, EventBus, EventStream};
pub use health::HealthMonitor;
pub use reconcile::{ReconcileReport, Reconciler, DEFAULT_POLL_INTERVAL};
pub use registry::{JobRegistry, PendingSnapshot, TransitionOutcome};
pub use schedule::PollingHandle;
pub use session::Session;
pub use settings::SettingsStore;
pub use submit::Submitter;
pub use validate::validate;
