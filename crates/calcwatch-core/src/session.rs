use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use calcwatch_common::{Job, JobId, ServerRecord, Settings};
use calcwatch_store::KvStore;

use crate::cluster::ClusterApi;
use crate::error::{ClusterError, SubmitError};
use crate::events::{DisplayEvent, EventBus, EventStream};
use crate::health::HealthMonitor;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::registry::JobRegistry;
use crate::schedule::PollingHandle;
use crate::settings::SettingsStore;
use crate::submit::Submitter;

/// One client bound to one cluster and one local state store.
///
/// Hosts (the CLI, a UI) drive everything through this type and render the
/// stream returned by [`subscribe`](Self::subscribe).
pub struct Session {
    api: Arc<dyn ClusterApi>,
    registry: Arc<JobRegistry>,
    settings: SettingsStore,
    bus: EventBus,
    submitter: Submitter,
    reconciler: Arc<Reconciler>,
    health: Arc<HealthMonitor>,
    polling: Mutex<Option<PollingHandle>>,
    health_polling: Mutex<Option<PollingHandle>>,
}

impl Session {
    pub async fn open(api: Arc<dyn ClusterApi>, store: Arc<dyn KvStore>) -> Result<Self> {
        let registry = Arc::new(JobRegistry::open(store.clone()).await?);
        let bus = EventBus::default();
        Ok(Self {
            submitter: Submitter::new(api.clone(), registry.clone(), bus.clone()),
            reconciler: Arc::new(Reconciler::new(api.clone(), registry.clone(), bus.clone())),
            health: Arc::new(HealthMonitor::new(api.clone(), bus.clone())),
            settings: SettingsStore::new(store),
            polling: Mutex::new(None),
            health_polling: Mutex::new(None),
            api,
            registry,
            bus,
        })
    }

    pub fn subscribe(&self) -> EventStream {
        self.bus.subscribe()
    }

    /// Submit with the durations currently stored in settings.
    pub async fn submit(&self, expression: &str) -> Result<JobId, SubmitError> {
        let settings = match self.settings.load().await {
            Ok(settings) => settings,
            Err(e) => {
                let err = SubmitError::Storage(e);
                self.bus.emit(DisplayEvent::JobRejected {
                    expression: expression.to_string(),
                    message: err.display_message(),
                });
                return Err(err);
            }
        };
        self.submitter.submit(expression, &settings).await
    }

    pub async fn submit_with(
        &self,
        expression: &str,
        settings: &Settings,
    ) -> Result<JobId, SubmitError> {
        self.submitter.submit(expression, settings).await
    }

    pub async fn poll_once(&self) -> ReconcileReport {
        self.reconciler.poll_once().await
    }

    /// Start the reconcile timer, replacing any running one.
    pub async fn start_polling(&self, interval: Duration) {
        let handle = self.reconciler.start_polling(interval);
        if let Some(previous) = self.polling.lock().await.replace(handle) {
            previous.stop();
        }
    }

    pub async fn stop_polling(&self) {
        if let Some(handle) = self.polling.lock().await.take() {
            handle.stop();
            info!("reconcile polling stopped");
        }
    }

    pub async fn fetch_health(&self) -> Vec<ServerRecord> {
        self.health.fetch_health().await
    }

    pub async fn start_health_polling(&self, interval: Duration) {
        let handle = self.health.start_health_polling(interval);
        if let Some(previous) = self.health_polling.lock().await.replace(handle) {
            previous.stop();
        }
    }

    pub async fn stop_health_polling(&self) {
        if let Some(handle) = self.health_polling.lock().await.take() {
            handle.stop();
            info!("health polling stopped");
        }
    }

    /// Schedule one sweep of unreachable servers `timeout_secs` from now.
    pub fn apply_eviction_policy(&self, timeout_secs: u64) -> JoinHandle<usize> {
        self.health.schedule_eviction(Duration::from_secs(timeout_secs))
    }

    /// Settings-applied hook: resolve the inactivity timeout and schedule a
    /// sweep with it. Returns the timeout used.
    pub async fn apply_settings(&self) -> Result<u64> {
        let timeout = self.settings.resolve_inactivity_timeout().await?;
        self.apply_eviction_policy(timeout);
        Ok(timeout)
    }

    /// Clear jobs on the cluster, then locally. A failed request leaves the
    /// local registry as it was.
    pub async fn clear_all(&self) -> Result<(), ClusterError> {
        if let Err(e) = self.api.clear_jobs().await {
            warn!(error=%e, "failed to clear jobs on cluster");
            return Err(e.into());
        }
        self.registry
            .clear_all()
            .await
            .map_err(ClusterError::Storage)?;
        info!("all jobs cleared");
        self.bus.emit(DisplayEvent::JobsCleared);
        Ok(())
    }

    pub async fn load_all(&self) -> Result<Vec<Job>, ClusterError> {
        self.reconciler.load_all().await
    }

    pub async fn get_settings(&self) -> Result<Settings> {
        self.settings.load().await
    }

    /// Persist settings, then run the settings-applied hook.
    pub async fn save_settings(&self, settings: &Settings) -> Result<u64> {
        self.settings.save(settings).await?;
        self.apply_settings().await
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.registry.jobs().await
    }

    pub async fn servers(&self) -> Vec<ServerRecord> {
        self.health.servers().await
    }
}
