use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use calcwatch_common::{ServerKind, ServerRecord, WorkerStatus};

use crate::cluster::ClusterApi;
use crate::events::{DisplayEvent, EventBus};
use crate::schedule::{spawn_every, PollingHandle};

#[derive(Debug, Default)]
struct Board {
    records: Vec<ServerRecord>,
    /// Bumped every time a cycle clears the board.
    generation: u64,
}

/// Keeps the health board: the latest observation of every cluster member.
pub struct HealthMonitor {
    api: Arc<dyn ClusterApi>,
    bus: EventBus,
    board: Mutex<Board>,
}

impl HealthMonitor {
    pub fn new(api: Arc<dyn ClusterApi>, bus: EventBus) -> Self {
        Self {
            api,
            bus,
            board: Mutex::new(Board::default()),
        }
    }

    /// Replace the board with a fresh observation of the orchestrator and
    /// every worker. The two queries run concurrently and each publishes its
    /// records as soon as it resolves. Failures become unreachable records.
    ///
    /// A cycle overtaken by a newer one drops whatever it has not yet
    /// published, so the board only ever holds the newest cycle's records.
    pub async fn fetch_health(&self) -> Vec<ServerRecord> {
        let generation = {
            let mut board = self.board.lock().await;
            board.records.clear();
            board.generation += 1;
            self.bus.emit(DisplayEvent::HealthCleared);
            board.generation
        };

        tokio::join!(
            self.observe_orchestrator(generation),
            self.observe_workers(generation)
        );

        let board = self.servers().await;
        info!(
            servers = board.len(),
            unreachable = board.iter().filter(|r| !r.reachable).count(),
            "health board refreshed"
        );
        board
    }

    async fn observe_orchestrator(&self, generation: u64) {
        let url = self.api.orchestrator_url();
        let record = match self.api.orchestrator_health().await {
            Ok(status) => {
                let state = if status.running { "Running" } else { "Not Running" };
                ServerRecord {
                    kind: ServerKind::Orchestrator,
                    url,
                    reachable: status.running,
                    detail: format!("{state} - {}", status.message),
                    load: None,
                    observed_at: Utc::now(),
                }
            }
            Err(e) => {
                warn!(url=%url, error=%e, "orchestrator health check failed");
                ServerRecord::unavailable(ServerKind::Orchestrator, url)
            }
        };
        self.publish(generation, vec![record]).await;
    }

    async fn observe_workers(&self, generation: u64) {
        let records = match self.api.worker_health().await {
            Ok(entries) => entries.into_iter().map(worker_record).collect(),
            Err(e) => {
                let url = self.api.worker_listing_url();
                warn!(url=%url, error=%e, "worker health check failed");
                vec![ServerRecord::unavailable(ServerKind::Worker, url)]
            }
        };
        self.publish(generation, records).await;
    }

    async fn publish(&self, generation: u64, records: Vec<ServerRecord>) {
        let mut board = self.board.lock().await;
        if board.generation != generation {
            debug!(
                stale = records.len(),
                generation,
                current = board.generation,
                "dropping records from superseded health cycle"
            );
            return;
        }
        board.records.extend(records.iter().cloned());
        for record in records {
            self.bus.emit(DisplayEvent::ServerObserved(record));
        }
    }

    pub async fn servers(&self) -> Vec<ServerRecord> {
        self.board.lock().await.records.clone()
    }

    /// Drop every record currently flagged unreachable.
    pub async fn evict_stale(&self) -> usize {
        let evicted: Vec<ServerRecord> = {
            let mut board = self.board.lock().await;
            let (stale, kept): (Vec<_>, Vec<_>) = board
                .records
                .drain(..)
                .partition(ServerRecord::is_stale_candidate);
            board.records = kept;
            stale
        };

        if evicted.is_empty() {
            debug!("eviction sweep found nothing stale");
            return 0;
        }
        let count = evicted.len();
        info!(evicted = count, "evicted unreachable servers");
        self.bus.emit(DisplayEvent::StaleServersEvicted(evicted));
        count
    }

    /// One deferred sweep `after` from now. Earlier sweeps stay scheduled.
    pub fn schedule_eviction(self: &Arc<Self>, after: Duration) -> JoinHandle<usize> {
        let this = Arc::clone(self);
        debug!(after_secs = after.as_secs(), "eviction sweep scheduled");
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            this.evict_stale().await
        })
    }

    pub fn start_health_polling(self: &Arc<Self>, interval: Duration) -> PollingHandle {
        let this = Arc::clone(self);
        spawn_every(interval, "health", move || {
            let this = Arc::clone(&this);
            async move {
                this.fetch_health().await;
            }
        })
    }
}

fn worker_record(entry: Value) -> ServerRecord {
    let fallback_url = entry
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match serde_json::from_value::<WorkerStatus>(entry) {
        Ok(status) => {
            let detail = match (status.running, &status.error) {
                (true, _) => "Running".to_string(),
                (false, Some(error)) => format!("Not Running (Error: {error})"),
                (false, None) => "Not Running".to_string(),
            };
            ServerRecord {
                kind: ServerKind::Worker,
                load: status.load(),
                url: status.url,
                reachable: status.running,
                detail,
                observed_at: Utc::now(),
            }
        }
        Err(e) => {
            warn!(url=%fallback_url, error=%e, "malformed worker status entry");
            ServerRecord {
                kind: ServerKind::Worker,
                url: fallback_url,
                reachable: false,
                detail: format!("malformed status entry: {e}"),
                load: None,
                observed_at: Utc::now(),
            }
        }
    }
}
