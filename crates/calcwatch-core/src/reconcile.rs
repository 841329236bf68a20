use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use calcwatch_common::{Job, JobStatus};

use crate::cluster::ClusterApi;
use crate::error::ClusterError;
use crate::events::{DisplayEvent, EventBus};
use crate::registry::{JobRegistry, TransitionOutcome};
use crate::schedule::{spawn_every, PollingHandle};

/// Default reconcile interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Tally of one reconcile cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Pending jobs looked up this cycle.
    pub polled: usize,
    pub completed: usize,
    pub failed: usize,
    /// Lookups that came back without a terminal status.
    pub still_pending: usize,
    /// Lookups or local writes that failed; retried next cycle.
    pub errors: usize,
    /// Terminal answers that no longer applied (job cleared or already terminal).
    pub discarded: usize,
}

/// Drives pending jobs toward a terminal status by asking the cluster.
///
/// The timer and manual triggers both call [`poll_once`](Self::poll_once);
/// nothing distinguishes the two callers.
pub struct Reconciler {
    api: Arc<dyn ClusterApi>,
    registry: Arc<JobRegistry>,
    bus: EventBus,
}

impl Reconciler {
    pub fn new(api: Arc<dyn ClusterApi>, registry: Arc<JobRegistry>, bus: EventBus) -> Self {
        Self { api, registry, bus }
    }

    /// Look up every pending job at once and apply answers as they arrive.
    ///
    /// Only an explicit terminal status moves a job; inconclusive answers and
    /// failed lookups leave it pending for the next cycle.
    pub async fn poll_once(&self) -> ReconcileReport {
        let snapshot = self.registry.pending_snapshot().await;
        let epoch = snapshot.epoch;
        let mut report = ReconcileReport {
            polled: snapshot.ids.len(),
            ..Default::default()
        };
        if snapshot.ids.is_empty() {
            return report;
        }

        let mut lookups: FuturesUnordered<_> = snapshot
            .ids
            .into_iter()
            .map(|id| {
                let api = Arc::clone(&self.api);
                async move {
                    let reply = api.get_job(&id).await;
                    (id, reply)
                }
            })
            .collect();

        while let Some((id, reply)) = lookups.next().await {
            let lookup = match reply {
                Ok(lookup) => lookup,
                Err(e) => {
                    warn!(job_id=%id, error=%e, "job lookup failed, will retry next cycle");
                    report.errors += 1;
                    continue;
                }
            };

            let Some(status) = lookup.terminal_status() else {
                debug!(job_id=%id, status=%lookup.status, "job still pending");
                report.still_pending += 1;
                continue;
            };

            match self.registry.apply_transition_at(epoch, &id, status).await {
                Ok(TransitionOutcome::Applied(job)) => {
                    match &job.status {
                        JobStatus::Completed(result) => {
                            info!(job_id=%id, result, "job completed");
                            report.completed += 1;
                        }
                        JobStatus::Failed(error) => {
                            info!(job_id=%id, error=%error, "job failed");
                            report.failed += 1;
                        }
                        JobStatus::Pending => {}
                    }
                    self.bus.emit(DisplayEvent::JobUpdated(job));
                }
                Ok(outcome) => {
                    debug!(job_id=%id, ?outcome, "discarding stale lookup result");
                    report.discarded += 1;
                }
                Err(e) => {
                    warn!(job_id=%id, error=%e, "failed to record job transition");
                    report.errors += 1;
                }
            }
        }

        info!(
            polled = report.polled,
            completed = report.completed,
            failed = report.failed,
            still_pending = report.still_pending,
            errors = report.errors,
            "reconcile cycle finished"
        );
        report
    }

    /// Replace the registry with the cluster's full job listing.
    pub async fn load_all(&self) -> Result<Vec<Job>, ClusterError> {
        let remote = self.api.list_jobs().await?;
        let jobs = remote
            .into_iter()
            .map(|r| {
                let status = r.local_status();
                Job {
                    id: r.id,
                    expression: r.operation,
                    status,
                    submitted_at_ms: 0,
                }
            })
            .collect();

        self.registry
            .bulk_replace(jobs)
            .await
            .map_err(ClusterError::Storage)?;
        let jobs = self.registry.jobs().await;
        info!(jobs = jobs.len(), "loaded job listing from cluster");
        self.bus.emit(DisplayEvent::JobsReplaced(jobs.clone()));
        Ok(jobs)
    }

    pub fn start_polling(self: &Arc<Self>, interval: Duration) -> PollingHandle {
        let this = Arc::clone(self);
        spawn_every(interval, "reconcile", move || {
            let this = Arc::clone(&this);
            async move {
                this.poll_once().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use calcwatch_common::{JobId, RemoteJob};
    use calcwatch_store::MemoryKvStore;

    use crate::fake::{lookup, FakeCluster};

    async fn setup(ids: &[&str]) -> (Arc<Reconciler>, Arc<FakeCluster>, Arc<JobRegistry>, EventBus) {
        let fake = FakeCluster::new();
        let registry = Arc::new(
            JobRegistry::open(Arc::new(MemoryKvStore::new()))
                .await
                .unwrap(),
        );
        for id in ids {
            registry
                .record_created(JobId::from(*id), "3+4")
                .await
                .unwrap();
        }
        let bus = EventBus::default();
        let reconciler = Arc::new(Reconciler::new(fake.clone(), registry.clone(), bus.clone()));
        (reconciler, fake, registry, bus)
    }

    #[tokio::test]
    async fn test_pending_then_completed() {
        let (reconciler, fake, registry, bus) = setup(&["1"]).await;
        let mut events = bus.subscribe();
        let id = JobId::from("1");

        fake.set_lookup("1", Ok(lookup("pending", None)));
        let report = reconciler.poll_once().await;
        assert_eq!(report.still_pending, 1);
        assert!(registry.get(&id).await.unwrap().is_pending());

        fake.set_lookup("1", Ok(lookup("completed", Some(14.0))));
        let report = reconciler.poll_once().await;
        assert_eq!(report.completed, 1);
        let job = registry.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed(14.0));
        assert_eq!(events.next().await, Some(DisplayEvent::JobUpdated(job)));
    }

    #[tokio::test]
    async fn test_completed_without_result_stays_pending() {
        let (reconciler, fake, registry, _) = setup(&["1"]).await;
        fake.set_lookup("1", Ok(lookup("completed", None)));

        let report = reconciler.poll_once().await;
        assert_eq!(report.still_pending, 1);
        assert!(registry.get(&JobId::from("1")).await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_explicit_error_fails_job() {
        let (reconciler, fake, registry, _) = setup(&["1"]).await;
        let mut reply = lookup("error", None);
        reply.error = Some("overflow".to_string());
        fake.set_lookup("1", Ok(reply));

        let report = reconciler.poll_once().await;
        assert_eq!(report.failed, 1);
        assert_eq!(
            registry.get(&JobId::from("1")).await.unwrap().status,
            JobStatus::Failed("overflow".to_string())
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_does_not_block_others() {
        let (reconciler, fake, registry, _) = setup(&["1", "2", "3"]).await;
        fake.set_lookup("1", Err("connection reset".to_string()));
        fake.set_lookup("2", Ok(lookup("completed", Some(2.0))));
        fake.set_lookup("3", Ok(lookup("completed", Some(3.0))));

        let report = reconciler.poll_once().await;
        assert_eq!(report.polled, 3);
        assert_eq!(report.errors, 1);
        assert_eq!(report.completed, 2);
        assert!(registry.get(&JobId::from("1")).await.unwrap().is_pending());

        // Retried on the next cycle.
        fake.set_lookup("1", Ok(lookup("completed", Some(1.0))));
        let report = reconciler.poll_once().await;
        assert_eq!(report.polled, 1);
        assert_eq!(report.completed, 1);
        assert!(registry.pending_snapshot().await.ids.is_empty());
    }

    #[tokio::test]
    async fn test_slow_lookup_does_not_delay_other_transitions() {
        let (reconciler, fake, registry, bus) = setup(&["slow", "fast"]).await;
        let mut events = bus.subscribe();
        let gate = fake.hold_lookup("slow");
        fake.set_lookup("slow", Ok(lookup("completed", Some(1.0))));
        fake.set_lookup("fast", Ok(lookup("completed", Some(2.0))));

        let cycle = tokio::spawn({
            let reconciler = reconciler.clone();
            async move { reconciler.poll_once().await }
        });

        match events.next().await {
            Some(DisplayEvent::JobUpdated(job)) => assert_eq!(job.id, JobId::from("fast")),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(registry.get(&JobId::from("slow")).await.unwrap().is_pending());

        gate.notify_one();
        let report = cycle.await.unwrap();
        assert_eq!(report.completed, 2);
    }

    #[tokio::test]
    async fn test_clear_during_poll_does_not_resurrect() {
        let (reconciler, fake, registry, _) = setup(&["1"]).await;
        let gate = fake.hold_lookup("1");

        let cycle = tokio::spawn({
            let reconciler = reconciler.clone();
            async move { reconciler.poll_once().await }
        });
        while fake.lookup_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        registry.clear_all().await.unwrap();
        fake.set_lookup("1", Ok(lookup("completed", Some(7.0))));
        gate.notify_one();

        let report = cycle.await.unwrap();
        assert_eq!(report.discarded, 1);
        assert_eq!(report.completed, 0);
        assert!(registry.all_known_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_not_polled() {
        let (reconciler, fake, registry, _) = setup(&["1"]).await;
        registry
            .apply_transition(&JobId::from("1"), JobStatus::Completed(7.0))
            .await
            .unwrap();
        fake.set_lookup("1", Ok(lookup("work", None)));

        let report = reconciler.poll_once().await;
        assert_eq!(report, ReconcileReport::default());
        assert_eq!(fake.lookup_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            registry.get(&JobId::from("1")).await.unwrap().status,
            JobStatus::Completed(7.0)
        );
    }

    #[tokio::test]
    async fn test_load_all_replaces_registry() {
        let (reconciler, fake, registry, _) = setup(&["stale"]).await;
        fake.set_listing(vec![
            RemoteJob {
                id: JobId::from("10"),
                operation: "2+2".to_string(),
                status: "completed".to_string(),
                result: Some(4.0),
                error: None,
            },
            RemoteJob {
                id: JobId::from("11"),
                operation: "3*3".to_string(),
                status: "work".to_string(),
                result: None,
                error: None,
            },
        ]);

        let jobs = reconciler.load_all().await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].status, JobStatus::Completed(4.0));
        assert_eq!(jobs[1].expression, "3*3");
        assert_eq!(
            registry.pending_snapshot().await.ids,
            vec![JobId::from("11")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_timer_runs_reconcile() {
        let (reconciler, fake, registry, bus) = setup(&["1"]).await;
        let mut events = bus.subscribe();
        fake.set_lookup("1", Ok(lookup("completed", Some(14.0))));

        let started = tokio::time::Instant::now();
        let handle = reconciler.start_polling(Duration::from_secs(60));

        assert!(matches!(events.next().await, Some(DisplayEvent::JobUpdated(_))));
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert_eq!(
            registry.get(&JobId::from("1")).await.unwrap().result(),
            Some(14.0)
        );

        assert!(handle.is_running());
        handle.stop();
    }
}
