use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::Mutex;

use calcwatch_common::{Job, JobId, JobStatus};
use calcwatch_store::{get_json, put_json, KvStore};

const JOBS_KEY: &str = "registry/jobs";

/// What `apply_transition` did.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(Job),
    /// The job is already terminal, or the target was `Pending`.
    Unchanged,
    /// The id is not in the registry (never known, or cleared since).
    Unknown,
    /// The registry was cleared or replaced after the caller took its snapshot.
    Superseded,
}

/// Pending jobs as of one moment, tagged with the registry epoch.
#[derive(Debug, Clone)]
pub struct PendingSnapshot {
    pub epoch: u64,
    pub ids: Vec<JobId>,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: Vec<Job>,
    /// Bumped whenever the job set is wiped wholesale.
    epoch: u64,
}

/// Durable, ordered record of every job this client knows about.
///
/// All mutations go through one async mutex that is held while the new state
/// is persisted, so a mutation is visible only once it is durable and
/// concurrent reconciliation cycles observe a serial history.
pub struct JobRegistry {
    store: Arc<dyn KvStore>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry").finish_non_exhaustive()
    }
}

impl JobRegistry {
    pub async fn open(store: Arc<dyn KvStore>) -> Result<Self> {
        let jobs: Vec<Job> = get_json(store.as_ref(), JOBS_KEY).await?.unwrap_or_default();
        tracing::debug!(jobs = jobs.len(), "loaded job registry");
        Ok(Self {
            store,
            inner: Mutex::new(Inner { jobs, epoch: 0 }),
        })
    }

    async fn persist(&self, jobs: &[Job]) -> Result<()> {
        put_json(self.store.as_ref(), JOBS_KEY, jobs).await
    }

    pub async fn record_created(&self, id: JobId, expression: &str) -> Result<Job> {
        let mut inner = self.inner.lock().await;
        if inner.jobs.iter().any(|j| j.id == id) {
            bail!("job {id} is already registered");
        }
        let job = Job::pending(id, expression);
        let mut next = inner.jobs.clone();
        next.push(job.clone());
        self.persist(&next).await?;
        inner.jobs = next;
        Ok(job)
    }

    pub async fn all_known_ids(&self) -> Vec<JobId> {
        let inner = self.inner.lock().await;
        inner.jobs.iter().map(|j| j.id.clone()).collect()
    }

    pub async fn pending_snapshot(&self) -> PendingSnapshot {
        let inner = self.inner.lock().await;
        PendingSnapshot {
            epoch: inner.epoch,
            ids: inner
                .jobs
                .iter()
                .filter(|j| j.is_pending())
                .map(|j| j.id.clone())
                .collect(),
        }
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.inner.lock().await.jobs.clone()
    }

    pub async fn get(&self, id: &JobId) -> Option<Job> {
        let inner = self.inner.lock().await;
        inner.jobs.iter().find(|j| &j.id == id).cloned()
    }

    /// Move a pending job to a terminal status. The first terminal write wins.
    pub async fn apply_transition(&self, id: &JobId, status: JobStatus) -> Result<TransitionOutcome> {
        let mut inner = self.inner.lock().await;
        self.transition_locked(&mut inner, id, status).await
    }

    /// Like [`apply_transition`](Self::apply_transition), but refuses to touch
    /// the registry if it was cleared or replaced since `epoch` was observed.
    pub async fn apply_transition_at(
        &self,
        epoch: u64,
        id: &JobId,
        status: JobStatus,
    ) -> Result<TransitionOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            return Ok(TransitionOutcome::Superseded);
        }
        self.transition_locked(&mut inner, id, status).await
    }

    async fn transition_locked(
        &self,
        inner: &mut Inner,
        id: &JobId,
        status: JobStatus,
    ) -> Result<TransitionOutcome> {
        let Some(pos) = inner.jobs.iter().position(|j| &j.id == id) else {
            return Ok(TransitionOutcome::Unknown);
        };
        if inner.jobs[pos].status.is_terminal() || !status.is_terminal() {
            return Ok(TransitionOutcome::Unchanged);
        }

        let mut next = inner.jobs.clone();
        next[pos].status = status;
        self.persist(&next).await?;
        inner.jobs = next;
        Ok(TransitionOutcome::Applied(inner.jobs[pos].clone()))
    }

    pub async fn clear_all(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.persist(&[]).await?;
        inner.jobs.clear();
        inner.epoch += 1;
        Ok(())
    }

    /// Replace the whole job set, e.g. with the cluster's full listing.
    pub async fn bulk_replace(&self, jobs: Vec<Job>) -> Result<()> {
        let mut deduped: Vec<Job> = Vec::with_capacity(jobs.len());
        for job in jobs {
            if deduped.iter().any(|j| j.id == job.id) {
                tracing::warn!(job_id=%job.id, "duplicate id in job listing, keeping first");
                continue;
            }
            deduped.push(job);
        }

        let mut inner = self.inner.lock().await;
        self.persist(&deduped).await?;
        inner.jobs = deduped;
        inner.epoch += 1;
        Ok(())
    }
}
