//! Scriptable in-process cluster used by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use calcwatch_common::{
    JobId, JobLookup, OrchestratorStatus, RemoteJob, SubmitRequest, SubmitResponse,
};

use crate::cluster::ClusterApi;
use crate::error::TransportError;

pub(crate) fn unavailable(body: &str) -> TransportError {
    TransportError::Status {
        status: 503,
        body: body.to_string(),
    }
}

pub(crate) fn lookup(status: &str, result: Option<f64>) -> JobLookup {
    JobLookup {
        status: status.to_string(),
        operation: None,
        result,
        error: None,
    }
}

#[derive(Default)]
pub(crate) struct FakeCluster {
    pub submit_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
    pub clear_calls: AtomicUsize,
    pub worker_calls: AtomicUsize,
    next_id: AtomicU64,
    pub submitted: Mutex<Vec<SubmitRequest>>,
    submit_reply: Mutex<Option<Result<SubmitResponse, String>>>,
    lookups: Mutex<HashMap<JobId, Result<JobLookup, String>>>,
    gates: Mutex<HashMap<JobId, Arc<Notify>>>,
    listing: Mutex<Vec<RemoteJob>>,
    clear_fails: AtomicBool,
    orchestrator: Mutex<Option<Result<OrchestratorStatus, String>>>,
    workers: Mutex<Option<Result<Vec<Value>, String>>>,
    worker_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            ..Default::default()
        })
    }

    pub fn reply_to_submit(&self, reply: Result<SubmitResponse, String>) {
        *self.submit_reply.lock().unwrap() = Some(reply);
    }

    pub fn set_lookup(&self, id: &str, reply: Result<JobLookup, String>) {
        self.lookups.lock().unwrap().insert(JobId::from(id), reply);
    }

    /// Block lookups of `id` until the returned handle is notified.
    pub fn hold_lookup(&self, id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(JobId::from(id), gate.clone());
        gate
    }

    pub fn set_listing(&self, jobs: Vec<RemoteJob>) {
        *self.listing.lock().unwrap() = jobs;
    }

    pub fn fail_clear(&self, fail: bool) {
        self.clear_fails.store(fail, Ordering::SeqCst);
    }

    pub fn set_orchestrator(&self, reply: Result<OrchestratorStatus, String>) {
        *self.orchestrator.lock().unwrap() = Some(reply);
    }

    pub fn set_workers(&self, reply: Result<Vec<Value>, String>) {
        *self.workers.lock().unwrap() = Some(reply);
    }

    /// Block the next worker listing until the returned handle is notified.
    /// Later listings are not held.
    pub fn hold_next_worker_listing(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.worker_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, TransportError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(request.clone());
        let scripted = self.submit_reply.lock().unwrap().clone();
        match scripted {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(e)) => Err(unavailable(&e)),
            None => Ok(SubmitResponse::Created {
                id: JobId::from(self.next_id.fetch_add(1, Ordering::SeqCst)),
                operation: request.operation.clone(),
            }),
        }
    }

    async fn list_jobs(&self) -> Result<Vec<RemoteJob>, TransportError> {
        Ok(self.listing.lock().unwrap().clone())
    }

    async fn get_job(&self, id: &JobId) -> Result<JobLookup, TransportError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().get(id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let reply = self.lookups.lock().unwrap().get(id).cloned();
        match reply {
            Some(Ok(lookup)) => Ok(lookup),
            Some(Err(e)) => Err(unavailable(&e)),
            None => Ok(lookup("work", None)),
        }
    }

    async fn clear_jobs(&self) -> Result<(), TransportError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        if self.clear_fails.load(Ordering::SeqCst) {
            return Err(unavailable("database down"));
        }
        self.listing.lock().unwrap().clear();
        Ok(())
    }

    async fn orchestrator_health(&self) -> Result<OrchestratorStatus, TransportError> {
        let reply = self.orchestrator.lock().unwrap().clone();
        match reply {
            Some(Ok(status)) => Ok(status),
            Some(Err(e)) => Err(unavailable(&e)),
            None => Ok(OrchestratorStatus {
                running: true,
                message: "Orchestrator is running".to_string(),
            }),
        }
    }

    async fn worker_health(&self) -> Result<Vec<Value>, TransportError> {
        self.worker_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.worker_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let reply = self.workers.lock().unwrap().clone();
        match reply {
            Some(Ok(workers)) => Ok(workers),
            Some(Err(e)) => Err(unavailable(&e)),
            None => Ok(Vec::new()),
        }
    }

    fn orchestrator_url(&self) -> String {
        "http://orchestrator.test/".to_string()
    }

    fn worker_listing_url(&self) -> String {
        "http://orchestrator.test/ping-servers".to_string()
    }
}
