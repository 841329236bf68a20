use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use calcwatch_common::{
    JobId, JobLookup, OrchestratorStatus, RemoteJob, SubmitRequest, SubmitResponse,
};

use crate::error::TransportError;

const SUBMIT_PATH: &str = "/submit-calculation";
const LIST_PATH: &str = "/get-all-calculations";
const LOOKUP_PATH: &str = "/get-calculation-result";
const CLEAR_PATH: &str = "/clear-all-calculations";
const ORCHESTRATOR_STATUS_PATH: &str = "/orchestrator-status";
const WORKER_STATUS_PATH: &str = "/ping-servers";

/// The remote computation cluster, as seen through its orchestrator.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, TransportError>;
    async fn list_jobs(&self) -> Result<Vec<RemoteJob>, TransportError>;
    async fn get_job(&self, id: &JobId) -> Result<JobLookup, TransportError>;
    async fn clear_jobs(&self) -> Result<(), TransportError>;
    async fn orchestrator_health(&self) -> Result<OrchestratorStatus, TransportError>;
    /// Raw worker entries; each one is decoded separately so a single bad
    /// entry does not hide the rest.
    async fn worker_health(&self) -> Result<Vec<Value>, TransportError>;

    /// Identity used for the orchestrator's health record.
    fn orchestrator_url(&self) -> String;
    /// Identity used when the worker listing itself cannot be reached.
    fn worker_listing_url(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Some(Duration::from_secs(10)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClusterClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpClusterClient {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ClusterApi for HttpClusterClient {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, TransportError> {
        let resp = self
            .http
            .post(self.url(SUBMIT_PATH))
            .json(request)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn list_jobs(&self) -> Result<Vec<RemoteJob>, TransportError> {
        let resp = self.http.get(self.url(LIST_PATH)).send().await?;
        // The orchestrator encodes an empty table as `null`.
        let jobs: Option<Vec<RemoteJob>> = Self::read_json(resp).await?;
        Ok(jobs.unwrap_or_default())
    }

    async fn get_job(&self, id: &JobId) -> Result<JobLookup, TransportError> {
        let resp = self
            .http
            .get(self.url(LOOKUP_PATH))
            .query(&[("id", id.as_str())])
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn clear_jobs(&self) -> Result<(), TransportError> {
        let resp = self.http.post(self.url(CLEAR_PATH)).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }

    async fn orchestrator_health(&self) -> Result<OrchestratorStatus, TransportError> {
        let resp = self.http.get(self.url(ORCHESTRATOR_STATUS_PATH)).send().await?;
        Self::read_json(resp).await
    }

    async fn worker_health(&self) -> Result<Vec<Value>, TransportError> {
        let resp = self.http.get(self.url(WORKER_STATUS_PATH)).send().await?;
        let workers: Option<Vec<Value>> = Self::read_json(resp).await?;
        Ok(workers.unwrap_or_default())
    }

    fn orchestrator_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    fn worker_listing_url(&self) -> String {
        self.url(WORKER_STATUS_PATH)
    }
}
