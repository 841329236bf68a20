use std::sync::Arc;

use calcwatch_common::{JobId, Settings, SubmitRequest, SubmitResponse};

use crate::cluster::ClusterApi;
use crate::error::SubmitError;
use crate::events::{DisplayEvent, EventBus};
use crate::registry::JobRegistry;
use crate::validate::validate;

/// Validates expressions and hands them to the cluster.
pub struct Submitter {
    api: Arc<dyn ClusterApi>,
    registry: Arc<JobRegistry>,
    bus: EventBus,
}

impl Submitter {
    pub fn new(api: Arc<dyn ClusterApi>, registry: Arc<JobRegistry>, bus: EventBus) -> Self {
        Self { api, registry, bus }
    }

    /// Submit one expression. Every failure is also shown as a rejected
    /// entry carrying the original expression; nothing is retried.
    pub async fn submit(&self, expression: &str, settings: &Settings) -> Result<JobId, SubmitError> {
        match self.try_submit(expression, settings).await {
            Ok(id) => Ok(id),
            Err(e) => {
                tracing::warn!(expression, error=%e, "submission failed");
                self.bus.emit(DisplayEvent::JobRejected {
                    expression: expression.to_string(),
                    message: e.display_message(),
                });
                Err(e)
            }
        }
    }

    async fn try_submit(&self, expression: &str, settings: &Settings) -> Result<JobId, SubmitError> {
        validate(expression)?;

        let request = SubmitRequest::new(expression, settings);
        let id = match self.api.submit(&request).await? {
            SubmitResponse::Created { id, operation } => {
                if operation != expression {
                    tracing::debug!(job_id=%id, expression, operation=%operation, "cluster echoed a different operation");
                }
                id
            }
            SubmitResponse::Error { error } => return Err(SubmitError::Submission(error)),
        };

        let job = self
            .registry
            .record_created(id.clone(), expression)
            .await
            .map_err(SubmitError::Storage)?;
        tracing::info!(job_id=%id, expression, "job submitted");
        self.bus.emit(DisplayEvent::JobAdded(job));
        Ok(id)
    }
}
