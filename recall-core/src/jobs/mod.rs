//! # Extraction Job Lifecycle
//!
//! Jobs are persisted in the metadata store before being enqueued, so a
//! broker outage at submit time leaves a `pending` row a reconciler can
//! pick up instead of losing the request. Status moves monotonically
//! through pending → processing → {completed, failed}; terminal states
//! are final.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::stores::{MessageQueue, MetadataStore};
use crate::types::{ConversationTurn, ExtractionRequest, Job, JobStatus, Metadata};

/// Queue message carrying one extraction job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionJobMessage {
    pub job_id: String,
    pub user_id: String,
    pub conversation_id: String,
    pub conversation: Vec<ConversationTurn>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Field updates applied by [`JobManager::update_job_status`].
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub current_step: Option<String>,
    pub data: Option<Metadata>,
    pub error: Option<String>,
}

impl JobUpdate {
    /// Convenience for a progress step within `processing`.
    #[must_use]
    pub fn processing(progress: u8, step: &str) -> Self {
        Self {
            status: Some(JobStatus::Processing),
            progress: Some(progress),
            current_step: Some(step.to_string()),
            ..Self::default()
        }
    }

    /// Convenience for a successful completion.
    #[must_use]
    pub fn completed(data: Metadata) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(100),
            current_step: Some("Completed".to_string()),
            data: Some(data),
            ..Self::default()
        }
    }

    /// Convenience for a terminal failure.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Manages extraction job records and their queue handoff.
pub struct JobManager {
    metadata: Arc<dyn MetadataStore>,
    queue: Arc<dyn MessageQueue>,
    queue_name: String,
}

impl JobManager {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        queue: Arc<dyn MessageQueue>,
        queue_name: impl Into<String>,
    ) -> Self {
        Self {
            metadata,
            queue,
            queue_name: queue_name.into(),
        }
    }

    /// Create a job and enqueue it for processing.
    ///
    /// The job row is persisted first; a publish failure is logged and the
    /// create still succeeds (the row stays `pending` until a reconciler
    /// or a worker poll finds it).
    pub async fn create_extraction_job(&self, request: &ExtractionRequest) -> Result<Job> {
        request.validate()?;

        let job = Job::queued(&request.user_id, &request.conversation_id);
        self.metadata.insert_job(&job).await?;
        info!("Created job: id={}", job.id);

        let message = ExtractionJobMessage {
            job_id: job.id.clone(),
            user_id: request.user_id.clone(),
            conversation_id: request.conversation_id.clone(),
            conversation: request.conversation.clone(),
            metadata: request.metadata.clone(),
        };
        let body = serde_json::to_vec(&message)?;
        match self.queue.publish(&self.queue_name, &body).await {
            Ok(()) => info!("Enqueued job to {}: id={}", self.queue_name, job.id),
            Err(e) => warn!(
                "Job created but not enqueued (broker unavailable): id={}, error={e}. \
                 The job stays pending until a reconciler picks it up.",
                job.id
            ),
        }

        Ok(job)
    }

    /// Fetch a job or fail with `NotFound`.
    pub async fn get_job_status(&self, job_id: &str) -> Result<Job> {
        self.metadata
            .job_by_id(job_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Job not found: {job_id}")))
    }

    /// Apply a monotonic status update.
    ///
    /// Transitions out of a terminal state and status regressions are
    /// rejected with a `Validation` error. Entering a terminal state
    /// stamps `completed_at`.
    pub async fn update_job_status(&self, job_id: &str, update: JobUpdate) -> Result<Job> {
        let mut job = self.get_job_status(job_id).await?;

        if let Some(status) = update.status {
            if job.status.is_terminal() {
                return Err(Error::Validation(format!(
                    "job {job_id} is already {} and cannot transition to {status}",
                    job.status
                )));
            }
            if status.rank() < job.status.rank() {
                return Err(Error::Validation(format!(
                    "job {job_id} cannot regress from {} to {status}",
                    job.status
                )));
            }
            job.status = status;
            if status.is_terminal() {
                job.completed_at = Some(Utc::now());
            }
        }

        if let Some(progress) = update.progress {
            job.progress = progress.min(100);
        }
        if let Some(step) = update.current_step {
            job.current_step = step;
        }
        if let Some(data) = update.data {
            job.data = data;
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }

        self.metadata.update_job(&job).await?;
        info!("Updated job: id={job_id}, status={}", job.status);
        Ok(job)
    }
}
