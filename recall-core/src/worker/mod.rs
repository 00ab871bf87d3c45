//! # Extraction Worker
//!
//! Consumes extraction jobs from the durable queue, runs the extractor
//! and embedder, persists facts across the three stores, and bumps the
//! user's cache version so derived entries go stale.
//!
//! Settlement policy (at-least-once with poison handling):
//!
//! - success → ack
//! - transient failure (store timeout, rate limit, open breaker) →
//!   requeue; the job row is left as-is so the redelivery can continue it
//! - permanent failure (missing job, malformed body, unrecoverable
//!   provider error) → the job is marked failed (best-effort) and the
//!   message is rejected without requeue

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::cache::RemoteCache;
use crate::config::WorkerConfig;
use crate::embeddings::Embedder;
use crate::error::{Error, Result};
use crate::extraction::FactExtractor;
use crate::jobs::{ExtractionJobMessage, JobManager, JobUpdate};
use crate::repository::FactRepository;
use crate::stores::{Disposition, MessageQueue};
use crate::types::{Fact, Metadata};

/// Queue consumer driving the extraction pipeline.
pub struct ExtractionWorker {
    queue: Arc<dyn MessageQueue>,
    jobs: Arc<JobManager>,
    extractor: Arc<dyn FactExtractor>,
    embedder: Arc<dyn Embedder>,
    repository: Arc<FactRepository>,
    remote: Arc<RemoteCache>,
    config: WorkerConfig,
}

impl ExtractionWorker {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        jobs: Arc<JobManager>,
        extractor: Arc<dyn FactExtractor>,
        embedder: Arc<dyn Embedder>,
        repository: Arc<FactRepository>,
        remote: Arc<RemoteCache>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            jobs,
            extractor,
            embedder,
            repository,
            remote,
            config,
        }
    }

    /// Consume until the queue closes. Each delivery is settled according
    /// to the policy above.
    pub async fn run(&self) -> Result<()> {
        let mut consumer = self
            .queue
            .consume(&self.config.queue, self.config.prefetch)
            .await?;
        info!(
            "Extraction worker consuming from '{}' (prefetch={})",
            self.config.queue, self.config.prefetch
        );

        while let Some(delivery) = consumer.next().await? {
            let disposition = self.handle(&delivery.body).await;
            consumer.settle(delivery.tag, disposition).await?;
        }

        info!("Extraction worker stopped: queue closed");
        Ok(())
    }

    /// Process one message body and decide its settlement.
    pub async fn handle(&self, body: &[u8]) -> Disposition {
        let message: ExtractionJobMessage = match serde_json::from_slice(body) {
            Ok(message) => message,
            Err(e) => {
                error!("Malformed extraction message, rejecting: {e}");
                return Disposition::Reject;
            }
        };

        let job_id = message.job_id.clone();
        match self.process(message).await {
            Ok(()) => Disposition::Ack,
            Err(e) if e.should_requeue() => {
                warn!("Transient failure processing job {job_id}, requeueing: {e}");
                Disposition::Requeue
            }
            Err(e) => {
                error!("Permanent failure processing job {job_id}, rejecting: {e}");
                self.mark_failed(&job_id, &e).await;
                Disposition::Reject
            }
        }
    }

    async fn process(&self, message: ExtractionJobMessage) -> Result<()> {
        info!("Processing extraction job: job_id={}", message.job_id);

        let job = self.jobs.get_job_status(&message.job_id).await?;
        if job.status.is_terminal() {
            // Redelivery of an already-settled job; ack it away.
            info!(
                "Job {} already {}, skipping duplicate delivery",
                job.id, job.status
            );
            return Ok(());
        }

        self.jobs
            .update_job_status(
                &message.job_id,
                JobUpdate::processing(10, "Extracting facts from conversation"),
            )
            .await?;

        let candidates = self.extractor.extract(&message.conversation).await?;
        if candidates.is_empty() {
            warn!("No facts extracted from conversation {}", message.conversation_id);
            return self.complete(&message.job_id, &message.user_id, 0).await;
        }

        self.jobs
            .update_job_status(
                &message.job_id,
                JobUpdate::processing(50, "Storing extracted facts"),
            )
            .await?;

        let contents: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&contents).await?;

        let mut stored = 0usize;
        for (i, candidate) in candidates.into_iter().enumerate() {
            let mut metadata = message.metadata.clone();
            metadata.insert(
                "conversation_id".to_string(),
                serde_json::Value::from(message.conversation_id.clone()),
            );

            let mut fact = Fact::new(
                &message.user_id,
                candidate.content,
                candidate.category,
                candidate.confidence.clamp(0.0, 1.0),
            )
            .with_entities(candidate.entities)
            .with_metadata(metadata);
            if let Some(embedding) = embeddings.get(i) {
                fact = fact.with_embedding(embedding.clone());
            }

            // One bad fact does not abort the batch.
            match self.repository.create(&fact).await {
                Ok(_) => stored += 1,
                Err(e) => error!("Error storing fact {}: {e}", fact.id),
            }
        }

        self.complete(&message.job_id, &message.user_id, stored).await
    }

    async fn complete(&self, job_id: &str, user_id: &str, facts_extracted: usize) -> Result<()> {
        // Stale derived entries must miss from now on.
        self.remote.bump_user_version(user_id).await;

        let mut data = Metadata::new();
        data.insert(
            "facts_extracted".to_string(),
            serde_json::Value::from(facts_extracted),
        );
        if let Err(e) = self
            .jobs
            .update_job_status(job_id, JobUpdate::completed(data))
            .await
        {
            // The extract already happened; a failed bookkeeping write
            // must not undo it.
            warn!("Failed to mark job {job_id} completed: {e}");
        }

        info!(
            "Successfully processed extraction job: job_id={job_id}, facts_extracted={facts_extracted}"
        );
        Ok(())
    }

    async fn mark_failed(&self, job_id: &str, cause: &Error) {
        if let Err(e) = self
            .jobs
            .update_job_status(job_id, JobUpdate::failed(cause.to_string()))
            .await
        {
            warn!("Failed to mark job {job_id} failed: {e}");
        }
    }
}
