//! Composed service facade.
//!
//! Builds every pipeline component from one configuration plus a set of
//! injected backends, and owns the shared `Arc` handles. This replaces
//! module-level singletons: per-request state lives in a [`RequestCache`]
//! created at the request boundary.

use std::sync::Arc;

use tracing::info;

use crate::breaker::{BreakerRegistry, CircuitBreakerConfig};
use crate::cache::{keys, EmbeddingCache, RemoteCache, RequestCache, SemanticCache, SummaryCache};
use crate::config::MemoryConfig;
use crate::embeddings::{Embedder, ResilientEmbedder};
use crate::error::Result;
use crate::extraction::{FactExtractor, ResilientExtractor};
use crate::jobs::JobManager;
use crate::proactive::ProactiveCacher;
use crate::repository::FactRepository;
use crate::retry::RetryConfig;
use crate::search::{MemoryOrchestrator, SearchOrchestrator};
use crate::stm::{StmContext, StmStore};
use crate::stores::{GraphStore, KeyValueStore, MessageQueue, MetadataStore, VectorIndex};
use crate::types::{ExtractionRequest, Fact, Job, Role, SearchQuery, SearchResult};
use crate::worker::ExtractionWorker;

/// Concrete backends injected at startup.
pub struct Backends {
    pub kv: Arc<dyn KeyValueStore>,
    pub vector: Arc<dyn VectorIndex>,
    pub graph: Arc<dyn GraphStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub queue: Arc<dyn MessageQueue>,
    pub embedder: Arc<dyn Embedder>,
    pub extractor: Arc<dyn FactExtractor>,
}

/// The assembled memory service.
pub struct MemoryService {
    config: MemoryConfig,
    metadata: Arc<dyn MetadataStore>,
    queue: Arc<dyn MessageQueue>,
    remote: Arc<RemoteCache>,
    summary_cache: Arc<SummaryCache>,
    embedding_cache: Arc<EmbeddingCache>,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn FactExtractor>,
    repository: Arc<FactRepository>,
    stm: Arc<StmStore>,
    search: Arc<SearchOrchestrator>,
    orchestrator: Arc<MemoryOrchestrator>,
    jobs: Arc<JobManager>,
    breakers: Arc<BreakerRegistry>,
}

impl MemoryService {
    /// Wire the full pipeline from configuration and backends.
    ///
    /// The embedder and extractor are wrapped with retry and per-service
    /// circuit breakers before anything else sees them.
    pub fn new(config: MemoryConfig, backends: Backends) -> Self {
        let breakers = Arc::new(BreakerRegistry::new(CircuitBreakerConfig::default()));

        let embedder: Arc<dyn Embedder> = Arc::new(ResilientEmbedder::new(
            backends.embedder,
            RetryConfig::default(),
            breakers.breaker("embedder"),
        ));
        let extractor: Arc<dyn FactExtractor> = Arc::new(ResilientExtractor::new(
            backends.extractor,
            RetryConfig::default(),
            breakers.breaker("extractor"),
        ));

        let remote = Arc::new(RemoteCache::new(
            Arc::clone(&backends.kv),
            config.cache.l1_ttl,
        ));
        let summary_cache = Arc::new(SummaryCache::new(Arc::clone(&backends.metadata)));
        let embedding_cache = Arc::new(EmbeddingCache::new(
            Arc::clone(&backends.kv),
            config.cache.l3_ttl,
        ));
        let semantic = Arc::new(SemanticCache::new(
            Arc::clone(&backends.kv),
            config.cache.semantic_similarity_threshold,
            config.cache.semantic_max_queries,
        ));

        let repository = Arc::new(FactRepository::new(
            Arc::clone(&backends.vector),
            Arc::clone(&backends.graph),
            Arc::clone(&backends.metadata),
            config.hybrid.clone(),
        ));

        let stm = Arc::new(StmStore::new(
            Arc::clone(&backends.kv),
            config.stm.clone(),
        ));

        let search = Arc::new(SearchOrchestrator::new(
            Arc::clone(&remote),
            Arc::clone(&summary_cache),
            semantic,
            Arc::clone(&embedding_cache),
            Arc::clone(&embedder),
            Arc::clone(&repository),
        ));

        let orchestrator = Arc::new(MemoryOrchestrator::new(
            Arc::clone(&stm),
            Arc::clone(&search),
            config.orchestrator.clone(),
        ));

        let jobs = Arc::new(JobManager::new(
            Arc::clone(&backends.metadata),
            Arc::clone(&backends.queue),
            config.worker.queue.clone(),
        ));

        info!("Memory service assembled");
        Self {
            config,
            metadata: backends.metadata,
            queue: backends.queue,
            remote,
            summary_cache,
            embedding_cache,
            embedder,
            extractor,
            repository,
            stm,
            search,
            orchestrator,
            jobs,
            breakers,
        }
    }

    /// Idempotent store initialisation (tables, indexes).
    pub async fn init(&self) -> Result<()> {
        self.metadata.init_schema().await
    }

    /// Combined STM + LTM search for a session.
    pub async fn search(
        &self,
        user_id: &str,
        session_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let scope = RequestCache::new();
        self.orchestrator
            .search(&scope, user_id, session_id, query, limit)
            .await
    }

    /// Long-term-memory search through the cache hierarchy.
    pub async fn search_memories(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let scope = RequestCache::new();
        self.search.search(&scope, query).await
    }

    /// Append one turn to a session's short-term memory.
    pub async fn add_message(
        &self,
        session_id: &str,
        user_id: &str,
        role: Role,
        content: &str,
    ) -> Result<()> {
        self.stm.add_message(session_id, user_id, role, content).await
    }

    /// Three-tier STM snapshot for a session.
    pub async fn stm_context(&self, session_id: &str) -> StmContext {
        self.stm.get_context(session_id).await
    }

    /// Submit a conversation for asynchronous fact extraction.
    pub async fn extract(&self, request: &ExtractionRequest) -> Result<Job> {
        self.jobs.create_extraction_job(request).await
    }

    /// Status of an extraction job.
    pub async fn job_status(&self, job_id: &str) -> Result<Job> {
        self.jobs.get_job_status(job_id).await
    }

    /// Facts for a user, newest first.
    pub async fn user_facts(&self, user_id: &str, limit: usize) -> Result<Vec<Fact>> {
        self.repository.get_by_user(user_id, limit).await
    }

    /// Delete every trace of a user: facts in all three stores, the
    /// favourite summary row, and all derived cache keys.
    pub async fn delete_user_memory(&self, user_id: &str) -> Result<()> {
        self.repository.delete_by_user(user_id).await?;
        self.summary_cache.delete(user_id).await;
        self.remote.scan_del(&keys::user_search_pattern(user_id)).await;
        self.remote.del(&keys::user_favorite_key(user_id)).await;
        info!("Deleted all memory for user {user_id}");
        Ok(())
    }

    /// Build the queue worker for a dedicated consumer context.
    #[must_use]
    pub fn worker(&self) -> ExtractionWorker {
        ExtractionWorker::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.jobs),
            Arc::clone(&self.extractor),
            Arc::clone(&self.embedder),
            Arc::clone(&self.repository),
            Arc::clone(&self.remote),
            self.config.worker.clone(),
        )
    }

    /// Build the proactive cacher for a scheduled context.
    #[must_use]
    pub fn proactive(&self) -> ProactiveCacher {
        ProactiveCacher::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.metadata),
            Arc::clone(&self.summary_cache),
            Arc::clone(&self.remote),
            Arc::clone(&self.embedding_cache),
            Arc::clone(&self.embedder),
            self.config.proactive.clone(),
        )
    }

    /// Shared fact repository handle.
    #[must_use]
    pub fn repository(&self) -> Arc<FactRepository> {
        Arc::clone(&self.repository)
    }

    /// Shared long-term search orchestrator. Callers that hold one
    /// request open across several lookups can reuse a [`RequestCache`]
    /// with it directly.
    #[must_use]
    pub fn search_orchestrator(&self) -> Arc<SearchOrchestrator> {
        Arc::clone(&self.search)
    }

    /// Shared job manager handle.
    #[must_use]
    pub fn jobs(&self) -> Arc<JobManager> {
        Arc::clone(&self.jobs)
    }

    /// Shared distributed cache handle.
    #[must_use]
    pub fn remote_cache(&self) -> Arc<RemoteCache> {
        Arc::clone(&self.remote)
    }

    /// Per-service circuit breakers.
    #[must_use]
    pub fn breakers(&self) -> Arc<BreakerRegistry> {
        Arc::clone(&self.breakers)
    }
}
