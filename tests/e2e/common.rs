//! Shared fixtures for the end-to-end suites.

use std::sync::Arc;
use std::sync::Once;

use recall_core::config::MemoryConfig;
use recall_core::embeddings::Embedder;
use recall_core::service::{Backends, MemoryService};
use recall_core::types::{Fact, FactCandidate, FactCategory};
use recall_store_mem::{
    HashEmbedder, InMemoryGraphStore, InMemoryKv, InMemoryMetadataStore, InMemoryQueue,
    InMemoryVectorIndex, ScriptedExtractor,
};

/// Embedding dimension used across the suites. Large enough that
/// unrelated bag-of-token vectors stay clearly below match scores.
pub const DIM: usize = 64;

static TRACING: Once = Once::new();

/// Install the test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A fully wired service over in-memory backends, with handles kept for
/// white-box assertions.
pub struct TestHarness {
    pub service: MemoryService,
    pub kv: Arc<InMemoryKv>,
    pub vector: Arc<InMemoryVectorIndex>,
    pub graph: Arc<InMemoryGraphStore>,
    pub metadata: Arc<InMemoryMetadataStore>,
    pub queue: Arc<InMemoryQueue>,
    pub embedder: Arc<HashEmbedder>,
    pub extractor: Arc<ScriptedExtractor>,
}

/// Build a harness with the default configuration and scripted
/// extraction candidates.
pub fn harness(candidates: Vec<FactCandidate>) -> TestHarness {
    harness_with(MemoryConfig::default(), candidates)
}

/// Build a harness with a custom configuration.
pub fn harness_with(config: MemoryConfig, candidates: Vec<FactCandidate>) -> TestHarness {
    init_tracing();
    let kv = Arc::new(InMemoryKv::new());
    let vector = Arc::new(InMemoryVectorIndex::new());
    let graph = Arc::new(InMemoryGraphStore::new());
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let queue = Arc::new(InMemoryQueue::new());
    let embedder = Arc::new(HashEmbedder::new(DIM));
    let extractor = Arc::new(ScriptedExtractor::returning(candidates));

    let service = MemoryService::new(
        config,
        Backends {
            kv: Arc::clone(&kv) as _,
            vector: Arc::clone(&vector) as _,
            graph: Arc::clone(&graph) as _,
            metadata: Arc::clone(&metadata) as _,
            queue: Arc::clone(&queue) as _,
            embedder: Arc::clone(&embedder) as _,
            extractor: Arc::clone(&extractor) as _,
        },
    );

    TestHarness {
        service,
        kv,
        vector,
        graph,
        metadata,
        queue,
        embedder,
        extractor,
    }
}

impl TestHarness {
    /// Embed and persist a fact through the repository path.
    pub async fn seed_fact(&self, user_id: &str, content: &str, category: FactCategory) -> Fact {
        let embedding = self.embedder.embed(content).await.unwrap();
        let fact = Fact::new(user_id, content, category, 0.9).with_embedding(embedding);
        self.service.repository().create(&fact).await.unwrap()
    }
}

/// Candidate helper.
pub fn candidate(content: &str, category: FactCategory, confidence: f32) -> FactCandidate {
    FactCandidate {
        content: content.to_string(),
        category,
        confidence,
        entities: Vec::new(),
    }
}
