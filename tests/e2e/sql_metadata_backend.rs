//! The full pipeline running against the libSQL metadata backend instead
//! of the in-memory one: schema bootstrap, ingest, hybrid keyword path,
//! jobs, and the materialised favourite summary all go through SQL.

use std::sync::Arc;

use recall_core::config::MemoryConfig;
use recall_core::service::{Backends, MemoryService};
use recall_core::stores::MetadataStore;
use recall_core::types::{
    ConversationTurn, ExtractionRequest, FactCategory, JobStatus, Metadata, Role, SearchQuery,
};
use recall_e2e_tests::{candidate, DIM};
use recall_store_mem::{
    HashEmbedder, InMemoryGraphStore, InMemoryKv, InMemoryQueue, InMemoryVectorIndex,
    ScriptedExtractor,
};
use recall_store_sql::SqlMetadataStore;

struct SqlHarness {
    service: MemoryService,
    queue: Arc<InMemoryQueue>,
}

async fn sql_harness(candidates: Vec<recall_core::types::FactCandidate>) -> SqlHarness {
    let metadata = Arc::new(SqlMetadataStore::open(":memory:").await.unwrap());
    let queue = Arc::new(InMemoryQueue::new());

    let service = MemoryService::new(
        MemoryConfig::default(),
        Backends {
            kv: Arc::new(InMemoryKv::new()),
            vector: Arc::new(InMemoryVectorIndex::new()),
            graph: Arc::new(InMemoryGraphStore::new()),
            metadata,
            queue: Arc::clone(&queue) as _,
            embedder: Arc::new(HashEmbedder::new(DIM)),
            extractor: Arc::new(ScriptedExtractor::returning(candidates)),
        },
    );
    service.init().await.unwrap();

    SqlHarness { service, queue }
}

fn request() -> ExtractionRequest {
    ExtractionRequest {
        user_id: "u1".to_string(),
        conversation_id: "c1".to_string(),
        conversation: vec![
            ConversationTurn::new(Role::User, "I love pizza and hiking"),
            ConversationTurn::new(Role::Assistant, "got it"),
        ],
        metadata: Metadata::new(),
    }
}

#[tokio::test]
async fn ingest_and_search_through_sql_rows() {
    let h = sql_harness(vec![
        candidate("User loves pizza", FactCategory::Preference, 0.9),
        candidate("User enjoys hiking", FactCategory::Habit, 0.8),
    ])
    .await;

    let job = h.service.extract(&request()).await.unwrap();
    h.queue.close("memory.extraction");
    h.service.worker().run().await.unwrap();

    let job = h.service.job_status(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.data["facts_extracted"], 2);

    let facts = h.service.user_facts("u1", 10).await.unwrap();
    assert_eq!(facts.len(), 2);

    // The hybrid keyword branch runs a SQL LIKE under the hood.
    let query = SearchQuery::new("u1", "pizza").with_score_threshold(0.0);
    let results = h.service.search_memories(&query).await.unwrap();
    assert!(results.iter().any(|r| r.content.contains("pizza")));
}

#[tokio::test]
async fn favourite_summary_materialises_in_sql() {
    let h = sql_harness(vec![candidate(
        "my favorite movie is Up",
        FactCategory::Preference,
        0.9,
    )])
    .await;

    let job = h.service.extract(&request()).await.unwrap();
    h.queue.close("memory.extraction");
    h.service.worker().run().await.unwrap();
    assert_eq!(
        h.service.job_status(&job.id).await.unwrap().status,
        JobStatus::Completed
    );

    let summary = h.service.proactive().update_user("u1").await.unwrap();
    assert!(summary.buckets.contains_key("movies"));

    let query = SearchQuery::new("u1", "what are my favorite things?");
    let results = h.service.search_memories(&query).await.unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.score == 1.0));
}

#[tokio::test]
#[serial_test::serial]
async fn file_backed_database_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recall.db");
    let path = path.to_str().unwrap();

    {
        let store = SqlMetadataStore::open(path).await.unwrap();
        store.init_schema().await.unwrap();
        let fact =
            recall_core::types::Fact::new("u1", "I love pizza", FactCategory::Preference, 0.9);
        store.upsert_fact(&fact).await.unwrap();
    }

    // A fresh handle over the same file sees the committed rows.
    let store = SqlMetadataStore::open(path).await.unwrap();
    store.init_schema().await.unwrap();
    let facts = store.facts_by_user("u1", 10).await.unwrap();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].content, "I love pizza");
}

#[tokio::test]
async fn user_deletion_cascades_through_sql() {
    let h = sql_harness(vec![candidate(
        "User loves pizza",
        FactCategory::Preference,
        0.9,
    )])
    .await;

    h.service.extract(&request()).await.unwrap();
    h.queue.close("memory.extraction");
    h.service.worker().run().await.unwrap();
    assert_eq!(h.service.user_facts("u1", 10).await.unwrap().len(), 1);

    h.service.delete_user_memory("u1").await.unwrap();
    assert!(h.service.user_facts("u1", 10).await.unwrap().is_empty());
}
