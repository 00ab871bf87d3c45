//! The asynchronous ingest path: job submission, queue consumption, fact
//! persistence across all three stores, cache invalidation, and poison
//! handling.

use recall_core::cache::keys;
use recall_core::jobs::ExtractionJobMessage;
use recall_core::stores::{KeyValueStore, MessageQueue};
use recall_core::types::{
    ConversationTurn, ExtractionRequest, FactCategory, JobStatus, Metadata, Role, SearchQuery,
};
use recall_e2e_tests::{candidate, harness};

fn request() -> ExtractionRequest {
    ExtractionRequest {
        user_id: "u1".to_string(),
        conversation_id: "c1".to_string(),
        conversation: vec![
            ConversationTurn::new(Role::User, "I really love pizza"),
            ConversationTurn::new(Role::Assistant, "noted! anything else?"),
            ConversationTurn::new(Role::User, "my dog is called Rex"),
        ],
        metadata: Metadata::new(),
    }
}

fn two_candidates() -> Vec<recall_core::types::FactCandidate> {
    vec![
        candidate("User loves pizza", FactCategory::Preference, 0.9),
        candidate("User has a dog called Rex", FactCategory::Relationship, 0.85),
    ]
}

#[tokio::test]
async fn extraction_happy_path() {
    let h = harness(two_candidates());

    let job = h.service.extract(&request()).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(h.queue.depth("memory.extraction"), 1);

    h.queue.close("memory.extraction");
    h.service.worker().run().await.unwrap();

    // Job reached its terminal state with the extract count.
    let job = h.service.job_status(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!(job.data["facts_extracted"], 2);
    assert!(job.completed_at.is_some());

    // Facts landed in every store.
    assert_eq!(h.vector.len(), 2);
    let facts = h.service.user_facts("u1", 10).await.unwrap();
    assert_eq!(facts.len(), 2);
    assert!(h.graph.has_user("u1"));
    for fact in &facts {
        assert!(h.graph.has_fact(&fact.id));
        assert_eq!(fact.metadata["conversation_id"], "c1");
    }

    // Exactly one ack; version bumped for cache invalidation.
    assert_eq!(h.queue.acked("memory.extraction"), 1);
    assert_eq!(h.queue.requeued("memory.extraction"), 0);
    assert!(
        h.kv.get_user_version("u1").await.unwrap().is_some(),
        "extraction must bump the user cache version"
    );
}

#[tokio::test]
async fn extracted_facts_are_searchable() {
    let h = harness(two_candidates());
    let job = h.service.extract(&request()).await.unwrap();

    h.queue.close("memory.extraction");
    h.service.worker().run().await.unwrap();
    h.service.job_status(&job.id).await.unwrap();

    let query = SearchQuery::new("u1", "what is my dog called?").with_score_threshold(0.0);
    let results = h.service.search_memories(&query).await.unwrap();
    assert!(results.iter().any(|r| r.content.contains("Rex")));
}

#[tokio::test]
async fn poison_message_is_dropped_not_redelivered() {
    let h = harness(two_candidates());

    // References a job id that is not in the metadata store.
    let poison = ExtractionJobMessage {
        job_id: "no-such-job".to_string(),
        user_id: "u1".to_string(),
        conversation_id: "c1".to_string(),
        conversation: vec![ConversationTurn::new(Role::User, "hello")],
        metadata: Metadata::new(),
    };
    h.queue
        .publish("memory.extraction", &serde_json::to_vec(&poison).unwrap())
        .await
        .unwrap();
    assert_eq!(h.queue.depth("memory.extraction"), 1);

    h.queue.close("memory.extraction");
    h.service.worker().run().await.unwrap();

    // Queue depth decreased by one and the message was not redelivered.
    assert_eq!(h.queue.depth("memory.extraction"), 0);
    assert_eq!(h.queue.rejected("memory.extraction"), 1);
    assert_eq!(h.queue.requeued("memory.extraction"), 0);
    assert_eq!(h.queue.acked("memory.extraction"), 0);
    // The extractor was never consulted for a job that cannot exist.
    assert_eq!(h.extractor.calls(), 0);
}

#[tokio::test]
async fn mixed_queue_processes_good_jobs_despite_poison() {
    let h = harness(two_candidates());

    let poison = ExtractionJobMessage {
        job_id: "ghost".to_string(),
        user_id: "u1".to_string(),
        conversation_id: "c0".to_string(),
        conversation: vec![ConversationTurn::new(Role::User, "hi")],
        metadata: Metadata::new(),
    };
    h.queue
        .publish("memory.extraction", &serde_json::to_vec(&poison).unwrap())
        .await
        .unwrap();
    let job = h.service.extract(&request()).await.unwrap();

    h.queue.close("memory.extraction");
    h.service.worker().run().await.unwrap();

    assert_eq!(h.queue.rejected("memory.extraction"), 1);
    assert_eq!(h.queue.acked("memory.extraction"), 1);
    let job = h.service.job_status(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test]
async fn publish_outage_still_accepts_the_job() {
    let h = harness(two_candidates());
    h.queue.fail_publishes(true);

    let job = h.service.extract(&request()).await.unwrap();

    // Accepted and persisted as pending, nothing enqueued.
    assert_eq!(h.queue.depth("memory.extraction"), 0);
    let stored = h.service.job_status(&job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Pending);
    assert_eq!(stored.current_step, "Queued for processing");
}

#[tokio::test]
async fn extraction_invalidates_warm_search_results() {
    let h = harness(vec![candidate(
        "User loves ramen",
        FactCategory::Preference,
        0.9,
    )]);
    h.seed_fact("u1", "I enjoy reading books", FactCategory::Habit)
        .await;

    let query = SearchQuery::new("u1", "what does the user enjoy eating").with_score_threshold(0.0);
    let before = h.service.search_memories(&query).await.unwrap();
    assert!(before.iter().all(|r| !r.content.contains("ramen")));

    // The cached entry sits under the pre-extraction version tag.
    let cached_key = keys::search_key("u1", &query.query, None);
    assert!(h.kv.get(&cached_key).await.unwrap().is_some());

    let job = h.service.extract(&request()).await.unwrap();
    h.queue.close("memory.extraction");
    h.service.worker().run().await.unwrap();
    assert_eq!(
        h.service.job_status(&job.id).await.unwrap().status,
        JobStatus::Completed
    );

    // Same query, fresh request: the bumped version bypasses the stale
    // entry and the new fact shows up.
    let after = h.service.search_memories(&query).await.unwrap();
    assert!(after.iter().any(|r| r.content.contains("ramen")));
}
