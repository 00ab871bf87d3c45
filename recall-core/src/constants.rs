//! Service-wide defaults and lexical tables.

use std::time::Duration;

/// Key prefix for cached search results (L1).
pub const SEARCH_KEY_PREFIX: &str = "search";

/// Key prefix for cached query embeddings (L3).
pub const EMBEDDING_KEY_PREFIX: &str = "embedding";

/// Key prefix for per-user cache version tags.
pub const USER_VERSION_KEY_PREFIX: &str = "user:version";

/// Key prefix for the warmed favourite summary (L1 copy of L2).
pub const USER_FAVORITE_KEY_PREFIX: &str = "user_favorite";

/// Key prefix for short-term-memory session state.
pub const STM_KEY_PREFIX: &str = "stm";

/// Key prefix for the per-user semantic-cache query list.
pub const SEMANTIC_QUERIES_KEY_PREFIX: &str = "semantic_cache:queries";

/// Default TTL for L1 search-result entries (1 hour).
pub const DEFAULT_L1_TTL: Duration = Duration::from_secs(3600);

/// Default TTL for L3 embedding entries (24 hours).
pub const DEFAULT_L3_TTL: Duration = Duration::from_secs(86_400);

/// Default TTL for STM session state (1 hour).
pub const DEFAULT_STM_TTL: Duration = Duration::from_secs(3600);

/// Minimum cosine similarity for a semantic-cache hit.
pub const SEMANTIC_SIMILARITY_THRESHOLD: f32 = 0.9;

/// Maximum cached query vectors kept per user.
pub const SEMANTIC_MAX_QUERIES_PER_USER: usize = 100;

/// Default maximum results for a search request.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Upper bound accepted for a search limit.
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Default minimum similarity score for returned facts.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.4;

/// Default weight of the vector branch in hybrid scoring.
pub const DEFAULT_VECTOR_WEIGHT: f32 = 0.7;

/// Default weight of the keyword branch in hybrid scoring.
pub const DEFAULT_KEYWORD_WEIGHT: f32 = 0.3;

/// Maximum characters accepted for fact content.
pub const MAX_FACT_CONTENT_CHARS: usize = 2000;

/// Tier-1 window size for short-term memory (turns).
pub const DEFAULT_STM_TIER1_MAX_TURNS: usize = 10;

/// Buffered turns that trigger a tier-2 summarisation.
pub const DEFAULT_STM_TIER2_SUMMARY_TURNS: usize = 40;

/// Estimated summarised turns that promote tier-2 into tier-3.
pub const DEFAULT_STM_TIER3_SUMMARY_TURNS: usize = 200;

/// Character cap applied to a freshly summarised buffer.
pub const STM_SUMMARY_CHARS: usize = 500;

/// Character cap applied to a merged tier summary.
pub const STM_MERGED_SUMMARY_CHARS: usize = 1000;

/// Deadline for the STM branch of a combined search.
pub const DEFAULT_STM_TIMEOUT: Duration = Duration::from_millis(1000);

/// Deadline for the LTM branch of a combined search.
pub const DEFAULT_LTM_TIMEOUT: Duration = Duration::from_millis(1500);

/// Name of the durable extraction queue.
pub const EXTRACTION_QUEUE: &str = "memory.extraction";

/// Default consumer prefetch for the extraction worker.
pub const DEFAULT_WORKER_PREFETCH: u16 = 1;

/// Default interval between proactive cache sweeps (30 minutes).
pub const DEFAULT_PROACTIVE_INTERVAL: Duration = Duration::from_secs(1800);

/// Query used to materialise per-user favourite summaries.
pub const FAVORITE_SUMMARY_QUERY: &str = "what are my favorite things?";

/// Result limit for the proactive favourite sweep.
pub const PROACTIVE_SWEEP_LIMIT: usize = 50;

/// Score threshold for the proactive favourite sweep.
pub const PROACTIVE_SWEEP_THRESHOLD: f32 = 0.3;

/// Markers that classify a query as favourite-class (checked lowercased).
pub const FAVORITE_QUERY_MARKERS: [&str; 4] = ["favorite", "like", "prefer", "love"];

/// Lexical buckets used when categorising favourite facts. The first bucket
/// whose keyword matches wins, so order is significant ("game" belongs to
/// activities before toys).
pub const FAVORITE_BUCKETS: [(&str, &[&str]); 8] = [
    ("movies", &["movie", "film", "cinema"]),
    ("characters", &["character", "hero", "superhero"]),
    ("pets", &["pet", "dog", "cat", "animal"]),
    ("activities", &["activity", "hobby", "sport", "game"]),
    ("friends", &["friend", "buddy", "pal"]),
    ("music", &["music", "song", "artist", "band"]),
    ("travel", &["travel", "trip", "vacation", "visit"]),
    ("toys", &["toy", "plaything", "game"]),
];

/// Metadata key carrying the transient similarity score on search hits.
pub const SIMILARITY_SCORE_KEY: &str = "_similarity_score";

/// Metadata key carrying one-hop related fact ids on search hits.
pub const RELATED_FACTS_KEY: &str = "related_facts";
